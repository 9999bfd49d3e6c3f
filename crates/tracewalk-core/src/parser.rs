//! # Trace Parser
//!
//! Turns the console text of one debugger session into a [`SessionResult`].
//!
//! The stepping helper running inside the debugger prints one line per
//! observed frame plus at most one sentinel line:
//!
//! ```text
//! tracewalk:frame line 12 at index 0 fn=main file=/work/prog.c
//! tracewalk:frame line 13 at index 1 fn=main file=/work/prog.c
//! tracewalk:boundary fn=printf file=/usr/include/bits/stdio2.h
//! ```
//!
//! Sentinels are checked in priority order: end of source, then debugger
//! error, then frame markers. Parsing never fails: text that matches nothing
//! yields an empty event list.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{FrameEvent, SessionResult, Terminal};

/// Prefix of a frame marker line.
pub const FRAME_TAG: &str = "tracewalk:frame";
/// Printed when stepping left user-resolvable source.
pub const END_OF_SOURCE_TAG: &str = "tracewalk:end-of-source";
/// Printed when the next frame would be library code.
pub const BOUNDARY_TAG: &str = "tracewalk:boundary";
/// Printed when the scripting surface raised an error.
pub const ERROR_TAG: &str = "tracewalk:error";

/// Reports gdb itself emits when the helper script fails to load or run.
const DEBUGGER_FAULT_MARKERS: &[&str] = &["Python Exception", "Error occurred in Python"];

static FRAME_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)line (\d+) at index (\d+)(?: fn=(.*?))?(?: file=(.*?))?\r?$").expect("frame marker pattern is valid")
});

/// Parse the raw console text of one session.
#[must_use]
pub fn parse(raw: &str) -> SessionResult
{
    let events = extract_events(raw);
    let fault = find_fault(raw);

    let terminal = if raw.contains(END_OF_SOURCE_TAG) {
        Terminal::EndOfSource
    } else if fault.is_some() {
        Terminal::Error
    } else if raw.contains(BOUNDARY_TAG) || events.is_empty() {
        Terminal::LibraryBoundary
    } else {
        Terminal::Continuing
    };

    SessionResult {
        raw_output: raw.to_string(),
        events,
        terminal,
        fault: if terminal == Terminal::Error { fault } else { None },
    }
}

/// Extract every well-formed `line N at index I` marker, ordered by index.
///
/// Markers with an index seen earlier are dropped, so the result is strictly
/// increasing.
#[must_use]
pub fn extract_events(raw: &str) -> Vec<FrameEvent>
{
    let mut events: Vec<FrameEvent> = FRAME_MARKER
        .captures_iter(raw)
        .filter_map(|caps| {
            let source_line = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let sequence_index = caps.get(2)?.as_str().parse::<usize>().ok()?;
            let function_name = caps.get(3).map_or("", |m| m.as_str().trim());
            let source_file = caps
                .get(4)
                .map(|m| m.as_str().trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string);

            Some(FrameEvent {
                sequence_index,
                source_line,
                function_name: function_name.to_string(),
                source_file,
            })
        })
        .collect();

    events.sort_by_key(|e| e.sequence_index);
    events.dedup_by_key(|e| e.sequence_index);
    events
}

/// First debugger fault reported in the text, with its message.
fn find_fault(raw: &str) -> Option<String>
{
    raw.lines().find_map(|line| {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(ERROR_TAG) {
            return Some(rest.trim().to_string());
        }
        DEBUGGER_FAULT_MARKERS
            .iter()
            .any(|marker| line.contains(marker))
            .then(|| line.to_string())
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_frame_markers_with_location()
    {
        let raw = "\
Breakpoint 1, main () at prog.c:5
tracewalk:frame line 5 at index 0 fn=main file=/work/prog.c
tracewalk:frame line 6 at index 1 fn=add file=/work/my dir/prog.c
";
        let events = extract_events(raw);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], FrameEvent::new(0, 5, "main", "/work/prog.c"));
        assert_eq!(events[1].function_name, "add");
        assert_eq!(events[1].source_file.as_deref(), Some("/work/my dir/prog.c"));
    }

    #[test]
    fn test_bare_markers_have_no_location()
    {
        let events = extract_events("line 9 at index 0\nline 10 at index 1\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].source_line, 10);
        assert!(events[1].function_name.is_empty());
        assert!(events[1].source_file.is_none());
    }

    #[test]
    fn test_events_sorted_and_deduplicated()
    {
        let raw = "line 3 at index 2\nline 1 at index 0\nline 2 at index 1\nline 7 at index 1\n";
        let indexes: Vec<usize> = extract_events(raw).iter().map(|e| e.sequence_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_ill_formed_markers_are_skipped()
    {
        let raw = "line x at index 0\nline 4 at index\nline 99999999999 at index 0\nline 4 at index 1\n";
        let events = extract_events(raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source_line, 4);
    }

    #[test]
    fn test_crlf_line_endings()
    {
        let events = extract_events("tracewalk:frame line 4 at index 0 fn=main file=a.c\r\n");
        assert_eq!(events[0].source_file.as_deref(), Some("a.c"));
    }

    #[test]
    fn test_end_of_source_wins_over_error()
    {
        let raw = format!("line 1 at index 0 fn=main file=a.c\n{ERROR_TAG} late\n{END_OF_SOURCE_TAG}\n");
        let result = parse(&raw);
        assert_eq!(result.terminal, Terminal::EndOfSource);
        assert!(result.fault.is_none());
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn test_error_sentinel_carries_message()
    {
        let raw = format!("line 1 at index 0 fn=main file=a.c\n{ERROR_TAG} The program is not being run.\n");
        let result = parse(&raw);
        assert_eq!(result.terminal, Terminal::Error);
        assert_eq!(result.fault.as_deref(), Some("The program is not being run."));
    }

    #[test]
    fn test_gdb_python_exception_is_error()
    {
        let result = parse("Python Exception <class 'NameError'>: name 'x' is not defined\n");
        assert_eq!(result.terminal, Terminal::Error);
        assert!(result.fault.unwrap().contains("NameError"));
    }

    #[test]
    fn test_boundary_sentinel()
    {
        let raw = format!("line 1 at index 0 fn=main file=a.c\n{BOUNDARY_TAG} fn=puts file=/usr/lib/puts.c\n");
        let result = parse(&raw);
        assert_eq!(result.terminal, Terminal::LibraryBoundary);
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn test_events_without_sentinel_are_continuing()
    {
        let result = parse("line 1 at index 0 fn=main file=a.c\n");
        assert_eq!(result.terminal, Terminal::Continuing);
    }

    #[test]
    fn test_empty_text_is_total()
    {
        let result = parse("");
        assert!(result.events.is_empty());
        assert_eq!(result.terminal, Terminal::LibraryBoundary);

        let result = parse("\u{0}\u{1}garbage \n\n line at index");
        assert!(result.events.is_empty());
    }
}
