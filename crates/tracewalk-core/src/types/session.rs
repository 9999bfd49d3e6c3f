//! Session request and result types.

use std::fmt;
use std::time::Duration;

use super::FrameEvent;

/// Where a session stops before its directive takes over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Breakpoint
{
    /// The program's entry function (e.g. `main`).
    Entry(String),
    /// A specific source line, optionally qualified by its file.
    Line
    {
        /// File holding the line, when known.
        file: Option<String>,
        /// Line number.
        line: u32,
    },
}

impl Breakpoint
{
    /// Breakpoint at the line a frame event was observed on.
    #[must_use]
    pub fn at_event(event: &FrameEvent) -> Self
    {
        Self::Line {
            file: event.source_file.clone(),
            line: event.source_line,
        }
    }
}

/// Renders the location in the form gdb's `break` command accepts.
impl fmt::Display for Breakpoint
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Entry(function) => f.write_str(function),
            Self::Line { file: Some(file), line } if file.contains(char::is_whitespace) => {
                // gdb splits an unquoted linespec at the first space
                write!(f, "\"{}\":{line}", file.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Self::Line { file: Some(file), line } => write!(f, "{file}:{line}"),
            Self::Line { file: None, line } => write!(f, "{line}"),
        }
    }
}

/// What the in-debugger helper does once the breakpoint is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirective
{
    /// Step from the entry point, classifying every frame.
    Trace,
    /// Issue one `next` over the breakpoint line, then keep stepping.
    Resume,
    /// Walk the lexical scopes around the stop and report declarations.
    Declarations
    {
        /// Line the declarations are compared against.
        line: u32,
    },
}

/// One bounded debugger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan
{
    /// Initial breakpoint.
    pub breakpoint: Breakpoint,
    /// Directive handed to the stepping helper.
    pub directive: StepDirective,
    /// Wall-clock budget for the whole debugger process.
    pub timeout: Duration,
}

/// Terminal classification of a session. Exactly one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal
{
    /// Stepping fell off user-resolvable source (back into process startup).
    EndOfSource,
    /// Stepping stopped before descending into library code.
    LibraryBoundary,
    /// The debugger's scripting surface reported a fault.
    Error,
    /// The session exceeded its wall-clock budget.
    Timeout,
    /// Frames were reported but the session ended without any verdict.
    Continuing,
}

impl fmt::Display for Terminal
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Self::EndOfSource => "end of source",
            Self::LibraryBoundary => "library boundary",
            Self::Error => "debugger error",
            Self::Timeout => "timeout",
            Self::Continuing => "continuing",
        };
        f.write_str(name)
    }
}

/// Everything one session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult
{
    /// Console text captured from the debugger (stdout then stderr).
    pub raw_output: String,
    /// Frame events in strictly increasing `sequence_index` order.
    pub events: Vec<FrameEvent>,
    /// How the session ended.
    pub terminal: Terminal,
    /// Message attached to an `Error` terminal.
    pub fault: Option<String>,
}

impl SessionResult
{
    /// Result of a session that ran out of time.
    ///
    /// Partial text is kept for diagnostics but never parsed.
    #[must_use]
    pub fn timed_out(partial_output: String) -> Self
    {
        Self {
            raw_output: partial_output,
            events: Vec::new(),
            terminal: Terminal::Timeout,
            fault: None,
        }
    }
}
