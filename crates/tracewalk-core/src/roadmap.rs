//! # Roadmap Builder
//!
//! Converts the stitched event sequence into the ordered `step`/`next`
//! actions that replay it.
//!
//! Every event inside a session window maps to `step` (descend into callees
//! so user-code internals are observed). The last event of each window maps
//! to `next`: the action after it is a breakpoint-driven resume, which must
//! not descend into a frame the following session has not validated.

use std::fmt;
use std::ops::Range;

use crate::types::FrameEvent;

/// One replay action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action
{
    /// Advance one line, descending into callees.
    Step,
    /// Advance one line, stepping over callees.
    Next,
}

impl Action
{
    /// Debugger command for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str
    {
        match self {
            Self::Step => "step",
            Self::Next => "next",
        }
    }
}

impl fmt::Display for Action
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

/// Ordered replay actions, one per observed frame event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roadmap(Vec<Action>);

impl Roadmap
{
    /// Actions in replay order.
    #[must_use]
    pub fn actions(&self) -> &[Action]
    {
        &self.0
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    /// `true` if no action was reconstructed.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    /// Actions as debugger command tokens.
    #[must_use]
    pub fn tokens(&self) -> Vec<&'static str>
    {
        self.0.iter().map(|a| a.as_str()).collect()
    }
}

/// Space-separated tokens, e.g. `step step next`.
impl fmt::Display for Roadmap
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (i, action) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}

impl From<Vec<Action>> for Roadmap
{
    fn from(actions: Vec<Action>) -> Self
    {
        Self(actions)
    }
}

/// Build the roadmap for `events` split into session `windows`.
///
/// Each window is a range of indexes into `events`, in session order.
/// Empty windows contribute nothing; ranges are clamped to `events`.
#[must_use]
pub fn build(events: &[FrameEvent], windows: &[Range<usize>]) -> Roadmap
{
    let mut actions = Vec::with_capacity(events.len());

    for window in windows {
        let end = window.end.min(events.len());
        let len = end.saturating_sub(window.start);
        if len == 0 {
            continue;
        }
        actions.extend(std::iter::repeat_n(Action::Step, len - 1));
        actions.push(Action::Next);
    }

    Roadmap(actions)
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn events(n: usize) -> Vec<FrameEvent>
    {
        (0..n)
            .map(|i| FrameEvent::new(i, u32::try_from(i).unwrap() + 1, "main", "prog.c"))
            .collect()
    }

    #[test]
    fn test_single_window()
    {
        let roadmap = build(&events(4), &[0..4]);
        assert_eq!(roadmap.tokens(), vec!["step", "step", "step", "next"]);
    }

    #[test]
    fn test_single_event_window_is_next()
    {
        let roadmap = build(&events(1), &[0..1]);
        assert_eq!(roadmap.actions(), &[Action::Next]);
    }

    #[test]
    fn test_windows_concatenate_in_order()
    {
        let roadmap = build(&events(5), &[0..3, 3..5]);
        assert_eq!(roadmap.to_string(), "step step next step next");
        assert_eq!(roadmap.len(), 5);
    }

    #[test]
    fn test_empty_windows_are_skipped()
    {
        let roadmap = build(&events(2), &[0..0, 0..2, 2..2]);
        assert_eq!(roadmap.tokens(), vec!["step", "next"]);
    }

    #[test]
    fn test_no_events()
    {
        let roadmap = build(&[], &[]);
        assert!(roadmap.is_empty());
        assert_eq!(roadmap.to_string(), "");
    }
}
