//! Frame event types.

use std::fmt;

/// One stop of the debugger at a source line.
///
/// `sequence_index` restarts at 0 in every session. The stitcher renumbers
/// events into one global, strictly increasing sequence when it merges them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent
{
    /// Position of the stop within its session (or globally, once stitched).
    pub sequence_index: usize,
    /// Source line the frame is stopped at.
    pub source_line: u32,
    /// Function owning the frame. Empty when the debugger did not report one.
    pub function_name: String,
    /// Source file of the frame, if the debugger could resolve one.
    pub source_file: Option<String>,
}

impl FrameEvent
{
    /// Build an event that carries a resolved function and file.
    #[must_use]
    pub fn new(sequence_index: usize, source_line: u32, function_name: impl Into<String>, source_file: impl Into<String>) -> Self
    {
        Self {
            sequence_index,
            source_line,
            function_name: function_name.into(),
            source_file: Some(source_file.into()),
        }
    }

    /// Copy of this event placed at `index` in another sequence.
    #[must_use]
    pub fn renumbered(&self, index: usize) -> Self
    {
        Self {
            sequence_index: index,
            ..self.clone()
        }
    }
}

impl fmt::Display for FrameEvent
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let file = self.source_file.as_deref().unwrap_or("??");
        let function = if self.function_name.is_empty() { "??" } else { &self.function_name };
        write!(f, "#{} {}:{} in {}", self.sequence_index, file, self.source_line, function)
    }
}
