//! # Error Types
//!
//! Fatal error handling for the trace engine.
//!
//! Only conditions that abort a pass are errors. Outcomes a run recovers
//! from (a session timing out, the debugger reporting its own fault, a
//! degenerate re-arm) are carried in [`crate::stitcher::TraceOutcome`]
//! together with the roadmap built so far, so no reconstructed data is lost.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for tracewalk operations
///
/// ## Error Categories
///
/// 1. **Input errors**: `NoExecutableFound`, `MissingTarget`
/// 2. **Launch errors**: `DebuggerLaunch`, `MemcheckLaunch`
/// 3. **Session errors**: `SessionTimedOut`, `DebuggerFault`
/// 4. **Configuration errors**: `InvalidConfig`
/// 5. **I/O errors**: `Io` (script files, work directory)
#[derive(Error, Debug)]
pub enum TraceError
{
    /// No candidate binary was found in the working directory
    ///
    /// This aborts both the memory-check pass and the trace pass.
    #[error("No executable found in {}", dir.display())]
    NoExecutableFound
    {
        /// Directory that was searched
        dir: PathBuf,
    },

    /// The target binary given explicitly does not exist
    #[error("Target binary not found: {}", .0.display())]
    MissingTarget(PathBuf),

    /// The debugger executable could not be started
    ///
    /// Distinct from a session timing out or the debugger reporting an
    /// internal fault: no session ever ran.
    #[error("Failed to launch debugger '{program}': {source}")]
    DebuggerLaunch
    {
        /// Debugger executable that was spawned
        program: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// The memory checker executable could not be started
    #[error("Failed to launch memory checker '{program}': {source}")]
    MemcheckLaunch
    {
        /// Memory checker executable that was spawned
        program: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// A standalone session exceeded its time budget
    ///
    /// The stitched trace never returns this; it reports a timeout outcome
    /// with a partial roadmap instead.
    #[error("Debugger session timed out after {limit:?}")]
    SessionTimedOut
    {
        /// Budget that was exceeded
        limit: Duration,
    },

    /// The debugger reported a fault during a standalone session
    #[error("Debugger fault: {0}")]
    DebuggerFault(String),

    /// A configuration value could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (script files, work directory, process pipes)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for `Result<T, TraceError>`
///
/// ```rust
/// use tracewalk_core::error::TraceResult;
/// fn foo() -> TraceResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type TraceResult<T> = std::result::Result<T, TraceError>;
