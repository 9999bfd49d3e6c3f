//! # tracewalk-core
//!
//! Execution-trace reconstruction for native programs.
//!
//! A C program is stepped line by line under a debugger and the observed user
//! frames are turned into a replayable roadmap of `step`/`next` actions. A
//! single debugger session is bounded in time and cannot cross into library
//! code, so the trace is stitched from several sessions, each re-armed at a
//! line the previous one already validated.
//!
//! This crate provides:
//! - Frame classification (user code versus library/runtime code)
//! - Parsing of debugger session output into frame events
//! - The gdb session driver behind the [`SessionRunner`] capability
//! - The session stitcher state machine and roadmap builder
//! - Declaration snapshots of the variables in scope at a line
//! - Target discovery and a valgrind memory-check pass
//!
//! ## Example
//!
//! ```rust,no_run
//! use tracewalk_core::prelude::*;
//!
//! # fn main() -> TraceResult<()> {
//! let config = TraceConfig::from_env()?;
//! let target = find_executable(std::path::Path::new("."))?;
//! let report = reconstruct(&config, &target)?;
//! println!("{}", report.roadmap);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod declarations;
pub mod driver;
pub mod error;
pub mod locate;
pub mod memcheck;
pub mod parser;
pub mod prelude;
pub mod roadmap;
pub mod stitcher;
pub mod types;

use std::path::Path;

pub use classifier::{ClassifierPolicy, FrameClass, FrameClassifier};
pub use config::TraceConfig;
pub use driver::{GdbDriver, SessionRunner};
// Re-export commonly used types
pub use error::{TraceError, TraceResult};
pub use roadmap::{Action, Roadmap};
pub use stitcher::{Stitcher, TraceFault, TraceOutcome, TraceReport};
pub use types::{Breakpoint, FrameEvent, SessionPlan, SessionResult, StepDirective, Terminal};

/// Reconstruct the trace of `target` with gdb.
///
/// ## Errors
///
/// - `InvalidConfig`: `config` fails validation
/// - `MissingTarget`: `target` does not exist
/// - `DebuggerLaunch`: the debugger could not be started
/// - `Io`: the session scripts could not be written
pub fn reconstruct(config: &TraceConfig, target: &Path) -> TraceResult<TraceReport>
{
    config.validate()?;
    let mut driver = GdbDriver::new(config, target)?;
    Stitcher::new(config).run(&mut driver)
}
