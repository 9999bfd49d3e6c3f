//! Common module for library exports

pub use crate::classifier::{ClassifierPolicy, FrameClass, FrameClassifier};
pub use crate::config::TraceConfig;
pub use crate::declarations::{capture_declarations, DeclarationRecord, DeclarationSnapshot, DeclarationStatus};
pub use crate::driver::{GdbDriver, SessionRunner};
pub use crate::error::{TraceError, TraceResult};
pub use crate::locate::find_executable;
pub use crate::memcheck::{MemcheckReport, MemcheckSummary, MemoryChecker};
pub use crate::reconstruct;
pub use crate::roadmap::{Action, Roadmap};
pub use crate::stitcher::{Stitcher, TraceFault, TraceOutcome, TraceReport};
pub use crate::types::{Breakpoint, FrameEvent, SessionPlan, SessionResult, StepDirective, Terminal};
