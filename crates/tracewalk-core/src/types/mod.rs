//! # Types
//!
//! Data carried between the parser, the session driver and the stitcher.
//!
//! Everything here lives for a single analysis run; nothing is persisted.

pub mod frame;
pub mod session;

// Re-export all public types
pub use frame::FrameEvent;
pub use session::{Breakpoint, SessionPlan, SessionResult, StepDirective, Terminal};
