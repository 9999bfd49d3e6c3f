//! # Tracewalk Utilities
//!
//! Shared logging and helpers for tracewalk.
//!
//! The trace engine writes its artifacts (roadmaps, declaration records,
//! memory-check summaries) to stdout, so everything here logs to stderr or a
//! file.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
