//! # Memory Check
//!
//! Runs valgrind's memcheck over the target and reduces its diagnostics to an
//! error/context count.
//!
//! This pass only reads the target binary and is independent of the trace
//! pass; the two can run in either order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{TraceError, TraceResult};

static ERROR_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ERROR SUMMARY: (\d+) errors? from (\d+) contexts?").expect("error summary pattern is valid")
});

/// Counts from memcheck's `ERROR SUMMARY` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemcheckSummary
{
    /// Number of errors reported.
    pub errors: u32,
    /// Number of distinct contexts the errors came from.
    pub contexts: u32,
}

impl MemcheckSummary
{
    /// `true` when memcheck reported no errors.
    #[must_use]
    pub const fn is_clean(&self) -> bool
    {
        self.errors == 0
    }
}

impl fmt::Display for MemcheckSummary
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.is_clean() {
            f.write_str("no errors")
        } else {
            write!(f, "{} errors in {} contexts", self.errors, self.contexts)
        }
    }
}

/// Output of one memory-check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcheckReport
{
    /// Parsed summary counts.
    pub summary: MemcheckSummary,
    /// The program's own stdout.
    pub stdout: String,
    /// Memcheck's diagnostic stream.
    pub stderr: String,
}

/// Extract `(errors, contexts)` from memcheck's diagnostic text.
///
/// Returns `(0, 0)` when no summary line is present.
#[must_use]
pub fn get_num_errors_and_contexts(output: &str) -> (u32, u32)
{
    ERROR_SUMMARY
        .captures(output)
        .and_then(|caps| {
            let errors = caps.get(1)?.as_str().parse().ok()?;
            let contexts = caps.get(2)?.as_str().parse().ok()?;
            Some((errors, contexts))
        })
        .unwrap_or((0, 0))
}

/// Launches the memory checker.
#[derive(Debug, Clone)]
pub struct MemoryChecker
{
    program: PathBuf,
}

impl Default for MemoryChecker
{
    fn default() -> Self
    {
        Self::new("valgrind")
    }
}

impl MemoryChecker
{
    /// Checker using the given valgrind executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self
    {
        Self { program: program.into() }
    }

    /// Run memcheck with full leak checking and origin tracking.
    ///
    /// ## Errors
    ///
    /// - `MissingTarget`: `target` does not exist
    /// - `MemcheckLaunch`: valgrind could not be started
    pub fn run(&self, target: &Path) -> TraceResult<MemcheckReport>
    {
        if !target.exists() {
            return Err(TraceError::MissingTarget(target.to_path_buf()));
        }

        info!(target = %target.display(), "running memory check");
        let output = Command::new(&self.program)
            .args(["--leak-check=full", "--track-origins=yes"])
            .arg(target)
            .output()
            .map_err(|source| TraceError::MemcheckLaunch {
                program: self.program.display().to_string(),
                source,
            })?;
        debug!(status = %output.status, "memory checker finished");

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let (errors, contexts) = get_num_errors_and_contexts(&stderr);

        Ok(MemcheckReport {
            summary: MemcheckSummary { errors, contexts },
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_summary_counts()
    {
        let stderr = "\
==4242== HEAP SUMMARY:
==4242==     in use at exit: 40 bytes in 1 blocks
==4242== ERROR SUMMARY: 3 errors from 2 contexts (suppressed: 0 from 0)
";
        assert_eq!(get_num_errors_and_contexts(stderr), (3, 2));
    }

    #[test]
    fn test_singular_forms()
    {
        assert_eq!(get_num_errors_and_contexts("ERROR SUMMARY: 1 error from 1 context"), (1, 1));
    }

    #[test]
    fn test_missing_summary_is_zero()
    {
        assert_eq!(get_num_errors_and_contexts(""), (0, 0));
        assert_eq!(get_num_errors_and_contexts("Segmentation fault"), (0, 0));
    }

    #[test]
    fn test_summary_display()
    {
        assert_eq!(MemcheckSummary::default().to_string(), "no errors");
        assert_eq!(
            MemcheckSummary { errors: 3, contexts: 2 }.to_string(),
            "3 errors in 2 contexts"
        );
    }

    #[test]
    fn test_missing_target()
    {
        let err = MemoryChecker::default()
            .run(Path::new("/nonexistent/tracewalk/a.out"))
            .unwrap_err();
        assert!(matches!(err, TraceError::MissingTarget(_)));
    }

    #[test]
    fn test_missing_valgrind()
    {
        let err = MemoryChecker::new("/nonexistent/tracewalk/valgrind")
            .run(Path::new("/"))
            .unwrap_err();
        assert!(matches!(err, TraceError::MemcheckLaunch { .. }));
    }
}
