//! # Session Driver
//!
//! Owns one bounded debugger invocation.
//!
//! [`SessionRunner`] is the capability the rest of the engine depends on:
//! run one session described by a [`SessionPlan`] and hand back a
//! [`SessionResult`]. [`GdbDriver`] implements it over gdb's batch mode and
//! its embedded Python scripting surface. Tests substitute scripted runners.
//!
//! ## Session lifecycle
//!
//! 1. Overwrite the command script and stepping helper ([`script`])
//! 2. Launch `gdb -q -batch -nx -x <script> <target>`
//! 3. Wait at most `plan.timeout`, killing gdb on expiry ([`process`])
//! 4. Parse the console text, or report `Timeout` without parsing

pub mod process;
pub mod script;

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use self::process::ProcessOutcome;
use self::script::ScriptFiles;
use crate::classifier::ClassifierPolicy;
use crate::config::TraceConfig;
use crate::error::{TraceError, TraceResult};
use crate::parser;
use crate::types::{SessionPlan, SessionResult};

/// Runs one debugger session.
///
/// Implementations own exclusive control of the target for the duration of
/// the call; sessions are never run concurrently.
pub trait SessionRunner
{
    /// Run the session described by `plan`.
    ///
    /// A session that exceeds its budget is not an error: it returns a
    /// result whose terminal is `Timeout`.
    ///
    /// ## Errors
    ///
    /// - `DebuggerLaunch`: the debugger executable could not be started
    /// - `Io`: script files could not be written
    fn run(&mut self, plan: &SessionPlan) -> TraceResult<SessionResult>;
}

/// [`SessionRunner`] backed by gdb in batch mode.
#[derive(Debug)]
pub struct GdbDriver
{
    gdb: PathBuf,
    target: PathBuf,
    scripts: ScriptFiles,
    policy: ClassifierPolicy,
    runtime: Runtime,
}

impl GdbDriver
{
    /// Create a driver for `target` using the debugger and script directory
    /// from `config`.
    ///
    /// ## Errors
    ///
    /// - `MissingTarget`: `target` does not exist
    /// - `Io`: the supervision runtime could not be built
    pub fn new(config: &TraceConfig, target: impl Into<PathBuf>) -> TraceResult<Self>
    {
        let target = target.into();
        if !target.exists() {
            return Err(TraceError::MissingTarget(target));
        }

        let runtime = Builder::new_current_thread().enable_all().build()?;

        Ok(Self {
            gdb: config.gdb.clone(),
            target,
            scripts: ScriptFiles::new(&config.script_dir),
            policy: config.policy.clone(),
            runtime,
        })
    }

    /// Binary under analysis.
    #[must_use]
    pub fn target(&self) -> &Path
    {
        &self.target
    }

    fn command(&self, script: &Path) -> Command
    {
        let mut command = Command::new(&self.gdb);
        command.args(["-q", "-batch", "-nx", "-x"]).arg(script).arg(&self.target);
        process::configure(&mut command);
        command
    }
}

impl SessionRunner for GdbDriver
{
    fn run(&mut self, plan: &SessionPlan) -> TraceResult<SessionResult>
    {
        let script = self.scripts.write(plan, &self.policy)?;
        let mut command = self.command(&script);
        let program = self.gdb.display().to_string();

        debug!(breakpoint = %plan.breakpoint, directive = ?plan.directive, timeout = ?plan.timeout, "launching debugger session");

        let outcome = self.runtime.block_on(async {
            let child = command
                .spawn()
                .map_err(|source| TraceError::DebuggerLaunch { program, source })?;
            Ok::<_, TraceError>(process::supervise(child, plan.timeout).await?)
        })?;

        match outcome {
            ProcessOutcome::Exited { status, output } => {
                debug!(%status, bytes = output.len(), "debugger session finished");
                Ok(parser::parse(&output))
            }
            ProcessOutcome::TimedOut { partial } => {
                warn!(timeout = ?plan.timeout, breakpoint = %plan.breakpoint, "debugger session timed out");
                Ok(SessionResult::timed_out(partial))
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests
{
    use std::time::Duration;

    use super::*;
    use crate::types::{Breakpoint, StepDirective};

    fn config(gdb: &str, tag: &str) -> TraceConfig
    {
        TraceConfig {
            gdb: PathBuf::from(gdb),
            script_dir: std::env::temp_dir().join(format!("tracewalk-driver-{tag}-{}", std::process::id())),
            ..TraceConfig::default()
        }
    }

    fn entry_plan() -> SessionPlan
    {
        SessionPlan {
            breakpoint: Breakpoint::Entry("main".to_string()),
            directive: StepDirective::Trace,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_missing_target()
    {
        let err = GdbDriver::new(&config("gdb", "missing"), "/nonexistent/tracewalk/a.out").unwrap_err();
        assert!(matches!(err, TraceError::MissingTarget(_)));
    }

    #[test]
    fn test_missing_debugger_is_launch_error()
    {
        let config = config("/nonexistent/tracewalk/gdb", "launch");
        let mut driver = GdbDriver::new(&config, "/bin/sh").unwrap();

        let err = driver.run(&entry_plan()).unwrap_err();
        match err {
            TraceError::DebuggerLaunch { program, .. } => assert_eq!(program, "/nonexistent/tracewalk/gdb"),
            other => panic!("expected DebuggerLaunch, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&config.script_dir);
    }
}
