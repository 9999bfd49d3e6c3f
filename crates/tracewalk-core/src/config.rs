//! # Configuration
//!
//! Settings for one analysis run, with defaults and environment overrides.
//!
//! ## Environment Variables
//!
//! - `TRACEWALK_GDB`: debugger executable (default `gdb`)
//! - `TRACEWALK_VALGRIND`: memory checker executable (default `valgrind`)
//! - `TRACEWALK_ENTRY`: program entry function (default `main`)
//! - `TRACEWALK_FIRST_TIMEOUT_SECS`: budget of the first session (default 30)
//! - `TRACEWALK_RESUME_TIMEOUT_SECS`: budget of every re-armed session (default 10)
//! - `TRACEWALK_MAX_SESSIONS`: ceiling on sessions per trace (default 64)
//! - `TRACEWALK_SCRIPT_DIR`: where session scripts are written (default `<tmp>/tracewalk`)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::classifier::ClassifierPolicy;
use crate::error::{TraceError, TraceResult};

/// Default budget of the first session, which starts at the entry point.
pub const DEFAULT_FIRST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default budget of each re-armed session.
pub const DEFAULT_RESUME_TIMEOUT: Duration = Duration::from_secs(10);
/// Default ceiling on the number of sessions in one trace.
pub const DEFAULT_MAX_SESSIONS: usize = 64;

/// Settings for the trace and memory-check passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig
{
    /// Debugger executable.
    pub gdb: PathBuf,
    /// Memory checker executable.
    pub valgrind: PathBuf,
    /// Budget of the first session.
    pub first_timeout: Duration,
    /// Budget of every re-armed session.
    pub resume_timeout: Duration,
    /// Ceiling on sessions, guarding against re-arm loops.
    pub max_sessions: usize,
    /// Directory holding the transient session scripts.
    pub script_dir: PathBuf,
    /// Frame classification rules, including the entry function.
    pub policy: ClassifierPolicy,
}

impl Default for TraceConfig
{
    fn default() -> Self
    {
        Self {
            gdb: PathBuf::from("gdb"),
            valgrind: PathBuf::from("valgrind"),
            first_timeout: DEFAULT_FIRST_TIMEOUT,
            resume_timeout: DEFAULT_RESUME_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            script_dir: env::temp_dir().join("tracewalk"),
            policy: ClassifierPolicy::default(),
        }
    }
}

impl TraceConfig
{
    /// Defaults overridden by the process environment.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` if a numeric variable does not parse.
    pub fn from_env() -> TraceResult<Self>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` if a numeric variable does not parse or a
    /// session budget or ceiling is zero.
    pub fn from_lookup<F>(lookup: F) -> TraceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(gdb) = lookup("TRACEWALK_GDB") {
            config.gdb = PathBuf::from(gdb);
        }
        if let Some(valgrind) = lookup("TRACEWALK_VALGRIND") {
            config.valgrind = PathBuf::from(valgrind);
        }
        if let Some(entry) = lookup("TRACEWALK_ENTRY") {
            config.policy.entry_function = entry;
        }
        if let Some(dir) = lookup("TRACEWALK_SCRIPT_DIR") {
            config.script_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("TRACEWALK_FIRST_TIMEOUT_SECS") {
            config.first_timeout = Duration::from_secs(parse_number("TRACEWALK_FIRST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = lookup("TRACEWALK_RESUME_TIMEOUT_SECS") {
            config.resume_timeout = Duration::from_secs(parse_number("TRACEWALK_RESUME_TIMEOUT_SECS", &secs)?);
        }
        if let Some(max) = lookup("TRACEWALK_MAX_SESSIONS") {
            config.max_sessions = parse_number("TRACEWALK_MAX_SESSIONS", &max)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a trace meaningless.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` for a zero budget or a zero session ceiling.
    pub fn validate(&self) -> TraceResult<()>
    {
        if self.first_timeout.is_zero() || self.resume_timeout.is_zero() {
            return Err(TraceError::InvalidConfig("session timeouts must be greater than zero".to_string()));
        }
        if self.max_sessions == 0 {
            return Err(TraceError::InvalidConfig("max sessions must be at least 1".to_string()));
        }
        if self.policy.entry_function.is_empty() {
            return Err(TraceError::InvalidConfig("entry function must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> TraceResult<T>
{
    value
        .trim()
        .parse()
        .map_err(|_| TraceError::InvalidConfig(format!("{key}: '{value}' is not a valid number")))
}
