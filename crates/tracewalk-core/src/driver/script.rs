//! Session script rendering.
//!
//! Every session is driven by two files, both overwritten on each call:
//!
//! - the command script gdb runs in batch mode (breakpoint, run, load helper,
//!   invoke directive, quit)
//! - the Python stepping helper, rendered from the active
//!   [`ClassifierPolicy`] so gdb halts where the Rust classifier would

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::classifier::ClassifierPolicy;
use crate::error::TraceResult;
use crate::types::{SessionPlan, StepDirective};

const HELPER_TEMPLATE: &str = include_str!("../../assets/stepper.py");

/// File name of the gdb command script.
pub const SESSION_SCRIPT_NAME: &str = "tracewalk_session.gdb";
/// File name of the rendered stepping helper.
pub const HELPER_SCRIPT_NAME: &str = "tracewalk_stepper.py";

/// Render the stepping helper for `policy`.
#[must_use]
pub fn render_helper(policy: &ClassifierPolicy) -> String
{
    HELPER_TEMPLATE
        .replace("@LIBRARY_PREFIXES@", &python_list(&policy.library_prefixes))
        .replace("@RUNTIME_MARKERS@", &python_list(&policy.runtime_markers))
        .replace("@ENTRY_FUNCTION@", &python_str(&policy.entry_function))
}

/// Render the gdb command script for one session.
#[must_use]
pub fn render_session_script(plan: &SessionPlan, helper: &Path) -> String
{
    let call = match plan.directive {
        StepDirective::Trace => "tracewalk_trace()",
        StepDirective::Resume => "tracewalk_resume()",
        StepDirective::Declarations { .. } => "tracewalk_declarations()",
    };

    let mut script = String::new();
    script.push_str("set pagination off\n");
    script.push_str("set confirm off\n");
    script.push_str("set breakpoint pending off\n");
    let _ = writeln!(script, "break {}", plan.breakpoint);
    script.push_str("run\n");
    let _ = writeln!(script, "source {}", helper.display());
    let _ = writeln!(script, "python {call}");
    script.push_str("quit\n");
    script
}

/// Location of the transient script files.
#[derive(Debug, Clone)]
pub struct ScriptFiles
{
    dir: PathBuf,
}

impl ScriptFiles
{
    /// Scripts will be written into `dir`, created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self
    {
        Self { dir: dir.into() }
    }

    /// Path of the gdb command script.
    #[must_use]
    pub fn session_path(&self) -> PathBuf
    {
        self.dir.join(SESSION_SCRIPT_NAME)
    }

    /// Path of the stepping helper.
    #[must_use]
    pub fn helper_path(&self) -> PathBuf
    {
        self.dir.join(HELPER_SCRIPT_NAME)
    }

    /// Overwrite both scripts for `plan` and return the command script path.
    ///
    /// ## Errors
    ///
    /// Returns `Io` if the directory cannot be created or a file written.
    pub fn write(&self, plan: &SessionPlan, policy: &ClassifierPolicy) -> TraceResult<PathBuf>
    {
        fs::create_dir_all(&self.dir)?;

        let helper = self.helper_path();
        fs::write(&helper, render_helper(policy))?;

        let session = self.session_path();
        fs::write(&session, render_session_script(plan, &helper))?;
        debug!(script = %session.display(), breakpoint = %plan.breakpoint, "wrote session script");

        Ok(session)
    }
}

fn python_str(value: &str) -> String
{
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn python_list(values: &[String]) -> String
{
    let items: Vec<String> = values.iter().map(|v| python_str(v)).collect();
    format!("[{}]", items.join(", "))
}
