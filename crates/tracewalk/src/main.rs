use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracewalk_core::declarations::capture_declarations;
use tracewalk_core::locate::find_executable;
use tracewalk_core::memcheck::MemoryChecker;
use tracewalk_core::{reconstruct, GdbDriver, Roadmap, TraceConfig, TraceOutcome, TraceResult};
use tracewalk_utils::{error, info, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};

/// Memory-check a compiled program and reconstruct its execution roadmap.
#[derive(Parser, Debug)]
#[command(name = "tracewalk")]
#[command(version)]
#[command(about = "Memory-check a compiled program and reconstruct its line-by-line execution roadmap", long_about = None)]
struct Cli
{
    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log format (pretty, json); overrides TRACEWALK_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    /// Directory searched for the most recent executable
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,
    /// Binary to analyze; skips the directory search
    #[arg(long, global = true)]
    target: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Run the memory checker and print its error summary
    Memcheck,
    /// Reconstruct the execution roadmap through repeated debugger sessions
    Trace
    {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Print which in-scope variables are declared at a source line
    Declarations
    {
        /// Line to stop at
        #[arg(long)]
        line: u32,
        /// Source file holding the line
        #[arg(long)]
        file: Option<String>,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Memory check, then trace
    Check
    {
        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Debugger session overrides shared by the subcommands that launch gdb.
#[derive(Args, Debug, Default)]
struct SessionArgs
{
    /// Debugger executable
    #[arg(long)]
    gdb: Option<PathBuf>,
    /// Budget of the first session, in seconds
    #[arg(long)]
    first_timeout: Option<u64>,
    /// Budget of every re-armed session, in seconds
    #[arg(long)]
    resume_timeout: Option<u64>,
    /// Ceiling on debugger sessions per trace
    #[arg(long)]
    max_sessions: Option<usize>,
}

impl SessionArgs
{
    fn apply(&self, config: &mut TraceConfig)
    {
        if let Some(gdb) = &self.gdb {
            config.gdb.clone_from(gdb);
        }
        if let Some(secs) = self.first_timeout {
            config.first_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.resume_timeout {
            config.resume_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_sessions {
            config.max_sessions = max;
        }
    }
}

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus
{
    /// The command completed; a trace reached the end of the program
    Finished,
    /// A trace halted early and printed a partial roadmap
    Halted,
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    let _guard = match start_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run_command(&cli);
    if let Err(e) = &result {
        error!(error = %e, "analysis aborted");
        eprintln!("Error: {e}");
        if prints_roadmap(&cli.command) {
            print_roadmap(&Roadmap::default());
        }
    }
    // `_guard` has to drop before the process ends or the file log loses its tail.
    ExitCode::from(exit_code(&result))
}

/// Process exit status for the outcome of a command.
fn exit_code(result: &TraceResult<RunStatus>) -> u8
{
    match result {
        Ok(RunStatus::Finished) => 0,
        Ok(RunStatus::Halted) => 2,
        Err(_) => 1,
    }
}

/// Whether the command's stdout contract ends with a roadmap line.
fn prints_roadmap(command: &Commands) -> bool
{
    matches!(command, Commands::Trace { .. } | Commands::Check { .. })
}

fn start_logging(cli: &Cli) -> Result<LoggingGuard, LoggingError>
{
    match (cli.log_level, cli.log_format) {
        (None, None) => init_logging(),
        (level, format) => init_logging_with_level(level.unwrap_or(LogLevel::Info), format.unwrap_or(LogFormat::Pretty)),
    }
}

fn run_command(cli: &Cli) -> TraceResult<RunStatus>
{
    let mut config = TraceConfig::from_env()?;

    match &cli.command {
        Commands::Memcheck => {
            let target = resolve_target(cli)?;
            run_memcheck(&config, &target)?;
            Ok(RunStatus::Finished)
        }
        Commands::Trace { session } => {
            session.apply(&mut config);
            let target = resolve_target(cli)?;
            run_trace(&config, &target)
        }
        Commands::Declarations { line, file, session } => {
            session.apply(&mut config);
            config.validate()?;
            let target = resolve_target(cli)?;
            let mut driver = GdbDriver::new(&config, &target)?;
            let snapshot = capture_declarations(&mut driver, file.clone(), *line, config.first_timeout)?;

            println!("line {}:", snapshot.query_line);
            for record in &snapshot.records {
                println!("  {record}");
            }
            Ok(RunStatus::Finished)
        }
        Commands::Check { session } => {
            session.apply(&mut config);
            let target = resolve_target(cli)?;
            run_memcheck(&config, &target)?;
            run_trace(&config, &target)
        }
    }
}

fn resolve_target(cli: &Cli) -> TraceResult<PathBuf>
{
    let target = match &cli.target {
        Some(target) => target.clone(),
        None => find_executable(&cli.dir)?,
    };
    info!(target = %target.display(), "selected target");
    Ok(target)
}

fn run_memcheck(config: &TraceConfig, target: &Path) -> TraceResult<()>
{
    let report = MemoryChecker::new(&config.valgrind).run(target)?;

    println!("memcheck: {}", report.summary);
    if !report.summary.is_clean() {
        println!("{}", report.stderr);
    }
    Ok(())
}

fn run_trace(config: &TraceConfig, target: &Path) -> TraceResult<RunStatus>
{
    let report = reconstruct(config, target)?;

    let finished = report.outcome == TraceOutcome::Success;
    if !finished {
        eprintln!("Trace halted: {} after {} sessions; roadmap is partial", report.outcome, report.sessions);
    }
    println!("outcome: {}", report.outcome);
    print_roadmap(&report.roadmap);
    Ok(if finished { RunStatus::Finished } else { RunStatus::Halted })
}

fn print_roadmap(roadmap: &Roadmap)
{
    println!("roadmap: {roadmap}");
}

#[cfg(test)]
mod tests
{
    use tracewalk_core::TraceError;

    use super::*;

    #[test]
    fn test_exit_codes()
    {
        assert_eq!(exit_code(&Ok(RunStatus::Finished)), 0);
        assert_eq!(exit_code(&Ok(RunStatus::Halted)), 2);
        assert_eq!(exit_code(&Err(TraceError::MissingTarget(PathBuf::from("/nonexistent/a.out")))), 1);
    }

    #[test]
    fn test_missing_target_returns_error_instead_of_exiting()
    {
        let cli = Cli::parse_from([
            "tracewalk",
            "--target",
            "/nonexistent/tracewalk/a.out",
            "declarations",
            "--line",
            "3",
        ]);

        let result = run_command(&cli);

        assert!(matches!(result, Err(TraceError::MissingTarget(_))));
        assert_eq!(exit_code(&result), 1);
    }

    #[test]
    fn test_only_trace_commands_print_roadmap()
    {
        let command = |args: &[&str]| Cli::parse_from(std::iter::once("tracewalk").chain(args.iter().copied())).command;

        assert!(prints_roadmap(&command(&["trace"])));
        assert!(prints_roadmap(&command(&["check"])));
        assert!(!prints_roadmap(&command(&["memcheck"])));
        assert!(!prints_roadmap(&command(&["declarations", "--line", "12"])));
    }
}
