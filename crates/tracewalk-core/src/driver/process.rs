//! Bounded subprocess supervision.
//!
//! The debugger runs under a wall-clock budget. On expiry the child is
//! killed (never left running) and whatever output it produced so far is
//! returned. Output is collected into shared buffers by background readers so
//! a partial transcript survives even when a grandchild keeps a pipe open.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

/// How long to keep draining pipes after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How a supervised process ended.
#[derive(Debug)]
pub enum ProcessOutcome
{
    /// The process exited on its own within its budget.
    Exited
    {
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Stdout followed by stderr.
        output: String,
    },
    /// The budget expired and the process was killed.
    TimedOut
    {
        /// Output captured before the kill (best effort, may be empty).
        partial: String,
    },
}

/// Wire stdio for supervision. Must be applied before spawning.
pub fn configure(command: &mut Command)
{
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
}

/// Wait for `child` for at most `limit`, killing it on expiry.
///
/// ## Errors
///
/// Returns an I/O error if waiting on the child fails.
pub async fn supervise(mut child: Child, limit: Duration) -> io::Result<ProcessOutcome>
{
    let stdout = Collector::spawn(child.stdout.take());
    let stderr = Collector::spawn(child.stderr.take());

    let status = match time::timeout(limit, child.wait()).await {
        Ok(status) => Some(status?),
        Err(_) => {
            warn!(?limit, pid = child.id(), "process exceeded its budget, killing it");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed-out process");
            }
            None
        }
    };

    let mut output = stdout.finish().await;
    output.push_str(&stderr.finish().await);

    Ok(match status {
        Some(status) => ProcessOutcome::Exited { status, output },
        None => ProcessOutcome::TimedOut { partial: output },
    })
}

/// Background reader appending one pipe into a shared buffer.
struct Collector
{
    buffer: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl Collector
{
    fn spawn<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = stream.map(|mut stream| {
            let sink = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = [0u8; 4096];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if let Ok(mut buffer) = sink.lock() {
                                buffer.extend_from_slice(&chunk[..n]);
                            }
                        }
                    }
                }
            })
        });

        Self { buffer, task }
    }

    async fn finish(self) -> String
    {
        if let Some(mut task) = self.task {
            if time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
                debug!("pipe still open after the process ended, keeping partial output");
                task.abort();
            }
        }

        let bytes = self.buffer.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(all(test, unix))]
mod tests
{
    use super::*;

    fn runtime() -> tokio::runtime::Runtime
    {
        tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
    }

    fn shell(script: &str) -> Command
    {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        configure(&mut command);
        command
    }

    #[test]
    fn test_exited_process_returns_all_output()
    {
        let outcome = runtime().block_on(async {
            let child = shell("echo out; echo err 1>&2").spawn().unwrap();
            supervise(child, Duration::from_secs(10)).await.unwrap()
        });

        match outcome {
            ProcessOutcome::Exited { status, output } => {
                assert!(status.success());
                assert_eq!(output, "out\nerr\n");
            }
            ProcessOutcome::TimedOut { .. } => panic!("expected the process to exit"),
        }
    }

    #[test]
    fn test_timeout_kills_and_keeps_partial_output()
    {
        let started = std::time::Instant::now();
        let outcome = runtime().block_on(async {
            let child = shell("echo partial; exec sleep 30").spawn().unwrap();
            supervise(child, Duration::from_millis(300)).await.unwrap()
        });

        assert!(started.elapsed() < Duration::from_secs(10));
        match outcome {
            ProcessOutcome::TimedOut { partial } => assert!(partial.contains("partial")),
            ProcessOutcome::Exited { .. } => panic!("expected a timeout"),
        }
    }
}
