use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const DEFAULT_SUMMARY_MARKER: &str = "Tests run:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    Failure,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub status: BuildStatus,
    /// `None` when the process never started or was killed.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.status == BuildStatus::Success
    }

    /// First output line mentioning `marker`, e.g. Maven's `Tests run:` tally.
    pub fn summary(&self, marker: &str) -> Option<&str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .find(|line| line.contains(marker))
            .map(str::trim)
    }

    /// Last `lines` lines of stdout followed by stderr.
    pub fn tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stdout.lines().chain(self.stderr.lines()).collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// How long stream readers may keep draining once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runs `command` in `working_dir`, splitting it like a POSIX shell would but
/// without invoking one. The child is killed once `timeout` elapses; whatever
/// it printed until then is kept.
pub async fn run(command: &str, working_dir: &Path, timeout: Duration) -> BuildOutcome {
    let started = Instant::now();
    let Some((program, args)) = split_command(command) else {
        return spawn_failure(format!("cannot parse command `{command}`"), started);
    };

    info!(command, cwd = %working_dir.display(), "running external command");
    let child = Command::new(&program)
        .args(&args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            warn!(command, "failed to spawn: {err}");
            return spawn_failure(format!("failed to spawn `{program}`: {err}"), started);
        }
    };
    let stdout = StreamCapture::start(child.stdout.take());
    let stderr = StreamCapture::start(child.stderr.take());

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let outcome = BuildOutcome {
                status: if status.success() {
                    BuildStatus::Success
                } else {
                    BuildStatus::Failure
                },
                exit_code: status.code(),
                stdout: stdout.collect().await,
                stderr: stderr.collect().await,
                duration: started.elapsed(),
            };
            debug!(command, status = ?outcome.status, exit_code = ?outcome.exit_code, "command finished");
            outcome
        }
        Ok(Err(err)) => BuildOutcome {
            status: BuildStatus::Failure,
            exit_code: None,
            stdout: stdout.collect().await,
            stderr: with_note(
                stderr.collect().await,
                &format!("failed to wait for `{program}`: {err}"),
            ),
            duration: started.elapsed(),
        },
        Err(_) => {
            warn!(command, ?timeout, "command timed out");
            if let Err(err) = child.kill().await {
                warn!(command, "failed to kill timed out command: {err}");
            }
            let (stdout, stderr) = tokio::join!(stdout.collect(), stderr.collect());
            BuildOutcome {
                status: BuildStatus::TimedOut,
                exit_code: None,
                stdout,
                stderr: with_note(stderr, &format!("timed out after {timeout:?}")),
                duration: started.elapsed(),
            }
        }
    }
}

/// One child stream read as it arrives, so a killed child still leaves
/// behind what it printed.
struct StreamCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl StreamCapture {
    fn start<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let reader = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => sink.lock().await.extend_from_slice(&chunk[..read]),
                }
            }
        });
        Self { buffer, reader }
    }

    /// Everything read so far. Grandchildren may hold the pipe open after
    /// the child exits, so the reader only gets `DRAIN_GRACE` to hit EOF.
    async fn collect(self) -> String {
        let mut reader = self.reader;
        if tokio::time::timeout(DRAIN_GRACE, &mut reader).await.is_err() {
            reader.abort();
        }
        let bytes = self.buffer.lock().await;
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn with_note(mut output: String, note: &str) -> String {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(note);
    output
}

fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut words = shlex::split(command)?.into_iter();
    let program = words.next()?;
    Some((program, words.collect()))
}

fn spawn_failure(message: String, started: Instant) -> BuildOutcome {
    BuildOutcome {
        status: BuildStatus::Failure,
        exit_code: None,
        stdout: String::new(),
        stderr: message,
        duration: started.elapsed(),
    }
}
