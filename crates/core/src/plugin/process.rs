//! External process execution with timeouts and cancellation
//!
//! Every tool invocation goes through [`run_process`], which owns the child
//! handle for its whole life. On unix the child leads its own process group,
//! and the whole group is killed when the timeout expires, when the run's
//! [`CancelToken`] fires, or once the child exits leaving helpers behind.

use crate::error::PluginError;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;
use wait_timeout::ChildExt;

/// How often a waiting runner re-checks the cancellation flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed to drain output after the child exits, even past the deadline.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Shared flag that aborts in-flight and pending tool runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Run `program` to completion, bounded by `timeout` and `cancel`.
///
/// Launch failures map to [`PluginError::Unavailable`]; an expired timeout to
/// [`PluginError::Timeout`]; cancellation to [`PluginError::Cancelled`]. The
/// exit code is returned as-is for the caller to judge.
pub fn run_process(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<ProcessOutput, PluginError> {
    if cancel.is_cancelled() {
        return Err(PluginError::Cancelled);
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    isolate(&mut command);

    debug!(program, ?args, "spawning");
    let mut child = command.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => PluginError::Unavailable(format!("{}: command not found", program)),
        _ => PluginError::Unavailable(format!("{}: {}", program, e)),
    })?;

    // Drain both pipes concurrently so a chatty tool never blocks on a full pipe.
    let (tx, rx) = mpsc::channel();
    spawn_reader(child.stdout.take(), Stream::Stdout, tx.clone());
    spawn_reader(child.stderr.take(), Stream::Stderr, tx);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if cancel.is_cancelled() {
            kill(&mut child);
            return Err(PluginError::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            kill(&mut child);
            return Err(PluginError::Timeout(timeout));
        }
        match child.wait_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(Some(status)) => break status,
            Ok(None) => continue,
            Err(e) => {
                kill(&mut child);
                return Err(PluginError::Execution(format!("{}: {}", program, e)));
            }
        }
    };

    // Background helpers may still hold the pipes open.
    kill_group(&child);
    let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
    let (stdout, stderr) = collect_output(&rx, drain_deadline, timeout, cancel)?;

    Ok(ProcessOutput {
        status: status.code(),
        stdout,
        stderr,
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Wait for both pipe readers, bounded by the same deadline and cancel token.
fn collect_output(
    rx: &Receiver<(Stream, String)>,
    deadline: Instant,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<(String, String), PluginError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    loop {
        if cancel.is_cancelled() {
            return Err(PluginError::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(PluginError::Timeout(timeout));
        }
        match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok((Stream::Stdout, text)) => stdout = text,
            Ok((Stream::Stderr, text)) => stderr = text,
            Err(RecvTimeoutError::Timeout) => continue,
            // Both readers are done.
            Err(RecvTimeoutError::Disconnected) => return Ok((stdout, stderr)),
        }
    }
}

/// First non-empty line of `binary --version`.
pub fn tool_version(binary: &str) -> Option<String> {
    let output = run_process(
        binary,
        &["--version".to_string()],
        None,
        VERSION_TIMEOUT,
        &CancelToken::new(),
    )
    .ok()?;
    output
        .combined()
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>, stream: Stream, tx: Sender<(Stream, String)>) {
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
        });
    }
}

/// Put the child in a new process group led by itself.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill everything left in the child's process group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) takes no pointers; a negative pid addresses the group.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn kill(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}
