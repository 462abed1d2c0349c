//! Child-process spawning, output draining and process-tree cleanup.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::shell::CommandInvocation;

/// Stop retaining output past this many bytes per stream (draining continues).
const MAX_CAPTURE_BYTES: usize = 8 * 1024 * 1024;
/// How long pipes may stay open after the shell exits (background jobs can
/// hold them).
const POST_EXIT_DRAIN_GRACE: Duration = Duration::from_secs(2);
/// Drain window after a forced kill.
const POST_KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);
/// Bound on reaping a killed child.
const REAP_TIMEOUT: Duration = Duration::from_secs(2);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How the child process ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum ProcessExit {
    Exited(i32),
    TimedOut,
}

/// Raw bytes collected from one child process.
#[derive(Debug)]
pub(super) struct ProcessOutput {
    pub(super) stdout: Vec<u8>,
    pub(super) stderr: Vec<u8>,
    pub(super) exit: ProcessExit,
    pub(super) truncated: bool,
}

/// Spawn `invocation`, wait up to `limit`, and collect its output.
///
/// Errors are spawn/wait failures only; a timeout is a normal outcome. The
/// child and its process group are killed on timeout and whenever this
/// future is dropped before completion.
pub(super) async fn run_invocation(
    invocation: &CommandInvocation,
    limit: Duration,
) -> io::Result<ProcessOutput> {
    let mut cmd = build_command(invocation);
    let mut child = cmd.spawn()?;
    let mut tree = ProcessTreeGuard::new(child.id());
    debug!(pid = ?child.id(), program = invocation.program(), "spawned child process");

    let stdout_buf = SharedBuffer::default();
    let stderr_buf = SharedBuffer::default();
    let stdout_task = child
        .stdout
        .take()
        .map(|reader| tokio::spawn(drain(reader, stdout_buf.clone())));
    let stderr_task = child
        .stderr
        .take()
        .map(|reader| tokio::spawn(drain(reader, stderr_buf.clone())));

    let exit = match timeout(limit, child.wait()).await {
        Ok(Ok(status)) => {
            tree.disarm();
            ProcessExit::Exited(exit_code(status))
        }
        Ok(Err(err)) => {
            tree.kill();
            let _ = child.start_kill();
            abort_drain(stdout_task);
            abort_drain(stderr_task);
            return Err(err);
        }
        Err(_) => {
            warn!(pid = ?child.id(), ?limit, "command timed out; killing process tree");
            tree.kill();
            let _ = child.start_kill();
            if timeout(REAP_TIMEOUT, child.wait()).await.is_err() {
                warn!(pid = ?child.id(), "child did not exit after kill");
            }
            ProcessExit::TimedOut
        }
    };

    let grace = match exit {
        ProcessExit::Exited(_) => POST_EXIT_DRAIN_GRACE,
        ProcessExit::TimedOut => POST_KILL_DRAIN_GRACE,
    };
    finish_drain(stdout_task, grace).await;
    finish_drain(stderr_task, grace).await;

    let (stdout, stdout_truncated) = stdout_buf.take();
    let (stderr, stderr_truncated) = stderr_buf.take();
    Ok(ProcessOutput {
        stdout,
        stderr,
        exit,
        truncated: stdout_truncated || stderr_truncated,
    })
}

fn build_command(invocation: &CommandInvocation) -> Command {
    let mut cmd = Command::new(invocation.program());
    cmd.args(invocation.args());
    if let Some(tail) = invocation.verbatim_tail() {
        #[cfg(windows)]
        cmd.raw_arg(tail);
        #[cfg(not(windows))]
        cmd.arg(tail);
    }
    // No stdin: commands that probe it (ripgrep, read) must not hang.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group: the child can never become the terminal's
    // foreground group, and the whole group can be killed on timeout.
    #[cfg(unix)]
    cmd.process_group(0);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            // Same convention shells use for signal deaths.
            return 128 + signal;
        }
    }
    -1
}

#[derive(Clone, Default)]
struct SharedBuffer {
    inner: Arc<Mutex<BufferState>>,
}

#[derive(Default)]
struct BufferState {
    bytes: Vec<u8>,
    truncated: bool,
}

impl SharedBuffer {
    fn push(&self, chunk: &[u8]) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let room = MAX_CAPTURE_BYTES.saturating_sub(state.bytes.len());
        if chunk.len() > room {
            state.truncated = true;
        }
        let keep = chunk.len().min(room);
        state.bytes.extend_from_slice(&chunk[..keep]);
    }

    fn take(&self) -> (Vec<u8>, bool) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        (std::mem::take(&mut state.bytes), state.truncated)
    }
}

async fn drain<R>(mut reader: R, buffer: SharedBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.push(&chunk[..n]),
            Err(err) => {
                debug!(error = %err, "output pipe read failed");
                break;
            }
        }
    }
}

async fn finish_drain(task: Option<JoinHandle<()>>, grace: Duration) {
    let Some(mut handle) = task else {
        return;
    };
    if timeout(grace, &mut handle).await.is_err() {
        // A surviving descendant still holds the pipe open.
        debug!("output pipe still open after grace period; abandoning reader");
        handle.abort();
    }
}

fn abort_drain(task: Option<JoinHandle<()>>) {
    if let Some(handle) = task {
        handle.abort();
    }
}

/// Kills the child's whole process tree unless disarmed.
///
/// Dropping an in-flight execution (for example on Ctrl-C) drops this guard,
/// so descendants are reclaimed too, not just the direct child.
struct ProcessTreeGuard {
    pid: Option<u32>,
}

impl ProcessTreeGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn disarm(&mut self) {
        self.pid = None;
    }

    fn kill(&mut self) {
        if let Some(pid) = self.pid.take() {
            if let Err(err) = kill_process_tree(pid) {
                debug!(pid, error = %err, "process tree kill failed");
            }
        }
    }
}

impl Drop for ProcessTreeGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_tree(pid: u32) -> io::Result<()> {
    // Spawned with process_group(0), so the PGID equals the PID.
    let pgid = pid as libc::pid_t;
    // SAFETY: killpg takes plain integers and touches no memory we own.
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(windows)]
fn kill_process_tree(pid: u32) -> io::Result<()> {
    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        debug!(pid, ?status, "taskkill reported failure");
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn kill_process_tree(_pid: u32) -> io::Result<()> {
    Ok(())
}
