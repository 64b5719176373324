//! External process execution with a hard timeout.
//!
//! A hung child is killed once its budget expires so a stuck tool can never
//! stall the sampling loop for longer than the timeout.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, StatbarError};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exit status and captured stdout of a finished child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Start the child as leader of its own process group so anything it
/// forks can be killed with it.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill the child and every process left in its group.
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    // The group id is the leader's pid and stays reserved while any member
    // is alive, even after the leader was reaped
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

/// Run `program args...`, killing it if it outlives `timeout`.
///
/// Stdout is drained on a helper thread so a chatty child cannot block on a
/// full pipe while we wait on it. The budget covers the drain too: a
/// background process that inherited the pipe cannot hold the caller past
/// `timeout` after the child itself exited.
pub fn run_with_timeout(program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    isolate(&mut command);
    let mut child = command.spawn()?;

    let (tx, rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }

    let start = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if start.elapsed() >= timeout => {
                kill_group(&mut child);
                let _ = child.wait();
                log::debug!("{} killed after {:?}", program, timeout);
                return Err(StatbarError::timeout(program, timeout));
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let remaining = timeout.saturating_sub(start.elapsed());
    let bytes = match rx.recv_timeout(remaining) {
        Ok(bytes) => bytes,
        // No stdout was captured
        Err(mpsc::RecvTimeoutError::Disconnected) => Vec::new(),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            kill_group(&mut child);
            log::debug!("{} left its output pipe open past {:?}", program, timeout);
            return Err(StatbarError::timeout(program, timeout));
        }
    };

    Ok(CommandOutput {
        // Signal-terminated children have no code
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Like [`run_with_timeout`] but a nonzero exit is an error.
pub fn run_checked(program: &str, args: &[String], timeout: Duration) -> Result<String> {
    let output = run_with_timeout(program, args, timeout)?;
    if !output.success() {
        return Err(StatbarError::process_failed(program, output.exit_code));
    }
    Ok(output.stdout)
}

/// Whether `program` resolves on PATH (or is an existing path).
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}
