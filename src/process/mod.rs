// ===========================================================================
// process - Git Subprocess Execution
// ===========================================================================

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

#[cfg(test)]
pub(crate) mod scripted;

pub type Result<T> = std::result::Result<T, Error>;

/// Default upper bound for a single git invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("git executable not found; install git or set `git` in the config")]
    GitNotFound,

    #[error("'git {command}' timed out after {timeout:?} and was terminated")]
    Timeout { command: String, timeout: Duration },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured result of one git invocation.
///
/// `success` already accounts for the benign non-zero exits git produces for
/// some no-op commands (see [`is_benign_failure`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Something that can execute a git command line in a repository.
pub trait Runner {
    fn run(&self, args: &[&str]) -> Result<Output>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, args: &[&str]) -> Result<Output> {
        (**self).run(args)
    }
}

/// Runs the real git binary inside a working directory.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: PathBuf,
    dir: PathBuf,
    timeout: Duration,
}

impl GitCommand {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("git"),
            dir: dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Re-target the runner, e.g. at the repository toplevel once detected.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }
}

impl Runner for GitCommand {
    fn run(&self, args: &[&str]) -> Result<Output> {
        let command = args.join(" ");
        log::debug!("git {command} (in {})", self.dir.display());

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.dir)
            .env("LANG", "en_US.UTF-8")
            .env("LC_ALL", "en_US.UTF-8")
            .env("LANGUAGE", "en")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::GitNotFound,
                _ => Error::Io(e),
            })?;

        // Drain both pipes on their own threads so a chatty command can't
        // fill a pipe buffer and stall the wait below. A grandchild (ssh, a
        // credential helper) may inherit the pipes and outlive git, so the
        // readers are only ever waited on up to the deadline.
        let deadline = Instant::now() + self.timeout;
        let stdout_rx = drain(child.stdout.take());
        let stderr_rx = drain(child.stderr.take());

        let timed_out = |command: String| {
            log::error!("git {command} timed out after {:?}", self.timeout);
            Error::Timeout {
                command,
                timeout: self.timeout,
            }
        };

        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out(command));
        };

        let (Some(stdout), Some(stderr)) = (
            receive(&stdout_rx, deadline),
            receive(&stderr_rx, deadline),
        ) else {
            return Err(timed_out(command));
        };

        let success = status.success() || is_benign_failure(args, &stdout, &stderr);
        if !status.success() {
            log::debug!(
                "git {command} exited with {:?} (treated as {})",
                status.code(),
                if success { "success" } else { "failure" }
            );
        }

        Ok(Output {
            success,
            stdout,
            stderr,
        })
    }
}

/// Read a pipe to the end on a detached thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// `None` when the reader is still blocked at `deadline`.
fn receive(rx: &Receiver<Vec<u8>>, deadline: Instant) -> Option<String> {
    let wait = deadline.saturating_duration_since(Instant::now());
    let buf = rx.recv_timeout(wait).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Non-zero exits that only report "there was nothing to do".
pub fn is_benign_failure(args: &[&str], stdout: &str, stderr: &str) -> bool {
    let says = |needle: &str| stdout.contains(needle) || stderr.contains(needle);

    match args {
        ["commit", ..] => says("nothing to commit"),
        ["stash", "push", ..] => says("No local changes to save"),
        ["reset", ..] => says("Unstaged changes after reset"),
        _ => false,
    }
}
