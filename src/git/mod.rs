// ===========================================================================
// git - Git Operations via CLI
// ===========================================================================

pub mod failure;

use std::path::PathBuf;

use crate::process::{self, Output, Runner};

pub use failure::{Failure, FailureKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Process(#[from] process::Error),

    #[error("{0}")]
    Command(Failure),

    #[error("not in a git repository")]
    NotInRepo,
}

impl Error {
    /// The classified failure, when git itself reported one.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Command(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Run git and return stdout, turning an unsuccessful exit into a `Failure`.
fn run(runner: &impl Runner, args: &[&str]) -> Result<String> {
    let Output {
        success,
        stdout,
        stderr,
    } = runner.run(args)?;

    if success {
        Ok(stdout)
    } else {
        Err(Error::Command(Failure::new(args, &stdout, &stderr)))
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// `git --version`, e.g. "git version 2.43.0"
pub fn version(runner: &impl Runner) -> Result<String> {
    Ok(run(runner, &["--version"])?.trim().to_string())
}

/// Absolute path of the working tree root.
pub fn toplevel(runner: &impl Runner) -> Result<PathBuf> {
    match run(runner, &["rev-parse", "--show-toplevel"]) {
        Ok(out) => Ok(PathBuf::from(out.trim())),
        Err(Error::Command(_)) => Err(Error::NotInRepo),
        Err(e) => Err(e),
    }
}

/// Names of all configured remotes.
pub fn remotes(runner: &impl Runner) -> Result<Vec<String>> {
    Ok(run(runner, &["remote"])?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

pub fn remote_url(runner: &impl Runner, name: &str) -> Result<String> {
    Ok(run(runner, &["remote", "get-url", name])?.trim().to_string())
}

/// Current branch name; "HEAD" when detached.
pub fn current_branch(runner: &impl Runner) -> Result<String> {
    Ok(run(runner, &["rev-parse", "--abbrev-ref", "HEAD"])?
        .trim()
        .to_string())
}

// ---------------------------------------------------------------------------
// Working tree & index
// ---------------------------------------------------------------------------

/// Raw `status --porcelain -uall` output.
pub fn status(runner: &impl Runner) -> Result<String> {
    run(runner, &["status", "--porcelain", "-uall"])
}

pub fn stage_all(runner: &impl Runner) -> Result<()> {
    run(runner, &["add", "."]).map(drop)
}

pub fn stage(runner: &impl Runner, path: &str) -> Result<()> {
    run(runner, &["add", "--", path]).map(drop)
}

pub fn unstage_all(runner: &impl Runner) -> Result<()> {
    run(runner, &["reset"]).map(drop)
}

pub fn unstage(runner: &impl Runner, path: &str) -> Result<()> {
    run(runner, &["reset", "HEAD", "--", path]).map(drop)
}

/// Throw away worktree changes to a tracked path.
pub fn discard(runner: &impl Runner, path: &str) -> Result<()> {
    run(runner, &["checkout", "--", path]).map(drop)
}

pub fn commit(runner: &impl Runner, message: &str) -> Result<String> {
    run(runner, &["commit", "-m", message])
}

// ---------------------------------------------------------------------------
// Remote sync
// ---------------------------------------------------------------------------

pub fn fetch(runner: &impl Runner, remote: &str) -> Result<()> {
    run(runner, &["fetch", remote]).map(drop)
}

pub fn pull(runner: &impl Runner) -> Result<String> {
    run(runner, &["pull"])
}

pub fn push(runner: &impl Runner) -> Result<String> {
    run(runner, &["push"])
}

pub fn set_upstream(runner: &impl Runner, remote: &str, branch: &str) -> Result<String> {
    run(runner, &["push", "--set-upstream", remote, branch])
}

/// Raw result of the upstream query; interpretation lives in the aggregator.
pub fn upstream(runner: &impl Runner) -> Result<String> {
    run(
        runner,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
    )
}

/// Commits on the upstream not yet in HEAD.
pub fn behind_count(runner: &impl Runner) -> Result<u32> {
    Ok(parse_count(&run(runner, &["rev-list", "--count", "HEAD..@{u}"])?))
}

/// Commits in HEAD not yet on the upstream.
pub fn ahead_count(runner: &impl Runner) -> Result<u32> {
    Ok(parse_count(&run(runner, &["rev-list", "--count", "@{u}..HEAD"])?))
}

/// Unparsable counts read as zero.
fn parse_count(output: &str) -> u32 {
    output.trim().parse().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One-line summaries of commits waiting to be pulled.
pub fn pull_log(runner: &impl Runner, limit: usize) -> Result<Vec<String>> {
    range_log(runner, "HEAD..@{u}", limit)
}

/// One-line summaries of commits waiting to be pushed.
pub fn push_log(runner: &impl Runner, limit: usize) -> Result<Vec<String>> {
    range_log(runner, "@{u}..HEAD", limit)
}

fn range_log(runner: &impl Runner, range: &str, limit: usize) -> Result<Vec<String>> {
    let max = format!("--max-count={limit}");
    let out = run(
        runner,
        &["log", "--oneline", "--pretty=format:%h %s", &max, range],
    )?;
    Ok(lines(&out))
}

/// Most recent commits on the current branch: "hash when | subject (author)".
pub fn history(runner: &impl Runner, limit: usize) -> Result<Vec<String>> {
    let max = format!("--max-count={limit}");
    let out = run(
        runner,
        &[
            "log",
            "--pretty=format:%h %ad | %s (%an)",
            "--date=relative",
            &max,
        ],
    )?;
    Ok(lines(&out))
}

fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
