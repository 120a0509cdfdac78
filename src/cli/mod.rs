// ===========================================================================
// cli - Command Line Interface
// ===========================================================================

mod commands;

use std::path::{Component, Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::git;
use crate::process::GitCommand;
use crate::session::Session;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] crate::config::Error),

    #[error(transparent)]
    Git(#[from] crate::git::Error),

    #[error(transparent)]
    Session(#[from] crate::session::Error),

    #[error(transparent)]
    Prompt(#[from] crate::prompt::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Session over the real git binary, as every subcommand uses it.
pub(crate) type GitSession = Session<GitCommand>;

#[derive(Parser)]
#[command(
    name = "gsync",
    version,
    about = "Keep a git repository in sync: status, staging, commit, push and pull",
    after_help = "Actions are only offered when the repository state allows them; run 'gsync status' to see why one is blocked."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log every git invocation
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show branch, tracking, changes and which actions are available
    Status(commands::StatusArgs),

    /// Show recent commits on the current branch
    Log,

    /// Fetch from the remote
    Fetch,

    /// Fetch, then pull remote commits
    Pull,

    /// Push local commits to the upstream branch
    Push,

    /// Push the current branch and set its upstream
    SetUpstream,

    /// Stage files (all changes when no path is given)
    Stage(commands::PathsArgs),

    /// Unstage files (all staged changes when no path is given)
    Unstage(commands::PathsArgs),

    /// Throw away unstaged changes to tracked files
    Discard(commands::DiscardArgs),

    /// Commit staged changes
    Commit(commands::CommitArgs),

    /// Create .git-sync.toml config file
    Init(commands::InitArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir()?;

        match self.command {
            Command::Init(args) => commands::init::run(args, &cwd),
            Command::Status(args) => commands::status::run(args, &mut open(&cwd)?.0),
            Command::Log => commands::status::log(&mut open(&cwd)?.0),
            Command::Fetch => commands::remote::fetch(&mut open(&cwd)?.0),
            Command::Pull => commands::remote::pull(&mut open(&cwd)?.0),
            Command::Push => commands::remote::push(&mut open(&cwd)?.0),
            Command::SetUpstream => commands::remote::set_upstream(&mut open(&cwd)?.0),
            Command::Stage(args) => {
                let (mut session, here) = open(&cwd)?;
                commands::stage::stage(args, &mut session, &here)
            }
            Command::Unstage(args) => {
                let (mut session, here) = open(&cwd)?;
                commands::stage::unstage(args, &mut session, &here)
            }
            Command::Discard(args) => {
                let (mut session, here) = open(&cwd)?;
                commands::discard::run(args, &mut session, &here)
            }
            Command::Commit(args) => commands::commit::run(args, &mut open(&cwd)?.0),
        }
    }
}

/// Load config, find the repository root and open a session there.
fn open(cwd: &Path) -> Result<(GitSession, Workdir)> {
    let config = Config::load(cwd)?;
    let probe = GitCommand::new(cwd)
        .with_program(&config.git)
        .with_timeout(config.timeout);
    let root = git::toplevel(&probe)?;
    let session = Session::open(probe.in_dir(&root), &config)?;
    Ok((session, Workdir::new(cwd, &root)))
}

/// Maps paths typed relative to the shell's directory onto the
/// root-relative form git status reports.
pub(crate) struct Workdir {
    cwd: PathBuf,
    root: PathBuf,
}

impl Workdir {
    pub(crate) fn new(cwd: &Path, root: &Path) -> Self {
        Self {
            cwd: cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf()),
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    pub(crate) fn repo_path(&self, input: &str) -> String {
        let joined = self.cwd.join(input);
        let mut normal = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normal.pop();
                }
                other => normal.push(other),
            }
        }

        match normal.strip_prefix(&self.root) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => input.to_string(),
        }
    }
}
