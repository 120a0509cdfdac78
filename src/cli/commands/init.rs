// ===========================================================================
// gsync init - Initialize project configuration
// ===========================================================================

use std::path::Path;

use clap::Args;

use crate::cli::{Error, Result};
use crate::config::{Config, FileConfig, PROJECT_FILE};
use crate::git;
use crate::process::GitCommand;

#[derive(Args)]
pub struct InitArgs {
    /// Remote to sync with (auto-detected: origin > first remote)
    #[arg(long, value_name = "NAME")]
    remote: Option<String>,
}

pub fn run(args: InitArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let runner = GitCommand::new(cwd)
        .with_program(&config.git)
        .with_timeout(config.timeout);

    // Write next to .git when inside a repository
    let root = match git::toplevel(&runner) {
        Ok(root) => root,
        Err(git::Error::NotInRepo) => cwd.to_path_buf(),
        Err(e) => return Err(e.into()),
    };
    let config_path = root.join(PROJECT_FILE);

    if config_path.exists() {
        return Err(Error::Other("Config file already exists".into()));
    }

    let remote = args
        .remote
        .or_else(|| detect_remote(&runner.in_dir(&root)));

    let mut file = FileConfig::default();
    file.general.remote = remote.clone();

    let content = toml::to_string_pretty(&file).map_err(|e| Error::Other(e.to_string()))?;
    std::fs::write(&config_path, content)?;

    eprintln!("Created {}", config_path.display());
    match remote {
        Some(name) => eprintln!("Remote: {name}"),
        None => eprintln!("Remote: (none yet; add one with `git remote add`)"),
    }

    Ok(())
}

fn detect_remote(runner: &GitCommand) -> Option<String> {
    let remotes = git::remotes(runner).ok()?;
    remotes
        .iter()
        .find(|r| r.as_str() == "origin")
        .or_else(|| remotes.first())
        .cloned()
}
