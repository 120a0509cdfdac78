// ===========================================================================
// gsync stage / unstage - Move changes in and out of the index
// ===========================================================================

use clap::Args;

use crate::cli::{GitSession, Result, Workdir};

#[derive(Args)]
pub struct PathsArgs {
    /// Files to act on (relative to the current directory)
    #[arg(value_name = "PATH")]
    paths: Vec<String>,
}

pub fn stage(args: PathsArgs, session: &mut GitSession, here: &Workdir) -> Result<()> {
    if args.paths.is_empty() {
        session.stage_all()?;
        eprintln!("{}", session.message());
        return Ok(());
    }

    for path in &args.paths {
        session.stage(&here.repo_path(path))?;
        eprintln!("{}", session.message());
    }
    Ok(())
}

pub fn unstage(args: PathsArgs, session: &mut GitSession, here: &Workdir) -> Result<()> {
    if args.paths.is_empty() {
        session.unstage_all()?;
        eprintln!("{}", session.message());
        return Ok(());
    }

    for path in &args.paths {
        session.unstage(&here.repo_path(path))?;
        eprintln!("{}", session.message());
    }
    Ok(())
}
