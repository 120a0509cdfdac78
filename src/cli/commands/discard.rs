// ===========================================================================
// gsync discard - Throw away worktree changes
// ===========================================================================

use clap::Args;

use crate::cli::{Error, GitSession, Result, Workdir};
use crate::prompt;

#[derive(Args)]
pub struct DiscardArgs {
    /// Tracked files to restore from the index
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    paths: Vec<String>,

    /// Skip confirmation
    #[arg(short, long)]
    yes: bool,
}

pub fn run(args: DiscardArgs, session: &mut GitSession, here: &Workdir) -> Result<()> {
    let paths: Vec<String> = args.paths.iter().map(|p| here.repo_path(p)).collect();

    if !args.yes && !prompt::confirm(&prompt::discard_message(&paths))? {
        return Err(Error::Other("Aborted".into()));
    }

    for path in &paths {
        session.discard(path)?;
        eprintln!("{}", session.message());
    }
    Ok(())
}
