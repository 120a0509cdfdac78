// ===========================================================================
// gsync commit - Commit staged changes
// ===========================================================================

use clap::Args;

use crate::cli::{GitSession, Result};

#[derive(Args)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short, long, value_name = "MESSAGE")]
    message: String,
}

pub fn run(args: CommitArgs, session: &mut GitSession) -> Result<()> {
    session.commit(&args.message)?;
    eprintln!("{}", session.message());

    if let Some(snap) = session.snapshot() {
        if snap.is_ahead_remote() {
            eprintln!("{} commit(s) ready to push", snap.ahead_count());
        }
    }
    Ok(())
}
