// ===========================================================================
// gsync fetch / pull / push / set-upstream - Remote synchronization
// ===========================================================================

use crate::cli::{GitSession, Result};
use crate::snapshot::CommitLog;

pub fn fetch(session: &mut GitSession) -> Result<()> {
    session.fetch()?;
    eprintln!("{}", session.message());

    if let Some(snap) = session.snapshot() {
        if snap.is_behind_remote() {
            eprintln!("{} commit(s) to pull:", snap.behind_count());
            print_log(snap.pull_log());
        }
    }
    Ok(())
}

/// Pulling needs a fetch in the same session, so always fetch first.
pub fn pull(session: &mut GitSession) -> Result<()> {
    session.fetch()?;
    log::debug!("{}", session.message());

    session.pull()?;
    eprintln!("{}", session.message());
    Ok(())
}

pub fn push(session: &mut GitSession) -> Result<()> {
    let pending = session.refresh()?.push_log().clone();
    session.push()?;
    eprintln!("{}", session.message());
    print_log(&pending);
    Ok(())
}

pub fn set_upstream(session: &mut GitSession) -> Result<()> {
    session.set_upstream()?;
    eprintln!("{}", session.message());
    Ok(())
}

fn print_log(log: &CommitLog) {
    match log {
        CommitLog::Commits(commits) => {
            for line in commits {
                println!("  {line}");
            }
        }
        CommitLog::Empty => {}
        CommitLog::Failed(e) => eprintln!("  (log unavailable: {e})"),
    }
}
