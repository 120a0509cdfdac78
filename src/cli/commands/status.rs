// ===========================================================================
// gsync status / log - Show repository state and available actions
// ===========================================================================

use clap::Args;
use serde::Serialize;

use crate::cli::{GitSession, Result};
use crate::gate::{self, Decision};
use crate::snapshot::{CommitLog, RepositorySnapshot, Tracking};
use crate::status::StatusEntry;

#[derive(Args)]
pub struct StatusArgs {
    /// Print the snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    remote: Option<&'a str>,
    #[serde(flatten)]
    snapshot: &'a RepositorySnapshot,
    actions: Vec<Action>,
}

#[derive(Debug, Serialize)]
struct Action {
    action: &'static str,
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl Action {
    fn new(action: &'static str, decision: Decision) -> Self {
        let reason = match decision {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(reason),
        };
        Self {
            action,
            allowed: reason.is_none(),
            reason,
        }
    }
}

/// Repository-wide actions. `gsync pull` fetches first, so pull is judged
/// as if a fetch already happened.
fn actions(snap: &RepositorySnapshot, remote: Option<&str>) -> Vec<Action> {
    vec![
        Action::new("stage", gate::can_stage_all(snap)),
        Action::new("unstage", gate::can_unstage_all(snap)),
        Action::new("commit", commit_readiness(snap)),
        Action::new("fetch", gate::can_fetch(remote, false)),
        Action::new("pull", gate::can_pull(snap, true)),
        Action::new("push", gate::can_push(snap)),
        Action::new("set-upstream", gate::can_set_upstream(remote, false)),
    ]
}

/// Commit check without a message; any non-blank message would do.
fn commit_readiness(snap: &RepositorySnapshot) -> Decision {
    gate::can_commit(snap, "-")
}

pub fn run(args: StatusArgs, session: &mut GitSession) -> Result<()> {
    let remote = session.remote().map(str::to_string);
    let snap = session.refresh()?;
    let actions = actions(snap, remote.as_deref());

    if args.json {
        let report = Report {
            remote: remote.as_deref(),
            snapshot: snap,
            actions,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_header(snap, remote.as_deref());
    print_entries("Staged", snap.staged());
    print_entries("Unstaged", snap.unstaged());
    if snap.is_clean() {
        println!("Working tree clean");
    }

    if snap.has_conflicts() {
        println!();
        println!("Merge conflicts present; resolve them before committing, pushing or pulling.");
    }
    if snap.is_behind_remote() {
        println!();
        println!("Incoming ({}):", snap.behind_count());
        print_log(snap.pull_log());
    }
    if snap.is_ahead_remote() {
        println!();
        println!("Outgoing ({}):", snap.ahead_count());
        print_log(snap.push_log());
    }

    println!();
    print_actions(&actions);
    Ok(())
}

pub fn log(session: &mut GitSession) -> Result<()> {
    let snap = session.refresh()?;
    match snap.history() {
        CommitLog::Commits(commits) => {
            for line in commits {
                println!("{line}");
            }
        }
        CommitLog::Empty => eprintln!("No commits yet."),
        CommitLog::Failed(e) => eprintln!("History unavailable: {e}"),
    }
    Ok(())
}

fn print_header(snap: &RepositorySnapshot, remote: Option<&str>) {
    let branch = snap.branch().unwrap_or("(unknown)");
    match snap.tracking() {
        Tracking::Upstream {
            name,
            ahead,
            behind,
        } => println!("On {branch}, tracking {name} (ahead {ahead}, behind {behind})"),
        Tracking::None => match remote {
            Some(remote) => println!("On {branch}, no upstream (run `gsync set-upstream` to track {remote})"),
            None => println!("On {branch}, no remote configured"),
        },
    }
}

fn print_entries(title: &str, entries: &[StatusEntry]) {
    println!();
    if entries.is_empty() {
        println!("{title}: none");
        return;
    }
    println!("{title} ({}):", entries.len());
    let width = entries.iter().map(|e| e.path.len()).max().unwrap_or(0);
    for entry in entries {
        println!("  {:<width$}   {}", entry.path, entry.describe(), width = width);
    }
}

fn print_log(log: &CommitLog) {
    match log {
        CommitLog::Commits(commits) => {
            for line in commits {
                println!("  {line}");
            }
        }
        CommitLog::Empty => println!("  (none)"),
        CommitLog::Failed(e) => println!("  (unavailable: {e})"),
    }
}

fn print_actions(actions: &[Action]) {
    let width = actions.iter().map(|a| a.action.len()).max().unwrap_or(6).max(6);
    println!("{:<width$}   {}", "ACTION", "STATUS", width = width);
    println!("{}", "-".repeat(width + 40));
    for action in actions {
        let status = match action.reason {
            None => "ready".to_string(),
            Some(reason) => format!("blocked: {reason}"),
        };
        println!("{:<width$}   {status}", action.action, width = width);
    }
}
