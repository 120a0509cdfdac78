// ===========================================================================
// snapshot - Reconciled Repository State
// ===========================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::git::{self, Error};
use crate::process::Runner;
use crate::status::{self, StatusEntry};

/// Hard cap on commit summaries kept per log.
pub const MAX_LOG_ENTRIES: usize = 10;

/// Upstream failures that just mean "this branch doesn't track anything".
const NOT_CONFIGURED: &[&str] = &[
    "no upstream configured",
    "unknown revision",
    "no such branch",
    "does not point to a branch",
    "ambiguous argument 'HEAD'",
];

/// Unborn branch: `git log` fails but there is simply nothing to show.
const NO_COMMITS_YET: &str = "does not have any commits yet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Tracking {
    None,
    Upstream { name: String, ahead: u32, behind: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum CommitLog {
    Commits(Vec<String>),
    Empty,
    Failed(String),
}

impl CommitLog {
    fn from_query(result: git::Result<Vec<String>>) -> Self {
        match result {
            Ok(commits) if commits.is_empty() => CommitLog::Empty,
            Ok(commits) => CommitLog::Commits(commits),
            Err(e) => CommitLog::Failed(e.to_string()),
        }
    }

    pub fn commits(&self) -> &[String] {
        match self {
            CommitLog::Commits(commits) => commits,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub log: usize,
    pub history: usize,
}

impl Limits {
    pub fn new(log: usize, history: usize) -> Self {
        Self {
            log: log.clamp(1, MAX_LOG_ENTRIES),
            history: history.clamp(1, MAX_LOG_ENTRIES),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(MAX_LOG_ENTRIES, MAX_LOG_ENTRIES)
    }
}

/// Everything the action gate needs, gathered in one refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    branch: Option<String>,
    staged: Vec<StatusEntry>,
    unstaged: Vec<StatusEntry>,
    has_conflicts: bool,
    tracking: Tracking,
    pull_log: CommitLog,
    push_log: CommitLog,
    history: CommitLog,
    refreshed_at: DateTime<Utc>,
}

impl RepositorySnapshot {
    /// The only way to build a snapshot. Conflicts are derived from the
    /// entries; range logs are dropped when their count can't back them.
    pub fn new(
        branch: Option<String>,
        lists: status::StatusLists,
        tracking: Tracking,
        pull_log: CommitLog,
        push_log: CommitLog,
        history: CommitLog,
    ) -> Self {
        let has_conflicts = lists
            .staged
            .iter()
            .chain(&lists.unstaged)
            .any(StatusEntry::is_conflicted);

        let (behind, ahead) = match &tracking {
            Tracking::None => (0, 0),
            Tracking::Upstream { ahead, behind, .. } => (*behind, *ahead),
        };

        Self {
            branch,
            staged: lists.staged,
            unstaged: lists.unstaged,
            has_conflicts,
            tracking,
            pull_log: if behind > 0 { pull_log } else { CommitLog::Empty },
            push_log: if ahead > 0 { push_log } else { CommitLog::Empty },
            history,
            refreshed_at: Utc::now(),
        }
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn staged(&self) -> &[StatusEntry] {
        &self.staged
    }

    pub fn unstaged(&self) -> &[StatusEntry] {
        &self.unstaged
    }

    pub fn has_conflicts(&self) -> bool {
        self.has_conflicts
    }

    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    pub fn upstream(&self) -> Option<&str> {
        match &self.tracking {
            Tracking::Upstream { name, .. } => Some(name),
            Tracking::None => None,
        }
    }

    pub fn upstream_configured(&self) -> bool {
        matches!(self.tracking, Tracking::Upstream { .. })
    }

    pub fn ahead_count(&self) -> u32 {
        match self.tracking {
            Tracking::Upstream { ahead, .. } => ahead,
            Tracking::None => 0,
        }
    }

    pub fn behind_count(&self) -> u32 {
        match self.tracking {
            Tracking::Upstream { behind, .. } => behind,
            Tracking::None => 0,
        }
    }

    pub fn is_ahead_remote(&self) -> bool {
        self.ahead_count() > 0
    }

    pub fn is_behind_remote(&self) -> bool {
        self.behind_count() > 0
    }

    pub fn pull_log(&self) -> &CommitLog {
        &self.pull_log
    }

    pub fn push_log(&self) -> &CommitLog {
        &self.push_log
    }

    pub fn history(&self) -> &CommitLog {
        &self.history
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn find_staged(&self, path: &str) -> Option<&StatusEntry> {
        self.staged.iter().find(|e| e.path == path)
    }

    pub fn find_unstaged(&self, path: &str) -> Option<&StatusEntry> {
        self.unstaged.iter().find(|e| e.path == path)
    }

    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

/// Run every query a refresh needs and fold the answers into a snapshot.
///
/// Only the status query is fatal; the rest degrade to "no upstream",
/// zero counts or a failed log.
pub fn collect(runner: &impl Runner, limits: Limits) -> git::Result<RepositorySnapshot> {
    let lists = status::parse(&git::status(runner)?);

    let branch = match git::current_branch(runner) {
        Ok(branch) => Some(branch),
        Err(Error::Process(e)) => return Err(e.into()),
        Err(e) => {
            log::debug!("no current branch: {e}");
            None
        }
    };

    let tracking = match detect_upstream(runner)? {
        Some(name) => Tracking::Upstream {
            name,
            behind: count_or_zero(git::behind_count(runner), "behind")?,
            ahead: count_or_zero(git::ahead_count(runner), "ahead")?,
        },
        None => Tracking::None,
    };

    let pull_log = match &tracking {
        Tracking::Upstream { behind, .. } if *behind > 0 => {
            CommitLog::from_query(git::pull_log(runner, limits.log))
        }
        _ => CommitLog::Empty,
    };
    let push_log = match &tracking {
        Tracking::Upstream { ahead, .. } if *ahead > 0 => {
            CommitLog::from_query(git::push_log(runner, limits.log))
        }
        _ => CommitLog::Empty,
    };

    let history = match git::history(runner, limits.history) {
        Err(Error::Command(failure)) if failure.detail.contains(NO_COMMITS_YET) => {
            CommitLog::Empty
        }
        result => CommitLog::from_query(result),
    };

    Ok(RepositorySnapshot::new(
        branch, lists, tracking, pull_log, push_log, history,
    ))
}

/// `Some(upstream)` when the current branch tracks one.
///
/// A subprocess-level error (git missing, timeout) still aborts the refresh.
fn detect_upstream(runner: &impl Runner) -> git::Result<Option<String>> {
    match git::upstream(runner) {
        Ok(out) => {
            let name = out.trim();
            Ok((!name.is_empty()).then(|| name.to_string()))
        }
        Err(Error::Command(failure)) => {
            if NOT_CONFIGURED.iter().any(|p| failure.detail.contains(p)) {
                log::debug!("no upstream configured");
            } else {
                log::warn!("upstream query failed unexpectedly: {}", failure.detail);
            }
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn count_or_zero(result: git::Result<u32>, which: &str) -> git::Result<u32> {
    match result {
        Ok(count) => Ok(count),
        Err(Error::Command(failure)) => {
            log::warn!("{which} count query failed: {}", failure.detail);
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::scripted::ScriptedRunner;
    use crate::process::Output;

    const UPSTREAM: &str = "rev-parse --abbrev-ref --symbolic-full-name @{u}";
    const BEHIND: &str = "rev-list --count HEAD..@{u}";
    const AHEAD: &str = "rev-list --count @{u}..HEAD";
    const PULL_LOG: &str = "log --oneline --pretty=format:%h %s --max-count=10 HEAD..@{u}";
    const PUSH_LOG: &str = "log --oneline --pretty=format:%h %s --max-count=10 @{u}..HEAD";
    const HISTORY: &str = "log --pretty=format:%h %ad | %s (%an) --date=relative --max-count=10";

    #[test]
    fn test_clean_repo() {
        let runner = ScriptedRunner::clean_repo();
        let snap = collect(&runner, Limits::default()).unwrap();

        assert!(snap.is_clean());
        assert!(!snap.has_conflicts());
        assert_eq!(snap.branch(), Some("main"));
        assert_eq!(snap.upstream(), Some("origin/main"));
        assert_eq!(snap.ahead_count(), 0);
        assert_eq!(snap.behind_count(), 0);
        assert_eq!(snap.pull_log(), &CommitLog::Empty);
        assert_eq!(snap.push_log(), &CommitLog::Empty);
        assert_eq!(snap.history().commits().len(), 1);

        // logs are not queried when counts are zero
        assert!(!runner.was_called(PULL_LOG));
        assert!(!runner.was_called(PUSH_LOG));
    }

    #[test]
    fn test_conflicts_detected() {
        let runner = ScriptedRunner::clean_repo().on(
            "status --porcelain -uall",
            Output::ok("M  a.txt\n?? b.txt\nUU c.txt\n"),
        );
        let snap = collect(&runner, Limits::default()).unwrap();

        assert!(snap.has_conflicts());
        let staged: Vec<_> = snap.staged().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(staged, vec!["a.txt", "c.txt"]);
        assert!(snap.find_staged("c.txt").unwrap().is_conflicted());
        assert!(snap.find_unstaged("a.txt").is_none());
        let unstaged: Vec<_> = snap.unstaged().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(unstaged, vec!["b.txt", "c.txt"]);
    }

    #[test]
    fn test_behind_with_pull_log() {
        let runner = ScriptedRunner::clean_repo()
            .on(BEHIND, Output::ok("3\n"))
            .on(PULL_LOG, Output::ok("a1 one\nb2 two\nc3 three"));
        let snap = collect(&runner, Limits::default()).unwrap();

        assert!(snap.is_behind_remote());
        assert_eq!(snap.behind_count(), 3);
        assert_eq!(snap.pull_log().commits(), ["a1 one", "b2 two", "c3 three"]);
        assert!(!runner.was_called(PUSH_LOG));
    }

    #[test]
    fn test_ahead_with_failed_push_log() {
        let runner = ScriptedRunner::clean_repo()
            .on(AHEAD, Output::ok("2\n"))
            .on(PUSH_LOG, Output::failed("fatal: bad revision"));
        let snap = collect(&runner, Limits::default()).unwrap();

        assert!(snap.is_ahead_remote());
        assert!(matches!(snap.push_log(), CommitLog::Failed(_)));
    }

    #[test]
    fn test_no_upstream() {
        let runner = ScriptedRunner::clean_repo()
            .on(
                UPSTREAM,
                Output::failed("fatal: no upstream configured for branch 'main'"),
            )
            .on(BEHIND, Output::ok("5\n"))
            .on(AHEAD, Output::ok("5\n"));
        let snap = collect(&runner, Limits::default()).unwrap();

        assert!(!snap.upstream_configured());
        assert_eq!(snap.tracking(), &Tracking::None);
        assert_eq!(snap.ahead_count(), 0);
        assert_eq!(snap.behind_count(), 0);
        assert!(!runner.was_called(BEHIND));
        assert!(!runner.was_called(AHEAD));
    }

    #[test]
    fn test_unexpected_upstream_failure_is_not_configured() {
        let runner = ScriptedRunner::clean_repo()
            .on(UPSTREAM, Output::failed("fatal: something unusual"));
        let snap = collect(&runner, Limits::default()).unwrap();
        assert!(!snap.upstream_configured());
    }

    #[test]
    fn test_unparsable_count_is_zero() {
        let runner = ScriptedRunner::clean_repo().on(BEHIND, Output::ok("lots\n"));
        let snap = collect(&runner, Limits::default()).unwrap();
        assert!(!snap.is_behind_remote());
    }

    #[test]
    fn test_failed_count_is_zero() {
        let runner = ScriptedRunner::clean_repo().on(AHEAD, Output::failed("fatal: broken"));
        let snap = collect(&runner, Limits::default()).unwrap();
        assert!(!snap.is_ahead_remote());
        assert!(snap.upstream_configured());
    }

    #[test]
    fn test_history_failed_vs_empty() {
        let runner = ScriptedRunner::clean_repo().on(HISTORY, Output::failed("fatal: corrupt"));
        let snap = collect(&runner, Limits::default()).unwrap();
        assert!(matches!(snap.history(), CommitLog::Failed(_)));

        let runner = ScriptedRunner::clean_repo().on(HISTORY, Output::ok(""));
        let snap = collect(&runner, Limits::default()).unwrap();
        assert_eq!(snap.history(), &CommitLog::Empty);

        let runner = ScriptedRunner::clean_repo().on(
            HISTORY,
            Output::failed("fatal: your current branch 'main' does not have any commits yet"),
        );
        let snap = collect(&runner, Limits::default()).unwrap();
        assert_eq!(snap.history(), &CommitLog::Empty);
    }

    #[test]
    fn test_history_runs_without_upstream() {
        let runner = ScriptedRunner::clean_repo()
            .on(UPSTREAM, Output::failed("fatal: no upstream configured"));
        collect(&runner, Limits::default()).unwrap();
        assert!(runner.was_called(HISTORY));
    }

    #[test]
    fn test_status_failure_aborts() {
        let runner = ScriptedRunner::clean_repo().on(
            "status --porcelain -uall",
            Output::failed("fatal: not a git repository"),
        );
        assert!(collect(&runner, Limits::default()).is_err());
    }

    #[test]
    fn test_new_drops_logs_without_tracking() {
        let snap = RepositorySnapshot::new(
            None,
            status::StatusLists::default(),
            Tracking::None,
            CommitLog::Commits(vec!["stale".into()]),
            CommitLog::Commits(vec!["stale".into()]),
            CommitLog::Empty,
        );
        assert_eq!(snap.pull_log(), &CommitLog::Empty);
        assert_eq!(snap.push_log(), &CommitLog::Empty);
    }

    #[test]
    fn test_limits_clamped() {
        assert_eq!(Limits::new(50, 0), Limits { log: 10, history: 1 });
        assert_eq!(Limits::new(5, 7), Limits { log: 5, history: 7 });
    }

    #[test]
    fn test_snapshot_serializes() {
        let snap = collect(&ScriptedRunner::clean_repo(), Limits::default()).unwrap();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["branch"], "main");
        assert_eq!(json["tracking"]["state"], "upstream");
        assert_eq!(json["tracking"]["name"], "origin/main");
        assert_eq!(json["pull_log"]["state"], "empty");
        assert_eq!(json["history"]["state"], "commits");
    }
}
