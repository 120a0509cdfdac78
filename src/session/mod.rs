// ===========================================================================
// session - Busy-guarded Git Workflows
// ===========================================================================

use std::fmt;

use crate::config::Config;
use crate::gate::{self, Decision};
use crate::git;
use crate::process::Runner;
use crate::snapshot::{self, Limits, RepositorySnapshot};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("another operation is in progress ({0})")]
    Busy(Operation),

    #[error("{0}")]
    Denied(&'static str),

    #[error("no remote configured; add one with `git remote add`")]
    NoRemote,

    #[error("HEAD is detached; check out a branch first")]
    DetachedHead,

    #[error(transparent)]
    Git(#[from] git::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Refresh,
    Fetch,
    Pull,
    Push,
    Commit,
    StageAll,
    UnstageAll,
    Stage,
    Unstage,
    Discard,
    SetUpstream,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Refresh => "refresh",
            Operation::Fetch => "fetch",
            Operation::Pull => "pull",
            Operation::Push => "push",
            Operation::Commit => "commit",
            Operation::StageAll => "stage all",
            Operation::UnstageAll => "unstage all",
            Operation::Stage => "stage",
            Operation::Unstage => "unstage",
            Operation::Discard => "discard",
            Operation::SetUpstream => "set upstream",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Busy(Operation),
}

/// Owns the snapshot and the busy flag for one repository.
///
/// Every operation runs Idle -> Busy -> Idle, clears the snapshot on entry
/// and leaves a freshly collected one behind, whatever the outcome.
#[derive(Debug)]
pub struct Session<R> {
    runner: R,
    limits: Limits,
    remote: Option<String>,
    activity: Activity,
    snapshot: Option<RepositorySnapshot>,
    fetched: bool,
    message: String,
}

impl<R: Runner> Session<R> {
    /// Detect git, the repository and its remote.
    pub fn open(runner: R, config: &Config) -> Result<Self> {
        let version = git::version(&runner)?;
        log::debug!("using {version}");

        let root = git::toplevel(&runner)?;
        log::debug!("repository at {}", root.display());

        let remotes = git::remotes(&runner)?;
        let remote = pick_remote(&remotes, config.remote.as_deref());
        match &remote {
            Some(name) => match git::remote_url(&runner, name) {
                Ok(url) => log::debug!("remote {name} -> {url}"),
                Err(e) => log::warn!("remote {name} has no url: {e}"),
            },
            None => log::debug!("no remote configured"),
        }

        Ok(Self::with_remote(runner, config.limits, remote))
    }

    fn with_remote(runner: R, limits: Limits, remote: Option<String>) -> Self {
        Self {
            runner,
            limits,
            remote,
            activity: Activity::Idle,
            snapshot: None,
            fetched: false,
            message: String::new(),
        }
    }

    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.activity, Activity::Busy(_))
    }

    pub fn snapshot(&self) -> Option<&RepositorySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn has_fetched(&self) -> bool {
        self.fetched
    }

    /// Outcome of the last operation, for display.
    pub fn message(&self) -> &str {
        &self.message
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn refresh(&mut self) -> Result<&RepositorySnapshot> {
        self.run(Operation::Refresh, |_| Ok("Status refreshed".into()))?;
        self.current()
    }

    pub fn fetch(&mut self) -> Result<()> {
        let decision = gate::can_fetch(self.remote(), self.is_busy());
        if let Decision::Deny(reason) = decision {
            return Err(self.deny(Operation::Fetch, reason));
        }
        let remote = self.remote.clone();
        self.run(Operation::Fetch, |s| {
            let remote = remote.ok_or(Error::NoRemote)?;
            git::fetch(&s.runner, &remote)?;
            s.fetched = true;
            Ok(format!("Fetched {remote}"))
        })
    }

    pub fn pull(&mut self) -> Result<()> {
        let fetched = self.fetched;
        self.gated(Operation::Pull, |snap| gate::can_pull(snap, fetched), |s| {
            git::pull(&s.runner)?;
            Ok("Pulled remote changes".into())
        })
    }

    pub fn push(&mut self) -> Result<()> {
        self.gated(Operation::Push, gate::can_push, |s| {
            git::push(&s.runner)?;
            Ok("Pushed local commits".into())
        })
    }

    pub fn commit(&mut self, message: &str) -> Result<()> {
        self.gated(Operation::Commit, |snap| gate::can_commit(snap, message), |s| {
            git::commit(&s.runner, message.trim())?;
            Ok("Committed staged changes".into())
        })
    }

    pub fn stage_all(&mut self) -> Result<()> {
        self.gated(Operation::StageAll, gate::can_stage_all, |s| {
            git::stage_all(&s.runner)?;
            Ok("Staged all changes".into())
        })
    }

    pub fn unstage_all(&mut self) -> Result<()> {
        self.gated(Operation::UnstageAll, gate::can_unstage_all, |s| {
            git::unstage_all(&s.runner)?;
            Ok("Unstaged all changes".into())
        })
    }

    pub fn stage(&mut self, path: &str) -> Result<()> {
        self.gated(Operation::Stage, |snap| gate::can_stage(snap, path), |s| {
            git::stage(&s.runner, path)?;
            Ok(format!("Staged {path}"))
        })
    }

    pub fn unstage(&mut self, path: &str) -> Result<()> {
        self.gated(Operation::Unstage, |snap| gate::can_unstage(snap, path), |s| {
            git::unstage(&s.runner, path)?;
            Ok(format!("Unstaged {path}"))
        })
    }

    pub fn discard(&mut self, path: &str) -> Result<()> {
        self.gated(Operation::Discard, |snap| gate::can_discard(snap, path), |s| {
            git::discard(&s.runner, path)?;
            Ok(format!("Discarded changes to {path}"))
        })
    }

    pub fn set_upstream(&mut self) -> Result<()> {
        let decision = gate::can_set_upstream(self.remote(), self.is_busy());
        if let Decision::Deny(reason) = decision {
            return Err(self.deny(Operation::SetUpstream, reason));
        }
        let remote = self.remote.clone();
        self.run(Operation::SetUpstream, |s| {
            let remote = remote.ok_or(Error::NoRemote)?;
            let branch = git::current_branch(&s.runner)?;
            if branch == "HEAD" {
                return Err(Error::DetachedHead);
            }
            git::set_upstream(&s.runner, &remote, &branch)?;
            Ok(format!("Set upstream of {branch} to {remote}/{branch}"))
        })
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn current(&self) -> Result<&RepositorySnapshot> {
        self.snapshot
            .as_ref()
            .ok_or(Error::Denied("Repository status is unavailable"))
    }

    fn deny(&mut self, op: Operation, reason: &'static str) -> Error {
        log::debug!("{op} denied: {reason}");
        self.message = reason.to_string();
        Error::Denied(reason)
    }

    /// Check `decide` against the latest snapshot, then run `body`.
    fn gated<D, F>(&mut self, op: Operation, decide: D, body: F) -> Result<()>
    where
        D: FnOnce(&RepositorySnapshot) -> Decision,
        F: FnOnce(&mut Self) -> Result<String>,
    {
        if let Activity::Busy(current) = self.activity {
            return Err(Error::Busy(current));
        }
        if self.snapshot.is_none() {
            self.refresh()?;
        }
        let decision = decide(self.current()?);
        if let Decision::Deny(reason) = decision {
            return Err(self.deny(op, reason));
        }
        self.run(op, body)
    }

    /// Idle -> Busy(op) -> Idle. The snapshot is cleared on entry and
    /// recollected after `body`, on success and failure alike.
    fn run<F>(&mut self, op: Operation, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<String>,
    {
        if let Activity::Busy(current) = self.activity {
            log::debug!("ignoring {op}: {current} in progress");
            return Err(Error::Busy(current));
        }

        self.activity = Activity::Busy(op);
        self.snapshot = None;

        let outcome = body(self);
        let refreshed = snapshot::collect(&self.runner, self.limits);

        self.activity = Activity::Idle;

        let refresh_error = match refreshed {
            Ok(snap) => {
                self.snapshot = Some(snap);
                None
            }
            Err(e) => {
                log::error!("refresh after {op} failed: {e}");
                Some(e)
            }
        };

        match (outcome, refresh_error) {
            (Ok(message), None) => {
                log::info!("{op}: {message}");
                self.message = message;
                Ok(())
            }
            (Ok(_), Some(e)) => {
                self.message = format!("Failed to read repository status: {e}");
                Err(e.into())
            }
            (Err(e), _) => {
                match &e {
                    Error::Git(git::Error::Command(failure)) => {
                        log::error!("{op} failed: git {}\n{}", failure.command, failure.detail)
                    }
                    other => log::error!("{op} failed: {other}"),
                }
                self.message = e.to_string();
                Err(e)
            }
        }
    }
}

/// Configured remote if it exists, else "origin", else the first one.
fn pick_remote(remotes: &[String], preferred: Option<&str>) -> Option<String> {
    preferred
        .and_then(|p| remotes.iter().find(|r| r.as_str() == p))
        .or_else(|| remotes.iter().find(|r| r.as_str() == "origin"))
        .or_else(|| remotes.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FailureKind;
    use crate::process::scripted::ScriptedRunner;
    use crate::process::Output;

    const STATUS: &str = "status --porcelain -uall";
    const BEHIND: &str = "rev-list --count HEAD..@{u}";
    const AHEAD: &str = "rev-list --count @{u}..HEAD";
    const UPSTREAM: &str = "rev-parse --abbrev-ref --symbolic-full-name @{u}";

    fn open(runner: &ScriptedRunner) -> Session<&ScriptedRunner> {
        Session::open(runner, &Config::default()).unwrap()
    }

    #[test]
    fn test_open_detects_remote() {
        let runner = ScriptedRunner::clean_repo();
        let session = open(&runner);
        assert_eq!(session.remote(), Some("origin"));
        assert_eq!(session.activity(), Activity::Idle);
        assert!(session.snapshot().is_none());
        assert!(runner.was_called("remote get-url origin"));
    }

    #[test]
    fn test_open_outside_repo() {
        let runner = ScriptedRunner::clean_repo().on(
            "rev-parse --show-toplevel",
            Output::failed("fatal: not a git repository"),
        );
        let err = Session::open(&runner, &Config::default()).unwrap_err();
        assert!(matches!(err, Error::Git(git::Error::NotInRepo)));
    }

    #[test]
    fn test_pick_remote() {
        let remotes = vec!["fork".to_string(), "origin".to_string()];
        assert_eq!(pick_remote(&remotes, None).as_deref(), Some("origin"));
        assert_eq!(pick_remote(&remotes, Some("fork")).as_deref(), Some("fork"));
        assert_eq!(pick_remote(&remotes, Some("missing")).as_deref(), Some("origin"));
        assert_eq!(pick_remote(&["only".to_string()], None).as_deref(), Some("only"));
        assert_eq!(pick_remote(&[], Some("origin")), None);
    }

    #[test]
    fn test_refresh_populates_snapshot() {
        let runner = ScriptedRunner::clean_repo().on(STATUS, Output::ok(" M a.txt\n"));
        let mut session = open(&runner);
        let snap = session.refresh().unwrap();
        assert_eq!(snap.unstaged().len(), 1);
        assert_eq!(session.message(), "Status refreshed");
        assert!(!session.is_busy());
    }

    #[test]
    fn test_conflict_scenario() {
        let runner =
            ScriptedRunner::clean_repo().on(STATUS, Output::ok("M  a.txt\n?? b.txt\nUU c.txt\n"));
        let mut session = open(&runner);
        assert!(session.refresh().unwrap().has_conflicts());

        let err = session.commit("msg").unwrap_err();
        assert!(matches!(err, Error::Denied("Resolve merge conflicts first")));
        assert!(!runner.was_called("commit -m msg"));
    }

    #[test]
    fn test_pull_after_fetch_when_behind() {
        let runner = ScriptedRunner::clean_repo()
            .on(BEHIND, Output::ok("3"))
            .on("fetch origin", Output::ok(""))
            .on("pull", Output::ok("Fast-forward\n"));
        let mut session = open(&runner);

        let snap = session.refresh().unwrap();
        assert!(snap.is_behind_remote());
        assert_eq!(snap.behind_count(), 3);

        let err = session.pull().unwrap_err();
        assert!(matches!(err, Error::Denied("Fetch before pulling")));

        session.fetch().unwrap();
        assert!(session.has_fetched());
        assert!(gate::can_pull(session.snapshot().unwrap(), session.has_fetched()).is_allowed());

        session.pull().unwrap();
        assert!(runner.was_called("pull"));
        assert_eq!(session.message(), "Pulled remote changes");
    }

    #[test]
    fn test_push_rejected_keeps_ahead() {
        let runner = ScriptedRunner::clean_repo().on(AHEAD, Output::ok("2")).on(
            "push",
            Output::failed(
                "To origin\n ! [rejected]        main -> main (non-fast-forward)\nerror: failed to push some refs to 'origin'\n",
            ),
        );
        let mut session = open(&runner);
        session.refresh().unwrap();

        let err = session.push().unwrap_err();
        let Error::Git(git_err) = &err else {
            panic!("expected git error, got {err:?}");
        };
        assert_eq!(git_err.failure().unwrap().kind, FailureKind::Rejected);
        assert!(session.message().starts_with("Push Rejected"));

        let snap = session.snapshot().unwrap();
        assert!(snap.is_ahead_remote());
        assert_eq!(snap.ahead_count(), 2);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_no_upstream_blocks_push_even_with_stale_counts() {
        let runner = ScriptedRunner::clean_repo().on(AHEAD, Output::ok("4"));
        let mut session = open(&runner);
        assert!(session.refresh().unwrap().is_ahead_remote());

        runner.set(UPSTREAM, Output::failed("fatal: no upstream configured for branch 'main'"));
        let snap = session.refresh().unwrap();
        assert_eq!(snap.ahead_count(), 0);
        assert!(matches!(session.push(), Err(Error::Denied(_))));
        assert!(matches!(session.pull(), Err(Error::Denied(_))));
    }

    #[test]
    fn test_stage_and_commit_flow() {
        let runner = ScriptedRunner::clean_repo()
            .on(STATUS, Output::ok(" M a.txt\n"))
            .on("add -- a.txt", Output::ok(""))
            .on("commit -m Update a", Output::ok("[main abc] Update a\n"));
        let mut session = open(&runner);

        session.stage("a.txt").unwrap();
        assert!(runner.was_called("add -- a.txt"));

        // git now reports the change as staged
        runner.set(STATUS, Output::ok("M  a.txt\n"));
        session.refresh().unwrap();

        assert!(matches!(session.commit("  "), Err(Error::Denied(_))));
        session.commit("Update a\n").unwrap();
        assert!(runner.was_called("commit -m Update a"));
    }

    #[test]
    fn test_mutation_refreshes_afterwards() {
        let runner = ScriptedRunner::clean_repo()
            .on(STATUS, Output::ok("?? new.txt\n"))
            .on("add .", Output::ok(""));
        let mut session = open(&runner);
        session.refresh().unwrap();

        let before = runner.calls().len();
        session.stage_all().unwrap();
        let after: Vec<_> = runner.calls().into_iter().skip(before).collect();

        assert_eq!(after.first().map(String::as_str), Some("add ."));
        assert!(after.iter().any(|c| c == STATUS));
    }

    #[test]
    fn test_failed_git_command_still_refreshes_and_releases() {
        let runner = ScriptedRunner::clean_repo()
            .on(STATUS, Output::ok(" M a.txt\n"))
            .on("checkout -- a.txt", Output::failed("error: unable to unlink 'a.txt': Permission denied"));
        let mut session = open(&runner);

        let err = session.discard("a.txt").unwrap_err();
        assert!(err.to_string().starts_with("Permission Denied"));
        assert_eq!(session.activity(), Activity::Idle);
        assert!(session.snapshot().is_some());
    }

    #[test]
    fn test_discard_untracked_denied() {
        let runner = ScriptedRunner::clean_repo().on(STATUS, Output::ok("?? new.txt\n"));
        let mut session = open(&runner);
        let err = session.discard("new.txt").unwrap_err();
        assert_eq!(err.to_string(), "Untracked files cannot be discarded");
        assert_eq!(session.message(), "Untracked files cannot be discarded");
    }

    #[test]
    fn test_busy_trigger_is_rejected() {
        let runner = ScriptedRunner::clean_repo();
        let mut session = open(&runner);
        session.activity = Activity::Busy(Operation::Push);

        assert!(matches!(session.refresh(), Err(Error::Busy(Operation::Push))));
        assert!(matches!(session.stage_all(), Err(Error::Busy(Operation::Push))));
        assert!(!runner.was_called(STATUS));
    }

    #[test]
    fn test_set_upstream() {
        let runner = ScriptedRunner::clean_repo()
            .on(UPSTREAM, Output::failed("fatal: no upstream configured"))
            .on("push --set-upstream origin main", Output::ok(""));
        let mut session = open(&runner);
        session.set_upstream().unwrap();
        assert!(runner.was_called("push --set-upstream origin main"));
        assert_eq!(session.message(), "Set upstream of main to origin/main");
    }

    #[test]
    fn test_set_upstream_detached() {
        let runner = ScriptedRunner::clean_repo().on("rev-parse --abbrev-ref HEAD", Output::ok("HEAD\n"));
        let mut session = open(&runner);
        assert!(matches!(session.set_upstream(), Err(Error::DetachedHead)));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_no_remote() {
        let runner = ScriptedRunner::clean_repo().on("remote", Output::ok(""));
        let mut session = open(&runner);
        assert_eq!(session.remote(), None);
        assert!(matches!(session.set_upstream(), Err(Error::Denied("No remote configured"))));
        assert!(matches!(session.fetch(), Err(Error::Denied("No remote configured"))));
        assert!(!session.has_fetched());
    }

    #[test]
    fn test_refresh_failure_sets_message() {
        let runner = ScriptedRunner::clean_repo().on(STATUS, Output::failed("fatal: index file corrupt"));
        let mut session = open(&runner);
        assert!(session.refresh().is_err());
        assert!(session.message().starts_with("Failed to read repository status"));
        assert!(session.snapshot().is_none());
        assert!(!session.is_busy());
    }
}
