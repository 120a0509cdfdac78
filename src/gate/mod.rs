// ===========================================================================
// gate - Action Permissions
// ===========================================================================
//
// Pure functions over a snapshot. Callers re-evaluate after every refresh;
// nothing here is cached.

use crate::snapshot::RepositorySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Deny with the first reason whose condition holds.
fn first_denial(rules: &[(bool, &'static str)]) -> Decision {
    rules
        .iter()
        .find(|(denied, _)| *denied)
        .map_or(Decision::Allow, |&(_, reason)| Decision::Deny(reason))
}

pub fn can_stage_all(s: &RepositorySnapshot) -> Decision {
    first_denial(&[(s.unstaged().is_empty(), "Nothing to stage")])
}

pub fn can_unstage_all(s: &RepositorySnapshot) -> Decision {
    first_denial(&[(s.staged().is_empty(), "Nothing to unstage")])
}

pub fn can_stage(s: &RepositorySnapshot, path: &str) -> Decision {
    let Some(entry) = s.find_unstaged(path) else {
        return Decision::Deny("File has no unstaged changes");
    };
    first_denial(&[
        (entry.is_conflicted(), "Resolve the conflict before staging this file"),
        (entry.is_deleted_in_index(), "Deletion is already staged"),
    ])
}

pub fn can_unstage(s: &RepositorySnapshot, path: &str) -> Decision {
    first_denial(&[(s.find_staged(path).is_none(), "File has no staged changes")])
}

pub fn can_discard(s: &RepositorySnapshot, path: &str) -> Decision {
    let Some(entry) = s.find_unstaged(path) else {
        return Decision::Deny("File has no unstaged changes");
    };
    first_denial(&[
        (entry.is_untracked(), "Untracked files cannot be discarded"),
        (entry.is_conflicted(), "Resolve the conflict before discarding"),
    ])
}

pub fn can_commit(s: &RepositorySnapshot, message: &str) -> Decision {
    first_denial(&[
        (s.has_conflicts(), "Resolve merge conflicts first"),
        (s.staged().is_empty(), "No staged changes to commit"),
        (s.is_behind_remote(), "Pull remote changes before committing"),
        (message.trim().is_empty(), "Commit message is empty"),
    ])
}

pub fn can_push(s: &RepositorySnapshot) -> Decision {
    first_denial(&[
        (s.has_conflicts(), "Resolve merge conflicts first"),
        (!s.upstream_configured(), "No upstream branch; set upstream first"),
        (s.is_behind_remote(), "Pull remote changes before pushing"),
        (!s.is_ahead_remote(), "Nothing to push"),
    ])
}

/// `fetched` must be true once this session has completed a fetch.
pub fn can_pull(s: &RepositorySnapshot, fetched: bool) -> Decision {
    first_denial(&[
        (s.has_conflicts(), "Resolve merge conflicts first"),
        (!s.upstream_configured(), "No upstream branch; set upstream first"),
        (!fetched, "Fetch before pulling"),
        (!s.is_behind_remote(), "Already up to date"),
    ])
}

pub fn can_set_upstream(remote: Option<&str>, busy: bool) -> Decision {
    first_denial(&[
        (remote.is_none(), "No remote configured"),
        (busy, "Another operation is in progress"),
    ])
}

pub fn can_fetch(remote: Option<&str>, busy: bool) -> Decision {
    first_denial(&[
        (remote.is_none(), "No remote configured"),
        (busy, "Another operation is in progress"),
    ])
}
