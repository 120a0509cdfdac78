// ===========================================================================
// git/failure - Classifying failed git commands
// ===========================================================================

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Authentication,
    Network,
    Rejected,
    Permission,
    RepositoryNotFound,
    Refspec,
    Other,
}

impl FailureKind {
    /// Friendly prefix shown ahead of git's own message.
    pub fn title(self) -> &'static str {
        match self {
            FailureKind::Authentication => "Authentication Failed",
            FailureKind::Network => "Network Error",
            FailureKind::Rejected => "Push Rejected",
            FailureKind::Permission => "Permission Denied",
            FailureKind::RepositoryNotFound => "Repository Not Found",
            FailureKind::Refspec => "Invalid Refspec",
            FailureKind::Other => "Git Error",
        }
    }
}

/// Evaluated top to bottom; the first matching pattern wins. Order matters:
/// "Permission denied (publickey)" is an auth problem, not a file permission
/// one, and a rejected push mentions "failed to push" alongside the reason.
const PATTERNS: &[(&str, FailureKind)] = &[
    ("Authentication failed", FailureKind::Authentication),
    ("could not read Username", FailureKind::Authentication),
    ("could not read Password", FailureKind::Authentication),
    ("Permission denied (publickey", FailureKind::Authentication),
    ("terminal prompts disabled", FailureKind::Authentication),
    ("Could not resolve host", FailureKind::Network),
    ("unable to access", FailureKind::Network),
    ("Connection timed out", FailureKind::Network),
    ("Connection refused", FailureKind::Network),
    ("Network is unreachable", FailureKind::Network),
    ("non-fast-forward", FailureKind::Rejected),
    ("[rejected]", FailureKind::Rejected),
    ("fetch first", FailureKind::Rejected),
    ("failed to push some refs", FailureKind::Rejected),
    ("Permission denied", FailureKind::Permission),
    ("Repository not found", FailureKind::RepositoryNotFound),
    ("does not appear to be a git repository", FailureKind::RepositoryNotFound),
    ("src refspec", FailureKind::Refspec),
    ("does not match any", FailureKind::Refspec),
];

pub fn classify(text: &str) -> FailureKind {
    PATTERNS
        .iter()
        .find(|(pattern, _)| text.contains(pattern))
        .map(|&(_, kind)| kind)
        .unwrap_or(FailureKind::Other)
}

/// A git command that ran and exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// The git arguments, space-joined.
    pub command: String,
    /// Cleaned git message (first meaningful output).
    pub message: String,
    /// Raw stderr + stdout, kept for diagnostics.
    pub detail: String,
}

impl Failure {
    pub fn new(args: &[&str], stdout: &str, stderr: &str) -> Self {
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            kind: classify(&detail),
            command: args.join(" "),
            message: extract_error(stdout, stderr),
            detail,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subcommand = self.command.split(' ').next().unwrap_or_default();
        match (self.kind, self.message.is_empty()) {
            (FailureKind::Other, true) => write!(f, "git {subcommand} failed"),
            (FailureKind::Other, false) => write!(f, "git {subcommand} failed: {}", self.message),
            (kind, true) => f.write_str(kind.title()),
            (kind, false) => write!(f, "{}: {}", kind.title(), self.message),
        }
    }
}

/// Some git commands (merge, commit) report errors on stdout, not stderr.
/// Prefer stderr and fall back to stdout.
fn extract_error(stdout: &str, stderr: &str) -> String {
    if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        clean_git_error(stderr)
    }
}

/// Drop git's "fatal: " / "error: " prefix from the first line and keep the rest.
fn clean_git_error(stderr: &str) -> String {
    let msg = stderr.trim();
    msg.strip_prefix("fatal: ")
        .or_else(|| msg.strip_prefix("error: "))
        .unwrap_or(msg)
        .to_string()
}
