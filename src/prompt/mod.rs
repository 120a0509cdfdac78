// ===========================================================================
// prompt - Interactive User Input
// ===========================================================================

use dialoguer::Confirm;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("user cancelled")]
    Cancelled,
}

/// Ask for confirmation (defaults to "no")
pub fn confirm(message: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|_| Error::Cancelled)
}

/// Prompt text for throwing away worktree changes.
pub fn discard_message(paths: &[String]) -> String {
    match paths {
        [single] => format!("Discard all changes to {single}? This cannot be undone"),
        many => format!(
            "Discard all changes to {} files? This cannot be undone",
            many.len()
        ),
    }
}
