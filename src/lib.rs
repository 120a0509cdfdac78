// ===========================================================================
// git-sync - Repository Status, Staging and Remote Sync for Git
// ===========================================================================

pub mod cli;
pub mod config;
pub mod gate;
pub mod git;
pub mod process;
pub mod prompt;
pub mod session;
pub mod snapshot;
pub mod status;

pub use config::Config;
pub use session::Session;
