// ===========================================================================
// cli/commands - Command Implementations
// ===========================================================================

pub mod commit;
pub mod discard;
pub mod init;
pub mod remote;
pub mod stage;
pub mod status;

// Re-export argument types
pub use commit::CommitArgs;
pub use discard::DiscardArgs;
pub use init::InitArgs;
pub use stage::PathsArgs;
pub use status::StatusArgs;
