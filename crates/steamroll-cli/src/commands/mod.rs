//! One module per subcommand, each a thin `async fn` taking the resolved
//! [`crate::settings::Settings`] and its own parsed arguments, returning
//! `Result<protocol::progress::SessionOutcome, protocol::TransferError>` (or
//! the discover/swarm-pull equivalents) for [`crate::run::run`] to map to an
//! exit code.

pub mod discover;
pub mod receive;
pub mod send;
pub mod swarm_pull;
