#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `steamroll-cli` wires the transfer core crates (`sender`, `receiver`,
//! `swarm`, `discovery`, `bandwidth`, `crypto`, `resume`) into the
//! `steamroll-transfer` binary's four subcommands: `send`, `receive`,
//! `discover`, and `swarm-pull` (`[ADDED]` §6.7).
//!
//! # Design
//!
//! Settings layer as compiled defaults, an optional
//! `steamroll-transfer.toml`, then CLI flag overrides ([`settings::Settings`]).
//! Each subcommand lives in its own module under [`commands`] and exposes
//! an async `run` that the dispatcher in [`run`] drives on a dedicated
//! multi-thread Tokio runtime, translating the result into a process exit
//! code whose ordering follows `protocol::TransferError`'s severity.
//!
//! # Errors
//!
//! Subcommand modules surface [`protocol::TransferError`] directly; the
//! top-level [`run::run`] function never panics on a malformed
//! configuration file or unreachable peer, reporting both as a non-zero
//! exit code instead.

pub mod cli;
pub mod commands;
pub mod run;
pub mod settings;

pub use cli::{Cli, Command};
pub use run::run as run_cli;
pub use settings::{Settings, SettingsError};
