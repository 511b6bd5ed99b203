#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` defines the [`Verbosity`] levels shared by every crate in the
//! transfer workspace and a small helper for installing a [`tracing`]
//! subscriber from one of them. Components never call `tracing` macros
//! conditionally on a verbosity check themselves; instead they always emit
//! at the appropriate level (`trace!`/`debug!`/`info!`/`warn!`/`error!`) and
//! let the installed subscriber's filter decide what is shown.
//!
//! # Invariants
//!
//! - Structured fields logged by other crates (session id, peer address,
//!   transfer type, relative path) are safe to emit at any verbosity.
//!   Secret material (pairing codes, derived keys, PSK bytes) must never be
//!   passed to a `tracing` macro anywhere in this workspace.
//! - [`init_tracing`] is idempotent-safe to call at most once per process;
//!   calling it twice returns an error rather than panicking, since a second
//!   global subscriber installation is a programmer mistake, not a runtime
//!   condition to silently ignore.
//!
//! # Examples
//!
//! ```
//! use logging::{init_tracing, Verbosity};
//!
//! // In a real binary this installs the process-wide subscriber; tests
//! // tolerate the "already set" error so repeated test runs don't panic.
//! let _ = init_tracing(Verbosity::Verbose);
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Verbosity levels recognised by the CLI's `-v`/`-q`/`--debug` flags.
///
/// Each level maps to a `tracing` filter directive covering this crate's
/// workspace targets; external dependencies stay at their default filter
/// unless the caller overrides `RUST_LOG` directly.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Verbosity {
    /// Only warnings and errors.
    Quiet,
    /// Informational progress messages. The default.
    #[default]
    Normal,
    /// Per-file and per-session detail.
    Verbose,
    /// Full protocol tracing, including frame-level detail.
    Debug,
}

impl Verbosity {
    /// Returns the `tracing` filter directive string for this level.
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        }
    }

    /// Increases verbosity by one step, saturating at [`Verbosity::Debug`].
    #[must_use]
    pub const fn increase(self) -> Self {
        match self {
            Self::Quiet => Self::Normal,
            Self::Normal => Self::Verbose,
            Self::Verbose | Self::Debug => Self::Debug,
        }
    }

    /// Decreases verbosity by one step, saturating at [`Verbosity::Quiet`].
    #[must_use]
    pub const fn decrease(self) -> Self {
        match self {
            Self::Quiet | Self::Normal => Self::Quiet,
            Self::Verbose => Self::Normal,
            Self::Debug => Self::Verbose,
        }
    }

    /// Builds a level from a `-v` repeat count, starting at [`Verbosity::Normal`].
    #[must_use]
    pub fn from_occurrences(count: u8) -> Self {
        let mut level = Self::Normal;
        for _ in 0..count {
            level = level.increase();
        }
        level
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        })
    }
}

/// Error returned when parsing a [`Verbosity`] from a string fails.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unrecognized verbosity level {0:?}; expected one of quiet, normal, verbose, debug")]
pub struct ParseVerbosityError(String);

impl FromStr for Verbosity {
    type Err = ParseVerbosityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "q" => Ok(Self::Quiet),
            "normal" | "info" => Ok(Self::Normal),
            "verbose" | "v" => Ok(Self::Verbose),
            "debug" | "vv" => Ok(Self::Debug),
            other => Err(ParseVerbosityError(other.to_owned())),
        }
    }
}

/// Error returned by [`init_tracing`] when a global subscriber is already installed.
#[derive(Debug, thiserror::Error)]
#[error("a tracing subscriber is already installed for this process")]
pub struct InitTracingError(#[from] tracing::subscriber::SetGlobalDefaultError);

/// Installs a process-wide `tracing` subscriber filtered at `verbosity`.
///
/// `RUST_LOG`, when set, takes precedence over `verbosity` so operators can
/// always drop to finer-grained per-module filtering without a rebuild.
///
/// # Errors
///
/// Returns [`InitTracingError`] if a global subscriber has already been
/// installed in this process.
pub fn init_tracing(verbosity: Verbosity) -> Result<(), InitTracingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
