//! Layered configuration (§6.4, `[ADDED]` §6.7): compiled-in defaults,
//! overridden by an optional `steamroll-transfer.toml`, overridden again by
//! CLI flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use swarm::MAX_CONCURRENT_PEERS as DEFAULT_MAX_CONCURRENT_PEERS;

/// Default TCP port a receiver listens on for transfer sessions (§6.4).
pub const DEFAULT_TRANSFER_PORT: u16 = 27051;

/// Recognized settings, consumed by every subcommand (§6.4).
///
/// Every field here matches `spec.md` §6.4 exactly; `default_block_size`
/// and `swarm_block_size` are recorded for operators even though this
/// implementation's delta and swarm engines currently use the fixed wire
/// constants ([`protocol::wire::DELTA_BLOCK_SIZE`],
/// [`protocol::wire::SWARM_BLOCK_SIZE`]) rather than a runtime-tunable
/// block size (see `DESIGN.md`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TCP port a receiver binds its transfer listener to.
    pub transfer_port: u16,
    /// UDP port discovery broadcasts and listens on.
    pub discovery_port: u16,
    /// Upload/download rate cap in bytes/second; `0` means unlimited.
    pub transfer_speed_limit_bps: u64,
    /// Whether to request in-stream GZip compression of file payloads.
    pub enable_compression: bool,
    /// Whether sessions this endpoint drives or accepts must be `V3`
    /// encrypted.
    pub require_encryption: bool,
    /// This device's id, advertised during discovery and the `V3`
    /// handshake.
    pub device_id: String,
    /// Recorded delta block size in bytes; see the struct-level note.
    pub default_block_size: u32,
    /// Recorded swarm block size in bytes; see the struct-level note.
    pub swarm_block_size: u64,
    /// Maximum peers a swarm pull downloads from concurrently.
    pub max_concurrent_peers: usize,
    /// Directory each received package is written into its own
    /// subdirectory of.
    pub library_root: PathBuf,
    /// Path to the JSON file backing this device's pairing-key store.
    pub pairing_store_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transfer_port: DEFAULT_TRANSFER_PORT,
            discovery_port: discovery::DEFAULT_DISCOVERY_PORT,
            transfer_speed_limit_bps: 0,
            enable_compression: false,
            require_encryption: false,
            device_id: default_device_id(),
            default_block_size: protocol::wire::DELTA_BLOCK_SIZE,
            swarm_block_size: protocol::wire::SWARM_BLOCK_SIZE,
            max_concurrent_peers: DEFAULT_MAX_CONCURRENT_PEERS,
            library_root: default_library_root(),
            pairing_store_path: default_pairing_store_path(),
        }
    }
}

impl Settings {
    /// Loads settings layered as compiled defaults, then `path` if it
    /// exists, in that precedence order. CLI flags are applied afterward
    /// by the caller (each subcommand's `apply_overrides`).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` exists but cannot be read or does not
    /// parse as valid TOML.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let defaults = Self::default();
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Ok(defaults);
        };
        let file: PartialSettings =
            toml::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.to_owned(),
                source,
            })?;
        Ok(file.apply_onto(defaults))
    }

    /// Resolves the transfer listener's socket address on all interfaces.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.transfer_port))
    }
}

/// Every field optional, so a `steamroll-transfer.toml` only needs to name
/// the settings it overrides.
#[derive(Deserialize, Default)]
struct PartialSettings {
    transfer_port: Option<u16>,
    discovery_port: Option<u16>,
    transfer_speed_limit_bps: Option<u64>,
    enable_compression: Option<bool>,
    require_encryption: Option<bool>,
    device_id: Option<String>,
    default_block_size: Option<u32>,
    swarm_block_size: Option<u64>,
    max_concurrent_peers: Option<usize>,
    library_root: Option<PathBuf>,
    pairing_store_path: Option<PathBuf>,
}

impl PartialSettings {
    fn apply_onto(self, mut base: Settings) -> Settings {
        if let Some(v) = self.transfer_port {
            base.transfer_port = v;
        }
        if let Some(v) = self.discovery_port {
            base.discovery_port = v;
        }
        if let Some(v) = self.transfer_speed_limit_bps {
            base.transfer_speed_limit_bps = v;
        }
        if let Some(v) = self.enable_compression {
            base.enable_compression = v;
        }
        if let Some(v) = self.require_encryption {
            base.require_encryption = v;
        }
        if let Some(v) = self.device_id {
            base.device_id = v;
        }
        if let Some(v) = self.default_block_size {
            base.default_block_size = v;
        }
        if let Some(v) = self.swarm_block_size {
            base.swarm_block_size = v;
        }
        if let Some(v) = self.max_concurrent_peers {
            base.max_concurrent_peers = v;
        }
        if let Some(v) = self.library_root {
            base.library_root = v;
        }
        if let Some(v) = self.pairing_store_path {
            base.pairing_store_path = v;
        }
        base
    }
}

/// Failures loading [`Settings`] from a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `path` exists but is not valid TOML.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

fn default_device_id() -> String {
    hostname_or_fallback()
}

fn hostname_or_fallback() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "steamroll-device".to_owned())
}

fn default_library_root() -> PathBuf {
    std::env::var_os("STEAMROLL_LIBRARY_ROOT")
        .map_or_else(|| PathBuf::from("./steamroll-library"), PathBuf::from)
}

fn default_pairing_store_path() -> PathBuf {
    default_library_root().join("pairings.json")
}
