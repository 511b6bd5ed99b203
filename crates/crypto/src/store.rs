//! Retrieval and persistence of pairing keys by peer address.
//!
//! Per the design notes ("Pairing key storage is out of scope for the
//! core"), this module only defines the trait the sender and receiver
//! depend on plus a minimal in-memory and JSON-file implementation for the
//! CLI binary. A production deployment is expected to back [`PairingStore`]
//! with an OS keychain or another encrypted-at-rest mechanism.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::keys::SharedKey;

/// Retrieves and persists pairing keys by peer address.
///
/// Keys are looked up by IP address alone, not the full socket address
/// (including port), since a peer's transfer port can change between
/// sessions while its pairing relationship with this device does not.
pub trait PairingStore: Send + Sync {
    /// Returns the key paired with `addr`, if any.
    fn get(&self, addr: SocketAddr) -> Option<SharedKey>;

    /// Records `key` as paired with `addr`, replacing any existing entry.
    fn put(&mut self, addr: SocketAddr, key: SharedKey);

    /// Removes any pairing recorded for `addr`.
    fn remove(&mut self, addr: SocketAddr);
}

/// An in-process, non-persistent [`PairingStore`], keyed by IP address.
#[derive(Default)]
pub struct InMemoryPairingStore {
    keys: HashMap<IpAddr, [u8; 32]>,
}

impl InMemoryPairingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PairingStore for InMemoryPairingStore {
    fn get(&self, addr: SocketAddr) -> Option<SharedKey> {
        self.keys.get(&addr.ip()).copied().map(SharedKey::from_bytes)
    }

    fn put(&mut self, addr: SocketAddr, key: SharedKey) {
        self.keys.insert(addr.ip(), *key.as_bytes());
    }

    fn remove(&mut self, addr: SocketAddr) {
        self.keys.remove(&addr.ip());
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    address: IpAddr,
    key_hex: String,
}

/// A [`PairingStore`] backed by a JSON file on disk, loaded eagerly and
/// rewritten in full on every mutation.
///
/// This is a convenience implementation for the CLI binary, not a
/// hardened credential store: the file holds hex-encoded key material
/// readable by anything with the same file permissions. Production
/// integrations are expected to supply their own [`PairingStore`] backed
/// by a keychain or other encrypted-at-rest mechanism.
pub struct FilePairingStore {
    path: PathBuf,
    memory: InMemoryPairingStore,
}

impl FilePairingStore {
    /// Loads (or initializes) a store backed by the JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if an existing file cannot be read or
    /// parsed.
    pub fn load(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let mut memory = InMemoryPairingStore::new();
        if let Ok(contents) = std::fs::read_to_string(&path) {
            let entries: Vec<StoredEntry> = serde_json::from_str(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            for entry in entries {
                if let Ok(bytes) = hex_decode(&entry.key_hex) {
                    memory
                        .keys
                        .insert(entry.address, bytes);
                }
            }
        }
        Ok(Self { path, memory })
    }

    /// Persists the current contents to the backing file, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if the file cannot be written.
    pub fn flush(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries: Vec<StoredEntry> = self
            .memory
            .keys
            .iter()
            .map(|(address, key)| StoredEntry {
                address: *address,
                key_hex: hex_encode(key),
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PairingStore for FilePairingStore {
    fn get(&self, addr: SocketAddr) -> Option<SharedKey> {
        self.memory.get(addr)
    }

    fn put(&mut self, addr: SocketAddr, key: SharedKey) {
        self.memory.put(addr, key);
    }

    fn remove(&mut self, addr: SocketAddr) {
        self.memory.remove(addr);
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

fn hex_decode(hex: &str) -> Result<[u8; 32], ()> {
    if hex.len() != 64 {
        return Err(());
    }
    let mut out = [0_u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).map_err(|_| ())?;
        out[i] = u8::from_str_radix(s, 16).map_err(|_| ())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn in_memory_store_round_trips_by_ip_ignoring_port() {
        let mut store = InMemoryPairingStore::new();
        let key = SharedKey::from_bytes([7_u8; 32]);
        store.put(addr(27051), key.clone());

        let looked_up = store.get(addr(9999)).unwrap();
        assert_eq!(looked_up.as_bytes(), key.as_bytes());
    }

    #[test]
    fn in_memory_store_remove_clears_the_entry() {
        let mut store = InMemoryPairingStore::new();
        store.put(addr(1), SharedKey::from_bytes([1_u8; 32]));
        store.remove(addr(1));
        assert!(store.get(addr(1)).is_none());
    }

    #[test]
    fn file_store_persists_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairings.json");

        {
            let mut store = FilePairingStore::load(&path).unwrap();
            store.put(addr(27051), SharedKey::from_bytes([9_u8; 32]));
            store.flush().unwrap();
        }

        let reloaded = FilePairingStore::load(&path).unwrap();
        let key = reloaded.get(addr(27051)).unwrap();
        assert_eq!(key.as_bytes(), &[9_u8; 32]);
    }

    #[test]
    fn file_store_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let store = FilePairingStore::load(&path).unwrap();
        assert!(store.get(addr(1)).is_none());
    }
}
