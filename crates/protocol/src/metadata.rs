//! The package metadata file (`steamroll.json`, §6.1): consumed by the
//! sender for smart hashing and by the receiver for smart-sync comparison,
//! produced by an external collaborator (package creation is out of scope
//! here).

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// Deserialized `steamroll.json`. Unknown fields are ignored per §6.1; this
/// falls out of not using `#[serde(deny_unknown_fields)]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Steam app id the package was captured from.
    #[serde(rename = "AppId")]
    pub app_id: i64,
    /// Display name of the package.
    #[serde(rename = "Name")]
    pub name: String,
    /// Build id the package was captured at.
    #[serde(rename = "BuildId")]
    pub build_id: i64,
    /// RFC3339 timestamp the package was created. A file whose last-write
    /// time predates this may reuse its stored hash ("smart hashing",
    /// §4.8).
    #[serde(rename = "CreatedDate")]
    pub created_date: String,
    /// Emulator compatibility mode, if any.
    #[serde(rename = "EmulatorMode")]
    pub emulator_mode: String,
    /// Emulator version, if `emulator_mode` names one that is versioned.
    #[serde(rename = "EmulatorVersion")]
    pub emulator_version: Option<String>,
    /// Size in bytes of the package at creation time.
    #[serde(rename = "OriginalSize")]
    pub original_size: i64,
    /// Forward-slash relative path to lowercase-hex hash, as captured when
    /// the package was created.
    #[serde(rename = "FileHashes")]
    pub file_hashes: HashMap<String, String>,
}

impl PackageMetadata {
    /// Loads and parses `steamroll.json` at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Protocol`] if the file cannot be read or
    /// does not parse as `PackageMetadata` JSON.
    pub fn load(path: &Path) -> Result<Self, TransferError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TransferError::protocol(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| TransferError::protocol(format!("failed to parse {}: {e}", path.display())))
    }

    /// Parses [`Self::created_date`] as a [`SystemTime`].
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Protocol`] if the timestamp is not valid
    /// RFC3339.
    pub fn created_at(&self) -> Result<SystemTime, TransferError> {
        humantime::parse_rfc3339(&self.created_date).map_err(|e| {
            TransferError::protocol(format!("invalid CreatedDate {:?}: {e}", self.created_date))
        })
    }

    /// Looks up a stored hash for `relative_path`, if the metadata carries
    /// one.
    #[must_use]
    pub fn stored_hash(&self, relative_path: &str) -> Option<&str> {
        self.file_hashes.get(relative_path).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "AppId": 220,
            "Name": "Example Game",
            "BuildId": 9001,
            "CreatedDate": "2024-03-01T12:00:00Z",
            "EmulatorMode": "none",
            "EmulatorVersion": null,
            "OriginalSize": 10485760,
            "FileHashes": { "a.txt": "deadbeef" },
            "SomeUnknownField": 42
        }"#
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let metadata: PackageMetadata = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(metadata.app_id, 220);
        assert_eq!(metadata.stored_hash("a.txt"), Some("deadbeef"));
    }

    #[test]
    fn created_date_parses_as_rfc3339() {
        let metadata: PackageMetadata = serde_json::from_str(sample_json()).unwrap();
        assert!(metadata.created_at().is_ok());
    }

    #[test]
    fn load_reports_protocol_error_on_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steamroll.json");
        std::fs::write(&path, b"not json").unwrap();
        let err = PackageMetadata::load(&path).unwrap_err();
        assert!(matches!(err, TransferError::Protocol { .. }));
    }
}
