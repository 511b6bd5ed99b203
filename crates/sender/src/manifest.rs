//! Manifest construction: enumerating a package root and deciding, per
//! file, whether its hash can be trusted from package metadata or must be
//! recomputed now (§4.8 "smart hashing").

use std::path::{Path, PathBuf};

use checksums::strong::Xxh64;
use protocol::wire::FileEntry;
use protocol::{PackageMetadata, TransferError};

/// Builds the manifest for `package_root`, one [`FileEntry`] per regular
/// file found by a recursive walk, in directory-then-name order.
///
/// When `metadata` is supplied, a file whose last-write time is at or
/// before [`PackageMetadata::created_at`] and whose relative path appears
/// in `metadata`'s file-hash map reuses that stored hash instead of
/// rehashing the file's bytes ("smart hashing", §4.8). Every other file is
/// hashed now via [`checksums::hash_file`].
///
/// # Errors
///
/// Returns [`TransferError::Io`] if the walk or a hash computation fails,
/// and [`TransferError::Protocol`] if `metadata`'s `CreatedDate` is not
/// valid RFC3339.
pub fn build_manifest(
    package_root: &Path,
    metadata: Option<&PackageMetadata>,
) -> Result<Vec<FileEntry>, TransferError> {
    let created_at = metadata.map(PackageMetadata::created_at).transpose()?;

    let mut files = Vec::new();
    walk(package_root, package_root, &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let mut entries = Vec::with_capacity(files.len());
    for absolute in files {
        let relative_path = relative_slash_path(package_root, &absolute)?;
        let size = absolute
            .metadata()
            .map_err(|e| TransferError::io_at(&absolute, e))?
            .len();

        let hash = match (metadata, created_at) {
            (Some(metadata), Some(created_at)) if file_predates(&absolute, created_at)? => {
                match metadata.stored_hash(&relative_path) {
                    Some(stored) => stored.to_owned(),
                    None => hash_now(&absolute)?,
                }
            }
            _ => hash_now(&absolute)?,
        };

        entries.push(FileEntry {
            relative_path,
            size,
            hash,
            use_delta: size >= delta::MIN_DELTA_SOURCE_SIZE,
        });
    }
    Ok(entries)
}

fn hash_now(path: &Path) -> Result<String, TransferError> {
    let digest = checksums::hash_file::<Xxh64>(path)
        .map_err(|e| TransferError::io_at(path, std::io::Error::other(e)))?;
    Ok(Xxh64::to_hex(digest))
}

fn file_predates(path: &Path, created_at: std::time::SystemTime) -> Result<bool, TransferError> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| TransferError::io_at(path, e))?;
    Ok(modified <= created_at)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), TransferError> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| TransferError::io_at(dir, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| TransferError::io_at(dir, e))?;
    entries.sort_by_key(std::fs::DirEntry::path);

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| TransferError::io_at(&path, e))?;
        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_slash_path(root: &Path, absolute: &Path) -> Result<String, TransferError> {
    let relative = absolute.strip_prefix(root).map_err(|_| {
        TransferError::protocol(format!(
            "{} escaped package root {}",
            absolute.display(),
            root.display()
        ))
    })?;
    let mut normalized = String::new();
    for (i, component) in relative.components().enumerate() {
        if i > 0 {
            normalized.push('/');
        }
        normalized.push_str(&component.as_os_str().to_string_lossy());
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn enumerates_nested_files_in_sorted_order() {
        let tree = test_support::canonical_package();
        let entries = build_manifest(tree.root(), None).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.clone()).collect();
        assert_eq!(paths, vec!["a.txt", "large.bin", "subdir/sub.txt"]);
    }

    #[test]
    fn hashes_match_direct_computation() {
        let tree = test_support::canonical_package();
        let entries = build_manifest(tree.root(), None).unwrap();
        let a = entries.iter().find(|e| e.relative_path == "a.txt").unwrap();
        let expected = Xxh64::to_hex(Xxh64::digest(0, &tree.read("a.txt").unwrap()));
        assert_eq!(a.hash, expected);
    }

    #[test]
    fn smart_hashing_reuses_stored_hash_for_files_predating_metadata() {
        let tree = test_support::canonical_package();
        let future = humantime::format_rfc3339(
            std::time::SystemTime::now() + std::time::Duration::from_secs(3600),
        )
        .to_string();

        let mut file_hashes = HashMap::new();
        file_hashes.insert("a.txt".to_owned(), "stale-but-trusted-hash".to_owned());

        let metadata = PackageMetadata {
            app_id: 1,
            name: "Test".to_owned(),
            build_id: 1,
            created_date: future,
            emulator_mode: "none".to_owned(),
            emulator_version: None,
            original_size: 0,
            file_hashes,
        };

        let entries = build_manifest(tree.root(), Some(&metadata)).unwrap();
        let a = entries.iter().find(|e| e.relative_path == "a.txt").unwrap();
        assert_eq!(a.hash, "stale-but-trusted-hash");
    }

    #[test]
    fn metadata_without_a_stored_hash_falls_back_to_hashing() {
        let tree = test_support::canonical_package();
        let future = humantime::format_rfc3339(
            std::time::SystemTime::now() + std::time::Duration::from_secs(3600),
        )
        .to_string();

        let metadata = PackageMetadata {
            app_id: 1,
            name: "Test".to_owned(),
            build_id: 1,
            created_date: future,
            emulator_mode: "none".to_owned(),
            emulator_version: None,
            original_size: 0,
            file_hashes: HashMap::new(),
        };

        let entries = build_manifest(tree.root(), Some(&metadata)).unwrap();
        let a = entries.iter().find(|e| e.relative_path == "a.txt").unwrap();
        let expected = Xxh64::to_hex(Xxh64::digest(0, &tree.read("a.txt").unwrap()));
        assert_eq!(a.hash, expected);
    }
}
