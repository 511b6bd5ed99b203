#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pathguard` validates that a relative path received over the wire (a
//! manifest entry, or a delta-apply target) is safe to join onto a
//! destination root without escaping it.
//!
//! # Invariants
//!
//! - [`ensure_safe_relative_path`] is the single entry point; both the
//!   manifest-intake path and the delta-apply path call it before touching
//!   the file system, so there is exactly one definition of "safe" in the
//!   workspace.
//! - A rejected path must never be partially consumed as a file system
//!   operation. Callers that hit [`PathError`] while reading a manifest
//!   entry must close the connection rather than skip the entry, because
//!   skipping would still let an attacker drive arbitrarily large payload
//!   consumption (see the crate-level docs of `receiver`).
//!
//! # Examples
//!
//! ```
//! use pathguard::ensure_safe_relative_path;
//!
//! assert!(ensure_safe_relative_path("subdir/file.txt").is_ok());
//! assert!(ensure_safe_relative_path("../escape.txt").is_err());
//! assert!(ensure_safe_relative_path("/etc/passwd").is_err());
//! ```

use std::path::Path;

/// Reasons a relative path is rejected by [`ensure_safe_relative_path`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PathError {
    /// The path was empty or contained only whitespace.
    #[error("relative path is empty or whitespace")]
    Empty,
    /// The path begins with a path separator or is absolute.
    #[error("relative path is rooted or absolute")]
    Rooted,
    /// The path is or contains a `..` parent-directory segment.
    #[error("relative path contains a parent-directory segment")]
    ParentTraversal,
    /// The path contains a character that is never valid in a filename.
    #[error("relative path contains an invalid character")]
    InvalidCharacter,
}

const INVALID_CHARS: [char; 8] = ['<', '>', ':', '"', '|', '?', '*', '\0'];

/// Validates that `path` is safe to join onto a destination root.
///
/// A path is unsafe if any of the following hold: it is empty or
/// whitespace-only; it starts with `/` or `\`; it is absolute per the
/// platform's own rules; it equals `..` exactly; it contains a `..`
/// segment bounded by either separator; it starts with `..` followed by a
/// separator; it ends with a separator followed by `..`; or it contains a
/// character that is never valid in a filename (including control
/// characters) other than the separators themselves.
///
/// # Errors
///
/// Returns the specific [`PathError`] variant describing why the path was
/// rejected.
pub fn ensure_safe_relative_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() || path.trim().is_empty() {
        return Err(PathError::Empty);
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(PathError::Rooted);
    }
    if Path::new(path).is_absolute() {
        return Err(PathError::Rooted);
    }
    if path == ".." {
        return Err(PathError::ParentTraversal);
    }
    if contains_parent_segment(path) {
        return Err(PathError::ParentTraversal);
    }
    if path.chars().any(|c| {
        INVALID_CHARS.contains(&c) || (c.is_control() && c != '/' && c != '\\')
    }) {
        return Err(PathError::InvalidCharacter);
    }
    Ok(())
}

fn contains_parent_segment(path: &str) -> bool {
    let is_sep = |c: char| c == '/' || c == '\\';
    if path.split(is_sep).any(|segment| segment == "..") {
        return true;
    }
    if let Some(rest) = path.strip_prefix("..") {
        if rest.starts_with(is_sep) {
            return true;
        }
    }
    if let Some(rest) = path.strip_suffix("..") {
        if rest.ends_with(is_sep) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_relative_paths() {
        assert!(ensure_safe_relative_path("a.txt").is_ok());
        assert!(ensure_safe_relative_path("subdir/file.bin").is_ok());
        assert!(ensure_safe_relative_path("nested/deeper/path.dat").is_ok());
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(ensure_safe_relative_path(""), Err(PathError::Empty));
        assert_eq!(ensure_safe_relative_path("   "), Err(PathError::Empty));
    }

    #[test]
    fn rejects_rooted_paths() {
        assert_eq!(ensure_safe_relative_path("/etc/passwd"), Err(PathError::Rooted));
        assert_eq!(ensure_safe_relative_path("\\windows\\system32"), Err(PathError::Rooted));
    }

    #[test]
    fn rejects_bare_parent_segment() {
        assert_eq!(ensure_safe_relative_path(".."), Err(PathError::ParentTraversal));
    }

    #[test]
    fn rejects_embedded_parent_segments() {
        assert_eq!(ensure_safe_relative_path("../escape.txt"), Err(PathError::ParentTraversal));
        assert_eq!(ensure_safe_relative_path("a/../b"), Err(PathError::ParentTraversal));
        assert_eq!(ensure_safe_relative_path("a/b/.."), Err(PathError::ParentTraversal));
        assert_eq!(ensure_safe_relative_path("a\\..\\b"), Err(PathError::ParentTraversal));
    }

    #[test]
    fn rejects_parent_prefix_and_suffix_without_full_segment() {
        assert_eq!(ensure_safe_relative_path("../"), Err(PathError::ParentTraversal));
        assert_eq!(ensure_safe_relative_path("a/.."), Err(PathError::ParentTraversal));
    }

    #[test]
    fn accepts_double_dot_within_a_filename() {
        // "..foo" is not a parent-directory segment, just an unusual filename.
        assert!(ensure_safe_relative_path("..foo.txt").is_ok());
        assert!(ensure_safe_relative_path("foo..bar.txt").is_ok());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(ensure_safe_relative_path("a<b>.txt"), Err(PathError::InvalidCharacter));
        assert_eq!(ensure_safe_relative_path("a:b.txt"), Err(PathError::InvalidCharacter));
        assert_eq!(
            ensure_safe_relative_path("a\0b.txt"),
            Err(PathError::InvalidCharacter)
        );
    }

    proptest::proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(s in ".*") {
            let _ = ensure_safe_relative_path(&s);
        }
    }
}
