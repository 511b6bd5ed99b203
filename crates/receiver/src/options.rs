//! Configuration a receiver session needs beyond what arrives on the wire.

use std::path::PathBuf;

/// Settings a receiver session is constructed with.
pub struct ReceiverOptions {
    /// Root directory under which each incoming package gets its own
    /// subdirectory, named after the header's `game_name` (sanitized).
    pub library_root: PathBuf,
    /// Whether this endpoint requires the `V3` handshake before reading
    /// any frame. Policy-driven rather than sniffed from the connection,
    /// since the magic a sender picks is not observable before a stream
    /// adapter is already in place (see `DESIGN.md`).
    pub require_encryption: bool,
    /// This device's id, advertised during the `V3` handshake.
    pub device_id: String,
}

/// Replaces characters [`pathguard::ensure_safe_relative_path`] would
/// reject with `_`, so an arbitrary `game_name` can be used as a single
/// path component.
#[must_use]
pub fn sanitize_path_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_path_separators_and_reserved_characters() {
        assert_eq!(sanitize_path_component("Half-Life 2: Episode One"), "Half-Life 2_ Episode One");
        assert_eq!(sanitize_path_component("a/b\\c"), "a_b_c");
    }

    #[test]
    fn leaves_an_already_safe_name_untouched() {
        assert_eq!(sanitize_path_component("Portal 2"), "Portal 2");
    }
}
