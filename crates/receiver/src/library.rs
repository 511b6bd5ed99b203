//! The external package-catalog interface consulted by `ListRequest`
//! sessions (§4.9).

use serde::{Deserialize, Serialize};

/// One entry in a `ListRequest` reply: a package this device can send.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageListing {
    /// The package's display name, as it would appear in a
    /// [`protocol::wire::TransferHeader::game_name`].
    pub name: String,
    /// Total size in bytes of the package.
    pub size: u64,
}

/// Answers `ListRequest` sessions with this device's package catalog.
///
/// Package discovery, Steam library scanning, and DRM detection are all out
/// of scope for the transfer core (see the workspace-level design notes);
/// this trait is the single seam an external collaborator implements to
/// supply that catalog without the core depending on how it was built.
pub trait LibraryProvider: Send + Sync {
    /// Returns every package currently available to share.
    fn list_packages(&self) -> Vec<PackageListing>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticLibrary(Vec<PackageListing>);

    impl LibraryProvider for StaticLibrary {
        fn list_packages(&self) -> Vec<PackageListing> {
            self.0.clone()
        }
    }

    #[test]
    fn a_trait_object_reports_its_configured_listings() {
        let library = StaticLibrary(vec![PackageListing {
            name: "Example Game".to_owned(),
            size: 1024,
        }]);
        let provider: &dyn LibraryProvider = &library;
        let listings = provider.list_packages();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Example Game");
    }
}
