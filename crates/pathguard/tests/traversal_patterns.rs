use pathguard::{ensure_safe_relative_path, PathError};

#[test]
fn rejects_every_pattern_named_in_the_traversal_scenario() {
    let unsafe_paths = [
        "../escape.txt",
        "..",
        "/absolute/path",
        "\\absolute\\path",
        "a/../b",
        "a/b/..",
        "../",
        "subdir/../../escape.txt",
    ];
    for path in unsafe_paths {
        assert!(
            ensure_safe_relative_path(path).is_err(),
            "expected {path:?} to be rejected"
        );
    }
}

#[test]
fn accepts_every_path_in_the_canonical_fixture() {
    for path in ["a.txt", "large.bin", "subdir/sub.txt"] {
        assert!(ensure_safe_relative_path(path).is_ok());
    }
}

#[test]
fn distinguishes_parent_traversal_from_other_rejections() {
    assert_eq!(
        ensure_safe_relative_path("../escape.txt"),
        Err(PathError::ParentTraversal)
    );
    assert_eq!(
        ensure_safe_relative_path("/escape.txt"),
        Err(PathError::Rooted)
    );
}
