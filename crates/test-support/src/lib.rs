//! Shared fixtures for integration tests across the transfer workspace:
//! temp package trees, loopback peer pairs, and a deterministic clock.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};

/// A temporary directory populated with a fixed set of files, used as a
/// package root by sender/receiver/swarm integration tests.
pub struct PackageTree {
    dir: TempDir,
}

impl PackageTree {
    /// Builds a new package tree under a fresh temp directory, writing each
    /// `(relative_path, contents)` pair. Parent directories are created as
    /// needed.
    #[must_use]
    pub fn build(files: &[(&str, &[u8])]) -> Self {
        let dir = tempfile::tempdir().expect("create temp package root");
        for (relative, contents) in files {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent directory");
            }
            std::fs::write(&path, contents).expect("write fixture file");
        }
        Self { dir }
    }

    /// Returns the root path of the package tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the absolute path of a file given its relative path.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Reads back the contents of a relative path within the tree.
    pub fn read(&self, relative: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path(relative))
    }
}

/// The canonical three-file fixture used by the happy-path and smart-sync
/// end-to-end scenarios.
#[must_use]
pub fn canonical_package() -> PackageTree {
    PackageTree::build(&[
        ("a.txt", b"This is a test file content."),
        ("large.bin", &[b'A'; 10_000]),
        ("subdir/sub.txt", b"Subdirectory file."),
    ])
}

/// A connected pair of loopback TCP streams bound to `127.0.0.1`, standing
/// in for a sender/receiver session without requiring a fixed port.
pub struct LoopbackPair {
    /// The connecting side's stream.
    pub initiator: TcpStream,
    /// The accepting side's stream.
    pub acceptor: TcpStream,
}

/// Establishes a loopback TCP pair on an OS-assigned port.
///
/// # Panics
///
/// Panics if binding the loopback listener or completing the connection
/// fails, which would indicate a broken test environment rather than a
/// condition under test.
pub async fn loopback_pair() -> LoopbackPair {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("read local addr");

    let connect = TcpStream::connect(addr);
    let accept = listener.accept();
    let (initiator, (acceptor, _)) = tokio::join!(connect, accept);
    LoopbackPair {
        initiator: initiator.expect("connect loopback stream"),
        acceptor: acceptor.expect("accept loopback stream"),
    }
}

/// A monotonic clock whose current time is advanced explicitly by tests,
/// rather than tracking wall-clock time. Used wherever production code is
/// generic over "now" (swarm staleness checks, resume-state aging, EMA
/// timers) so tests can exercise multi-second timeouts instantly.
#[derive(Debug, Default)]
pub struct DeterministicClock {
    elapsed_millis: AtomicU64,
}

impl DeterministicClock {
    /// Creates a clock starting at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed_millis: AtomicU64::new(0),
        }
    }

    /// Returns the elapsed duration since the clock was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.elapsed_millis.load(Ordering::SeqCst))
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.elapsed_millis
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}
