//! The random-access writer: a single owner of the swarm output file,
//! pre-sized up front and written at exact offsets under one mutex (§4.10,
//! §9 "Random-access write-under-parallel-readers").

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Pre-sizes an output file and serializes scatter writes to it behind a
/// single mutex.
///
/// Pre-sizing (`set_len` up front, sparse where the platform supports it)
/// means every block write lands at a known offset inside an
/// already-allocated file rather than forcing the filesystem to extend the
/// file on every write — important because block completion order is
/// unordered by design (§5 "block writes are unordered").
pub struct RandomAccessWriter {
    path: PathBuf,
    file: Mutex<File>,
    declared_len: u64,
}

impl RandomAccessWriter {
    /// Creates (or truncates) the file at `path` and pre-sizes it to
    /// `declared_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] if the file cannot be created or resized.
    pub fn create(path: &Path, declared_len: u64) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(declared_len)?;
        Ok(Self {
            path: path.to_owned(),
            file: Mutex::new(file),
            declared_len,
        })
    }

    /// Writes `bytes` at `offset`, blocking any other caller's write for
    /// the duration. Callers run this from a blocking context
    /// (`tokio::task::spawn_blocking`); it is plain synchronous I/O.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] on write failure.
    pub fn write_at(&self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        let file = self.file.lock().expect("writer lock is never poisoned");
        write_at_offset(&file, offset, bytes)
    }

    /// Flushes and asserts the file's final size equals the declared
    /// length, per §4.10 "After all jobs complete, the writer flushes and
    /// its final size is asserted to equal the declared file size."
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] if the flush or metadata read fails, or a
    /// [`io::ErrorKind::InvalidData`] error if the sizes disagree.
    pub fn finish(&self) -> io::Result<()> {
        let file = self.file.lock().expect("writer lock is never poisoned");
        file.sync_all()?;
        let actual = file.metadata()?.len();
        if actual != self.declared_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "swarm output {} has size {actual}, declared {}",
                    self.path.display(),
                    self.declared_len
                ),
            ));
        }
        Ok(())
    }

    /// The path being written to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn write_at_offset(file: &File, offset: u64, bytes: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(bytes, offset)
}

#[cfg(not(unix))]
fn write_at_offset(file: &File, offset: u64, bytes: &[u8]) -> io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let mut file = file.try_clone()?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pre_sizes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = RandomAccessWriter::create(&path, 4096).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
        drop(writer);
    }

    #[test]
    fn write_at_lands_bytes_at_the_requested_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = RandomAccessWriter::create(&path, 16).unwrap();
        writer.write_at(8, b"abcdefgh").unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(&contents[8..16], b"abcdefgh");
        assert_eq!(&contents[0..8], &[0_u8; 8]);
    }

    #[test]
    fn out_of_order_writes_land_in_the_right_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = RandomAccessWriter::create(&path, 12).unwrap();
        writer.write_at(6, b"second").unwrap();
        writer.write_at(0, b"first!").unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(&contents, b"first!second");
    }

    #[test]
    fn finish_succeeds_when_the_size_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = RandomAccessWriter::create(&path, 8).unwrap();
        writer.write_at(0, &[1_u8; 8]).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn finish_rejects_a_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = RandomAccessWriter::create(&path, 8).unwrap();
        std::fs::File::open(&path).unwrap().set_len(4).unwrap();
        let err = writer.finish().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
