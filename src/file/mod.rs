//! Byte-level file access used by the detection engine and every parser.
//!
//! All access goes through the [`RpFile`] trait so parsers never care
//! whether the bytes come from disk or memory. Handles are shared as
//! [`SharedFile`]; the OS resource closes when the last clone drops.

pub mod related;

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

pub use related::{file_ext, open_related_file};

/// Shared, reference-counted file handle.
pub type SharedFile = Arc<dyn RpFile>;

/// Positioned, read-only random access.
///
/// Methods take `&self`; implementations serialize access internally.
/// Interleaving seeks and reads from several threads on one handle is the
/// caller's problem.
pub trait RpFile: Send + Sync + fmt::Debug {
    /// Read up to `buf.len()` bytes at the current position.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Move the read position to an absolute offset.
    fn seek(&self, pos: u64) -> io::Result<()>;

    /// Current read position.
    fn tell(&self) -> io::Result<u64>;

    /// Total size in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Path of the underlying file, if there is one.
    fn filename(&self) -> Option<&str>;

    fn rewind(&self) -> io::Result<()> {
        self.seek(0)
    }

    /// Read until `buf` is full or EOF. Returns the number of bytes read.
    fn read_full(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Seek to `pos`, then [`read_full`](Self::read_full).
    fn seek_and_read(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.seek(pos)?;
        self.read_full(buf)
    }
}

/// A file on disk, opened read-only.
pub struct RpFileStd {
    path: PathBuf,
    name: String,
    inner: Mutex<File>,
}

impl RpFileStd {
    /// Open `path` for reading. Files are never opened writable.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            name: path.to_string_lossy().into_owned(),
            inner: Mutex::new(file),
        })
    }

    /// Open `path` and wrap it as a [`SharedFile`].
    pub fn open_shared(path: impl AsRef<Path>) -> io::Result<SharedFile> {
        Ok(Arc::new(Self::open(path)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for RpFileStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpFileStd").field("path", &self.path).finish()
    }
}

impl RpFile for RpFileStd {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.lock().read(buf)
    }

    fn seek(&self, pos: u64) -> io::Result<()> {
        self.inner.lock().seek(SeekFrom::Start(pos)).map(|_| ())
    }

    fn tell(&self) -> io::Result<u64> {
        self.inner.lock().stream_position()
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.inner.lock().metadata()?.len())
    }

    fn filename(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn seek_and_read(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        // Hold the lock across both steps.
        let mut file = self.inner.lock();
        file.seek(SeekFrom::Start(pos))?;
        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

/// An in-memory file. Used for embedded data and tests.
pub struct MemFile {
    data: Arc<[u8]>,
    pos: Mutex<u64>,
    name: Option<String>,
}

impl MemFile {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: Mutex::new(0),
            name: None,
        }
    }

    /// Attach a filename so extension-based checks see it.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn into_shared(self) -> SharedFile {
        Arc::new(self)
    }
}

impl fmt::Debug for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemFile")
            .field("len", &self.data.len())
            .field("name", &self.name)
            .finish()
    }
}

impl RpFile for MemFile {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pos = self.pos.lock();
        let start = (*pos).min(self.data.len() as u64) as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        *pos += n as u64;
        Ok(n)
    }

    fn seek(&self, pos: u64) -> io::Result<()> {
        *self.pos.lock() = pos;
        Ok(())
    }

    fn tell(&self) -> io::Result<u64> {
        Ok(*self.pos.lock())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn filename(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_memfile_reads_and_seeks() {
        let f = MemFile::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(f.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(f.tell().unwrap(), 4);

        assert_eq!(f.seek_and_read(8, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");

        // Past EOF reads nothing.
        assert_eq!(f.seek_and_read(100, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_std_file_roundtrip() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        tmp.flush().unwrap();

        let f = RpFileStd::open(tmp.path()).unwrap();
        assert_eq!(f.size().unwrap(), 11);
        let mut buf = [0u8; 5];
        assert_eq!(f.seek_and_read(6, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert!(f.filename().is_some());
    }

    #[test]
    fn test_open_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RpFileStd::open(dir.path()).is_err());
    }
}
