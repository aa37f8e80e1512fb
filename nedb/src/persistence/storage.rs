use crate::common::TEMP_FILE_SUFFIX;
use crate::errors::NedbResult;
use std::ffi::OsString;
use std::io::{BufRead, Cursor};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem operations the persistence engine relies on.
///
/// Implementations only provide the primitive operations; the crash-safe
/// rewrite protocol and the integrity check are built on top of them and
/// behave the same for every backend.
///
/// Implementers must be `Send + Sync`, the engine calls them from the
/// executor thread.
pub trait StorageProvider: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> NedbResult<Vec<u8>>;

    /// Opens the file for line-by-line reading.
    fn read_stream(&self, path: &Path) -> NedbResult<Box<dyn BufRead + Send>> {
        Ok(Box::new(Cursor::new(self.read_file(path)?)))
    }

    /// Creates or truncates the file and writes `data`.
    fn write_file(&self, path: &Path, data: &[u8]) -> NedbResult<()>;

    /// Appends `data` in a single write, creating the file when needed.
    fn append_file(&self, path: &Path, data: &[u8]) -> NedbResult<()>;

    /// Atomically replaces `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> NedbResult<()>;

    fn unlink(&self, path: &Path) -> NedbResult<()>;

    /// Creates the directory and every missing parent.
    fn mkdir(&self, path: &Path) -> NedbResult<()>;

    /// Flushes a file or directory to durable storage.
    fn flush_to_storage(&self, path: &Path, is_dir: bool) -> NedbResult<()>;

    /// Writes `lines` (each followed by `\n`) so that a crash at any point leaves
    /// either the old or the new complete file behind.
    fn crash_safe_write_file_lines(&self, path: &Path, lines: &[String]) -> NedbResult<()> {
        let temp = temp_path(path);
        let directory = parent_dir(path);

        self.flush_to_storage(&directory, true)?;
        if self.exists(path) {
            self.flush_to_storage(path, false)?;
        }

        let mut data = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            data.push_str(line);
            data.push('\n');
        }
        self.write_file(&temp, data.as_bytes())?;
        self.flush_to_storage(&temp, false)?;
        self.rename(&temp, path)?;
        self.flush_to_storage(&directory, true)
    }

    /// Repairs the datafile left behind by an interrupted rewrite.
    ///
    /// An existing datafile is trusted as is. When only the temp file exists the
    /// rewrite finished but the rename did not, so the temp file is promoted.
    /// When neither exists an empty datafile is created.
    fn ensure_datafile_integrity(&self, path: &Path) -> NedbResult<()> {
        if self.exists(path) {
            return Ok(());
        }

        let temp = temp_path(path);
        if self.exists(&temp) {
            log::info!("Promoting leftover temp file {}", temp.display());
            self.rename(&temp, path)
        } else {
            self.write_file(path, b"")
        }
    }
}

/// Shared handle to a [`StorageProvider`].
#[derive(Clone)]
pub struct Storage {
    inner: Arc<dyn StorageProvider>,
}

impl Storage {
    pub fn new<T: StorageProvider + 'static>(inner: T) -> Self {
        Storage {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for Storage {
    type Target = Arc<dyn StorageProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Path of the transient file a rewrite goes through: the datafile name plus `~`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TEMP_FILE_SUFFIX);
    PathBuf::from(name)
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
