use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::persistence::StorageProvider;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage backend keeping every file in memory.
///
/// Behaves like a filesystem for the persistence engine, so a datastore
/// backed by it replays, compacts and recovers exactly like a file based one.
/// Clones share the same files.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryStorageInner>,
}

#[derive(Default)]
struct MemoryStorageInner {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<HashSet<PathBuf>>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// Returns the names of all stored files.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.inner.files.lock().keys().cloned().collect();
        files.sort();
        files
    }
}

fn not_found(path: &Path) -> NedbError {
    log::error!("No such file {}", path.display());
    NedbError::new(
        &format!("No such file {}", path.display()),
        ErrorKind::FileNotFound,
    )
}

impl StorageProvider for MemoryStorage {
    fn exists(&self, path: &Path) -> bool {
        self.inner.files.lock().contains_key(path) || self.inner.dirs.lock().contains(path)
    }

    fn read_file(&self, path: &Path) -> NedbResult<Vec<u8>> {
        self.inner
            .files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> NedbResult<()> {
        self.inner.files.lock().insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn append_file(&self, path: &Path, data: &[u8]) -> NedbResult<()> {
        self.inner
            .files
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> NedbResult<()> {
        let mut files = self.inner.files.lock();
        match files.remove(from) {
            Some(data) => {
                files.insert(to.to_path_buf(), data);
                Ok(())
            }
            None => Err(not_found(from)),
        }
    }

    fn unlink(&self, path: &Path) -> NedbResult<()> {
        match self.inner.files.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(not_found(path)),
        }
    }

    fn mkdir(&self, path: &Path) -> NedbResult<()> {
        let mut dirs = self.inner.dirs.lock();
        for ancestor in path.ancestors().filter(|p| !p.as_os_str().is_empty()) {
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn flush_to_storage(&self, _path: &Path, _is_dir: bool) -> NedbResult<()> {
        Ok(())
    }
}
