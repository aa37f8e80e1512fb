use crate::errors::{NedbError, NedbResult};
use crate::persistence::StorageProvider;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Storage backend on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> FileStorage {
        FileStorage
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> NedbError {
    log::error!("Failed to {} {}: {}", action, path.display(), err);
    NedbError::from(err)
}

impl StorageProvider for FileStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> NedbResult<Vec<u8>> {
        fs::read(path).map_err(|e| io_error("read", path, e))
    }

    fn read_stream(&self, path: &Path) -> NedbResult<Box<dyn BufRead + Send>> {
        let file = File::open(path).map_err(|e| io_error("open", path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> NedbResult<()> {
        fs::write(path, data).map_err(|e| io_error("write", path, e))
    }

    fn append_file(&self, path: &Path, data: &[u8]) -> NedbResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_error("open", path, e))?;
        file.write_all(data).map_err(|e| io_error("append to", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> NedbResult<()> {
        fs::rename(from, to).map_err(|e| io_error("rename", from, e))
    }

    fn unlink(&self, path: &Path) -> NedbResult<()> {
        fs::remove_file(path).map_err(|e| io_error("remove", path, e))
    }

    fn mkdir(&self, path: &Path) -> NedbResult<()> {
        fs::create_dir_all(path).map_err(|e| io_error("create directory", path, e))
    }

    fn flush_to_storage(&self, path: &Path, is_dir: bool) -> NedbResult<()> {
        let handle = if is_dir {
            File::open(path)
        } else {
            OpenOptions::new().read(true).write(true).open(path)
        };

        match handle.and_then(|file| file.sync_all()) {
            Ok(()) => Ok(()),
            // some platforms cannot open or sync a directory handle
            Err(e) if is_dir => {
                log::warn!("Could not flush directory {}: {}", path.display(), e);
                Ok(())
            }
            Err(e) => Err(io_error("flush", path, e)),
        }
    }
}
