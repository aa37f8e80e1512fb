//! Configuration snapshot of a datastore.

use crate::cursor::StringComparator;
use crate::datastore::IdGenerator;
use crate::persistence::{SerializationHooks, Storage};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable configuration a datastore was opened with.
///
/// Built by [`DatastoreBuilder`](crate::datastore::DatastoreBuilder); cloning
/// is cheap.
#[derive(Clone)]
pub struct DatastoreConfig {
    inner: Arc<DatastoreConfigInner>,
}

pub(crate) struct DatastoreConfigInner {
    pub(crate) filename: Option<PathBuf>,
    pub(crate) in_memory_only: bool,
    pub(crate) timestamp_data: bool,
    pub(crate) autoload: bool,
    pub(crate) corrupt_alert_threshold: f64,
    pub(crate) compare_strings: Option<StringComparator>,
    pub(crate) hooks: SerializationHooks,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) storage: Storage,
}

impl DatastoreConfig {
    pub(crate) fn new(inner: DatastoreConfigInner) -> Self {
        DatastoreConfig {
            inner: Arc::new(inner),
        }
    }

    /// Datafile name; `None` for in-memory datastores.
    pub fn filename(&self) -> Option<&Path> {
        if self.inner.in_memory_only {
            None
        } else {
            self.inner.filename.as_deref()
        }
    }

    pub fn in_memory_only(&self) -> bool {
        self.inner.in_memory_only
    }

    /// Whether `createdAt` and `updatedAt` are maintained.
    pub fn timestamp_data(&self) -> bool {
        self.inner.timestamp_data
    }

    pub fn autoload(&self) -> bool {
        self.inner.autoload
    }

    /// Corruption ratio above which a load fails; the live value can be
    /// changed with `Datastore::set_corrupt_alert_threshold`.
    pub fn corrupt_alert_threshold(&self) -> f64 {
        self.inner.corrupt_alert_threshold
    }

    pub fn compare_strings(&self) -> Option<&StringComparator> {
        self.inner.compare_strings.as_ref()
    }

    pub(crate) fn hooks(&self) -> &SerializationHooks {
        &self.inner.hooks
    }

    pub(crate) fn id_generator(&self) -> &Arc<dyn IdGenerator> {
        &self.inner.id_generator
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.inner.storage
    }
}

impl Debug for DatastoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreConfig")
            .field("filename", &self.filename())
            .field("in_memory_only", &self.in_memory_only())
            .field("timestamp_data", &self.timestamp_data())
            .field("autoload", &self.autoload())
            .field("corrupt_alert_threshold", &self.corrupt_alert_threshold())
            .field("compare_strings", &self.compare_strings())
            .finish()
    }
}
