use crate::common::{DEFAULT_CORRUPT_ALERT_THRESHOLD, TEMP_FILE_SUFFIX};
use crate::cursor::StringComparator;
use crate::datastore::{Datastore, DatastoreConfig, DatastoreConfigInner, IdGenerator, RandomIdGenerator};
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::persistence::{FileStorage, SerializationHook, SerializationHooks, Storage, StorageProvider};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for opening a [`Datastore`].
///
/// Setters validate their input right away; the first invalid value is kept
/// and returned by [`DatastoreBuilder::open`].
///
/// # Examples
///
/// ```rust,ignore
/// use nedb::datastore::Datastore;
///
/// // In-memory datastore
/// let db = Datastore::builder().open()?;
///
/// // Persistent datastore, loaded right away
/// let db = Datastore::builder()
///     .filename("data/planets.db")
///     .timestamp_data(true)
///     .autoload(true)
///     .open()?;
/// ```
pub struct DatastoreBuilder {
    error: Option<NedbError>,
    filename: Option<PathBuf>,
    in_memory_only: bool,
    timestamp_data: bool,
    autoload: bool,
    corrupt_alert_threshold: f64,
    compare_strings: Option<StringComparator>,
    after_serialization: Option<SerializationHook>,
    before_deserialization: Option<SerializationHook>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    storage: Option<Storage>,
}

impl Default for DatastoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatastoreBuilder {
    pub fn new() -> Self {
        DatastoreBuilder {
            error: None,
            filename: None,
            in_memory_only: false,
            timestamp_data: false,
            autoload: false,
            corrupt_alert_threshold: DEFAULT_CORRUPT_ALERT_THRESHOLD,
            compare_strings: None,
            after_serialization: None,
            before_deserialization: None,
            id_generator: None,
            storage: None,
        }
    }

    /// Path of the datafile. Without a filename the datastore is in-memory.
    pub fn filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Keeps everything in memory even when a filename is given.
    pub fn in_memory_only(mut self, in_memory_only: bool) -> Self {
        self.in_memory_only = in_memory_only;
        self
    }

    /// Maintains `createdAt` and `updatedAt` on every document.
    pub fn timestamp_data(mut self, timestamp_data: bool) -> Self {
        self.timestamp_data = timestamp_data;
        self
    }

    /// Loads the datafile as part of [`DatastoreBuilder::open`].
    pub fn autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }

    /// Share of corrupt datafile lines tolerated on load, between 0 and 1.
    pub fn corrupt_alert_threshold(mut self, threshold: f64) -> Self {
        if !(0.0..=1.0).contains(&threshold) {
            log::error!("Invalid corrupt alert threshold {}", threshold);
            if self.error.is_none() {
                self.error = Some(NedbError::new(
                    &format!("Corrupt alert threshold must be between 0 and 1, got {}", threshold),
                    ErrorKind::InvalidOperation,
                ));
            }
        }
        self.corrupt_alert_threshold = threshold;
        self
    }

    /// String ordering used when sorting.
    pub fn compare_strings(mut self, comparator: StringComparator) -> Self {
        self.compare_strings = Some(comparator);
        self
    }

    /// Transform applied to every line before it is written.
    pub fn after_serialization<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.after_serialization = Some(Arc::new(hook));
        self
    }

    /// Transform applied to every line read back; must undo `after_serialization`.
    pub fn before_deserialization<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.before_deserialization = Some(Arc::new(hook));
        self
    }

    pub fn id_generator(mut self, id_generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Arc::new(id_generator));
        self
    }

    /// Storage backend; the local filesystem by default.
    pub fn storage(mut self, storage: impl StorageProvider + 'static) -> Self {
        self.storage = Some(Storage::new(storage));
        self
    }

    /// Opens the datastore, loading it when `autoload` is set.
    pub fn open(self) -> NedbResult<Datastore> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let filename = self.filename.filter(|f| !f.as_os_str().is_empty());
        let in_memory_only = self.in_memory_only || filename.is_none();

        if let Some(name) = filename.as_ref().filter(|_| !in_memory_only) {
            if name.to_string_lossy().ends_with(TEMP_FILE_SUFFIX) {
                log::error!("Invalid datafile name {}", name.display());
                return Err(NedbError::new(
                    &format!(
                        "The datafile name can't end with a {}, which is reserved for crash safe backup files",
                        TEMP_FILE_SUFFIX
                    ),
                    ErrorKind::BadFilename,
                ));
            }
        }

        let hooks = SerializationHooks::from_parts(self.after_serialization, self.before_deserialization)?;

        let config = DatastoreConfig::new(DatastoreConfigInner {
            filename,
            in_memory_only,
            timestamp_data: self.timestamp_data,
            autoload: self.autoload,
            corrupt_alert_threshold: self.corrupt_alert_threshold,
            compare_strings: self.compare_strings,
            hooks,
            id_generator: self.id_generator.unwrap_or_else(|| Arc::new(RandomIdGenerator)),
            storage: self.storage.unwrap_or_else(|| Storage::new(FileStorage::new())),
        });

        let datastore = Datastore::new(config)?;
        if datastore.config().autoload() {
            datastore.load_database()?;
        }
        Ok(datastore)
    }
}
