use crate::common::{atomic, Atomic, Value, DELETED_MARKER, INDEX_CREATED_MARKER, INDEX_REMOVED_MARKER};
use crate::document::{deserialize_document, serialize_document, Document};
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::index::IndexOptions;
use crate::persistence::{parent_dir, SerializationHooks, Storage};
use indexmap::IndexMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Live state recovered from a datafile.
#[derive(Debug, Default)]
pub struct DatafileContent {
    /// Surviving documents, one per `_id`.
    pub documents: Vec<Document>,
    /// Index options by field name, from the surviving `$$indexCreated` markers.
    pub indexes: IndexMap<String, IndexOptions>,
}

/// Append-only datafile engine.
///
/// Every change is appended as one line: a full document, a tombstone
/// `{"$$deleted":true,"_id":..}` or an index marker. Replaying the file and
/// folding it by `_id` gives back the live documents. Compaction rewrites the
/// file with one line per live document through the crash-safe protocol of
/// the storage backend.
///
/// Without a filename every operation is a no-op.
#[derive(Clone)]
pub struct Persistence {
    inner: Arc<PersistenceInner>,
}

struct PersistenceInner {
    filename: Option<PathBuf>,
    storage: Storage,
    hooks: SerializationHooks,
    corrupt_alert_threshold: Atomic<f64>,
}

impl Persistence {
    pub fn new(
        filename: Option<PathBuf>,
        storage: Storage,
        hooks: SerializationHooks,
        corrupt_alert_threshold: f64,
    ) -> Persistence {
        Persistence {
            inner: Arc::new(PersistenceInner {
                filename,
                storage,
                hooks,
                corrupt_alert_threshold: atomic(corrupt_alert_threshold),
            }),
        }
    }

    pub fn in_memory_only(&self) -> bool {
        self.inner.filename.is_none()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.inner.filename.as_deref()
    }

    pub fn corrupt_alert_threshold(&self) -> f64 {
        *self.inner.corrupt_alert_threshold.read()
    }

    pub fn set_corrupt_alert_threshold(&self, threshold: f64) {
        *self.inner.corrupt_alert_threshold.write() = threshold;
    }

    fn serialize_line(&self, record: &Document) -> NedbResult<String> {
        Ok(self.inner.hooks.after_serialization(&serialize_document(record)?))
    }

    /// Appends the records to the datafile in a single write.
    pub fn persist_new_state<'a, I>(&self, records: I) -> NedbResult<()>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let Some(filename) = self.filename() else {
            return Ok(());
        };

        let mut data = String::new();
        for record in records {
            data.push_str(&self.serialize_line(record)?);
            data.push('\n');
        }
        if data.is_empty() {
            return Ok(());
        }
        self.inner.storage.append_file(filename, data.as_bytes())
    }

    /// Rewrites the datafile with one line per document followed by one
    /// `$$indexCreated` marker per index.
    pub fn persist_cached_database(
        &self,
        documents: &[Arc<Document>],
        indexes: &[IndexOptions],
    ) -> NedbResult<()> {
        let Some(filename) = self.filename() else {
            return Ok(());
        };

        let mut lines = Vec::with_capacity(documents.len() + indexes.len());
        for doc in documents {
            lines.push(self.serialize_line(doc)?);
        }
        for options in indexes {
            lines.push(self.serialize_line(&index_created_marker(options)?)?);
        }

        self.inner.storage.crash_safe_write_file_lines(filename, &lines)?;
        log::debug!(
            "Compacted {} to {} document(s) and {} index marker(s)",
            filename.display(),
            documents.len(),
            indexes.len()
        );
        Ok(())
    }

    /// Prepares the datafile (parent directory, interrupted rewrite recovery)
    /// and replays it.
    pub fn read_datafile(&self) -> NedbResult<DatafileContent> {
        let Some(filename) = self.filename() else {
            return Ok(DatafileContent::default());
        };

        self.inner.storage.mkdir(&parent_dir(filename))?;
        self.inner.storage.ensure_datafile_integrity(filename)?;
        let reader = self.inner.storage.read_stream(filename)?;
        self.treat_raw_stream(reader)
    }

    /// Removes the datafile if there is one.
    pub fn delete_datafile(&self) -> NedbResult<()> {
        match self.filename() {
            Some(filename) if self.inner.storage.exists(filename) => {
                self.inner.storage.unlink(filename)
            }
            _ => Ok(()),
        }
    }

    pub fn treat_raw_data(&self, raw: &str) -> NedbResult<DatafileContent> {
        self.treat_raw_stream(raw.as_bytes())
    }

    /// Folds the datafile lines into the live state.
    ///
    /// Blank lines are ignored. Lines that cannot be decoded count as corrupt;
    /// when the share of corrupt lines exceeds the alert threshold the whole
    /// load fails instead of silently dropping data.
    pub fn treat_raw_stream<R: BufRead>(&self, mut reader: R) -> NedbResult<DatafileContent> {
        let mut documents: IndexMap<String, Document> = IndexMap::new();
        let mut indexes: IndexMap<String, IndexOptions> = IndexMap::new();
        let mut corrupt_items = 0usize;
        let mut total_items = 0usize;
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            if buffer.last() == Some(&b'\n') {
                buffer.pop();
            }
            if buffer.is_empty() {
                continue;
            }
            total_items += 1;

            let record = match std::str::from_utf8(&buffer) {
                Ok(line) => deserialize_document(&self.inner.hooks.before_deserialization(line)),
                Err(e) => Err(NedbError::new(&e.to_string(), ErrorKind::EncodingError)),
            };

            match record.and_then(|record| fold_record(record, &mut documents, &mut indexes)) {
                Ok(()) => {}
                Err(e) => {
                    log::debug!("Corrupt datafile line {}: {}", total_items, e);
                    corrupt_items += 1;
                }
            }
        }

        let threshold = self.corrupt_alert_threshold();
        if total_items > 0 && corrupt_items as f64 / total_items as f64 > threshold {
            log::error!(
                "{} of {} datafile lines are corrupt, above the {} alert threshold",
                corrupt_items,
                total_items,
                threshold
            );
            return Err(NedbError::new(
                &format!(
                    "More than {}% of the data file is corrupt, the wrong deserialization hook may be used. Cautiously refusing to start to prevent data loss",
                    (threshold * 100.0).floor()
                ),
                ErrorKind::TooMuchCorruption {
                    corrupt_items,
                    total_items,
                },
            ));
        }

        Ok(DatafileContent {
            documents: documents.into_values().collect(),
            indexes,
        })
    }
}

fn fold_record(
    record: Document,
    documents: &mut IndexMap<String, Document>,
    indexes: &mut IndexMap<String, IndexOptions>,
) -> NedbResult<()> {
    if let Some(id) = record.id().filter(|id| id.is_truthy()) {
        let key = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if record.get(DELETED_MARKER) == Some(&Value::Bool(true)) {
            documents.shift_remove(&key);
        } else {
            documents.insert(key, record);
        }
    } else if let Some(marker) = record.get(INDEX_CREATED_MARKER) {
        let options = IndexOptions::from_value(marker)?;
        if !options.field_name.is_empty() {
            indexes.insert(options.field_name.clone(), options);
        }
    } else if let Some(Value::String(field_name)) = record.get(INDEX_REMOVED_MARKER) {
        indexes.shift_remove(field_name);
    }
    Ok(())
}

pub(crate) fn index_created_marker(options: &IndexOptions) -> NedbResult<Document> {
    let mut marker = Document::new();
    marker.put(INDEX_CREATED_MARKER, options.to_value()?);
    Ok(marker)
}

pub(crate) fn index_removed_marker(field_name: &str) -> Document {
    let mut marker = Document::new();
    marker.put(INDEX_REMOVED_MARKER, field_name);
    marker
}

pub(crate) fn tombstone(id: &Value) -> Document {
    let mut record = Document::new();
    record.put(DELETED_MARKER, true);
    record.put(crate::common::DOC_ID, id.clone());
    record
}
