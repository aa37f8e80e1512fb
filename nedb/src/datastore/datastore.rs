use crate::common::{
    now_millis, NedbEventBus, Scheduler, SubscriberRef, Value, CREATED_AT, DOC_ID,
    MIN_AUTOCOMPACTION_INTERVAL, UPDATED_AT,
};
use crate::cursor::{all_documents, document_count, execute_cursor, first_document, Cursor, CursorOptions};
use crate::datastore::{
    AffectedDocuments, DatastoreBuilder, DatastoreConfig, DatastoreEventInfo, DatastoreEventListener,
    DatastoreEvents, RemoveOptions, UpdateOptions, UpdateResult,
};
use crate::document::{check_object, deep_copy_strict, Document};
use crate::errors::{ErrorKind, NedbError, NedbResult};
use crate::executor::{Executor, TaskHandle};
use crate::index::{unique_index, Index, IndexOptions};
use crate::persistence::{index_created_marker, index_removed_marker, tombstone, Persistence};
use crate::query::Query;
use crate::update::modify;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

const RANGE_OPERATORS: [&str; 4] = ["$lt", "$lte", "$gt", "$gte"];
const MAX_ID_ATTEMPTS: usize = 64;

/// An embedded document store.
///
/// Documents live in memory, in a set of field indexes that always contains
/// the unique `_id` index. A persistent datastore also appends every change
/// to its datafile and replays that file on [`Datastore::load_database`].
///
/// All operations go through one FIFO queue and run one at a time, each
/// finishing (including its write to the datafile) before the next starts.
/// The public methods enqueue their operation and block until it is done.
///
/// A persistent datastore starts in a buffering phase: operations called
/// before the first load wait in a buffer and run, in order, once the load
/// completes. Calling one before loading therefore blocks until another
/// thread loads the datastore.
///
/// # Examples
///
/// ```rust,ignore
/// use nedb::doc;
/// use nedb::datastore::{Datastore, multi};
///
/// let db = Datastore::builder().filename("data/planets.db").autoload(true).open()?;
/// db.insert(doc! { name: "Mars", moons: 2 })?;
/// db.update(doc! { name: "Mars" }, doc! { "$inc": { moons: 1 } }, multi())?;
/// let planet = db.find_one(doc! { name: "Mars" }).exec()?;
/// ```
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<DatastoreInner>,
}

pub(crate) struct DatastoreInner {
    config: DatastoreConfig,
    executor: Executor,
    persistence: Persistence,
    state: Mutex<DatastoreState>,
    event_bus: NedbEventBus<DatastoreEventInfo, DatastoreEventListener>,
    autocompaction: Mutex<Option<Scheduler>>,
}

impl Debug for Datastore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore").field("config", self.config()).finish()
    }
}

impl Datastore {
    pub fn builder() -> DatastoreBuilder {
        DatastoreBuilder::new()
    }

    pub(crate) fn new(config: DatastoreConfig) -> NedbResult<Datastore> {
        let executor = Executor::new()?;
        let persistence = Persistence::new(
            config.filename().map(Path::to_path_buf),
            config.storage().clone(),
            config.hooks().clone(),
            config.corrupt_alert_threshold(),
        );
        if persistence.in_memory_only() {
            executor.process_buffer();
        }

        Ok(Datastore {
            inner: Arc::new(DatastoreInner {
                config,
                executor,
                persistence,
                state: Mutex::new(DatastoreState::new()),
                event_bus: NedbEventBus::new(),
                autocompaction: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &DatastoreConfig {
        &self.inner.config
    }

    /// Queues an operation; the task only holds a weak reference so buffered
    /// tasks never keep a dropped datastore alive.
    fn schedule<T, F>(&self, force_queuing: bool, operation: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&DatastoreInner) -> NedbResult<T> + Send + 'static,
    {
        let target = Arc::downgrade(&self.inner);
        self.inner.executor.push(
            move || match target.upgrade() {
                Some(inner) => operation(&inner),
                None => Err(datastore_closed()),
            },
            force_queuing,
        )
    }

    /// Loads the datafile into memory, compacts it and releases the buffered
    /// operations. Loading again discards the in-memory state and reloads.
    pub fn load_database(&self) -> NedbResult<()> {
        self.schedule(true, |inner| {
            let mut state = inner.state.lock();
            inner.load_locked(&mut state)?;
            drop(state);
            if !inner.persistence.in_memory_only() {
                inner.executor.process_buffer();
            }
            Ok(())
        })
        .wait()
    }

    /// Inserts a document and returns a copy of it as stored.
    pub fn insert(&self, doc: Document) -> NedbResult<Document> {
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            let mut inserted = inner.insert_locked(&mut state, vec![doc])?;
            inserted.pop().ok_or_else(|| {
                log::error!("Insert returned no document");
                NedbError::new("Insert returned no document", ErrorKind::InternalError)
            })
        })
        .wait()
    }

    /// Inserts every document or, when any of them fails, none of them.
    pub fn insert_many(&self, docs: Vec<Document>) -> NedbResult<Vec<Document>> {
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            inner.insert_locked(&mut state, docs)
        })
        .wait()
    }

    pub fn find(&self, query: impl Into<Query>) -> Cursor<Vec<Document>> {
        Cursor::new(self.clone(), query.into(), all_documents)
    }

    pub fn find_one(&self, query: impl Into<Query>) -> Cursor<Option<Document>> {
        Cursor::new(self.clone(), query.into(), first_document).limit(1)
    }

    pub fn count(&self, query: impl Into<Query>) -> Cursor<usize> {
        Cursor::new(self.clone(), query.into(), document_count)
    }

    pub(crate) fn run_cursor(&self, query: Query, options: CursorOptions) -> NedbResult<Vec<Document>> {
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            inner.find_locked(&mut state, &query, &options)
        })
        .wait()
    }

    /// Applies `update` (a replacement document or a modifier document) to the
    /// first match, or every match with `multi`.
    pub fn update(
        &self,
        query: impl Into<Query>,
        update: Document,
        options: UpdateOptions,
    ) -> NedbResult<UpdateResult> {
        let query = query.into();
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            inner.update_locked(&mut state, &query, &update, options)
        })
        .wait()
    }

    /// Removes the first match, or every match with `multi`, and returns how
    /// many documents were removed.
    pub fn remove(&self, query: impl Into<Query>, options: RemoveOptions) -> NedbResult<usize> {
        let query = query.into();
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            inner.remove_locked(&mut state, &query, options.is_multi())
        })
        .wait()
    }

    /// Creates an index on `options.field_name` unless one already exists.
    pub fn ensure_index(&self, options: IndexOptions) -> NedbResult<()> {
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            inner.ensure_index_locked(&mut state, options)
        })
        .wait()
    }

    pub fn remove_index(&self, field_name: &str) -> NedbResult<()> {
        let field_name = field_name.to_string();
        self.schedule(false, move |inner| {
            let mut state = inner.state.lock();
            inner.remove_index_locked(&mut state, &field_name)
        })
        .wait()
    }

    /// Names of the indexed fields, `_id` first.
    pub fn index_names(&self) -> NedbResult<Vec<String>> {
        self.schedule(false, |inner| Ok(inner.state.lock().indexes.keys().cloned().collect()))
            .wait()
    }

    /// Copies of every document, in `_id` order.
    pub fn get_all_data(&self) -> NedbResult<Vec<Document>> {
        self.schedule(false, |inner| {
            Ok(inner
                .state
                .lock()
                .all_documents()
                .iter()
                .map(|doc| Document::clone(doc))
                .collect())
        })
        .wait()
    }

    /// Rewrites the datafile with one line per live document.
    pub fn compact_datafile(&self) -> NedbResult<()> {
        self.schedule(false, |inner| {
            let state = inner.state.lock();
            inner.persist_cached_database(&state)
        })
        .wait()
    }

    /// Compacts the datafile periodically, at most every 5 seconds.
    /// Replaces any previously set interval.
    pub fn set_autocompaction_interval(&self, interval: Duration) {
        let interval = interval.max(MIN_AUTOCOMPACTION_INTERVAL);
        self.stop_autocompaction();

        let executor = self.inner.executor.clone();
        let target = Arc::downgrade(&self.inner);
        let scheduler = Scheduler::new();
        scheduler.schedule(interval, move || {
            queue_compaction(&executor, target.clone());
        });
        log::debug!("Autocompaction every {:?}", interval);
        *self.inner.autocompaction.lock() = Some(scheduler);
    }

    pub fn stop_autocompaction(&self) {
        if let Some(scheduler) = self.inner.autocompaction.lock().take() {
            scheduler.stop();
        }
    }

    pub fn is_autocompacting(&self) -> bool {
        self.inner
            .autocompaction
            .lock()
            .as_ref()
            .is_some_and(Scheduler::has_tasks)
    }

    /// Changes the corruption ratio tolerated by the next load.
    pub fn set_corrupt_alert_threshold(&self, threshold: f64) {
        self.inner.persistence.set_corrupt_alert_threshold(threshold);
    }

    /// Deletes every document and index and removes the datafile.
    ///
    /// Operations still waiting in the buffer are discarded. A persistent
    /// datastore goes back to buffering until it is loaded again.
    pub fn drop_database(&self) -> NedbResult<()> {
        self.stop_autocompaction();
        self.inner.executor.reset_buffer();
        self.inner.executor.drain()?;
        self.schedule(true, |inner| {
            let mut state = inner.state.lock();
            *state = DatastoreState::new();
            inner.persistence.delete_datafile()?;
            if inner.persistence.in_memory_only() {
                inner.executor.process_buffer();
            }
            log::info!("Dropped datastore");
            Ok(())
        })
        .wait()
    }

    pub fn subscribe(&self, listener: DatastoreEventListener) -> NedbResult<SubscriberRef> {
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> NedbResult<()> {
        self.inner.event_bus.deregister(subscriber)
    }
}

fn queue_compaction(executor: &Executor, target: Weak<DatastoreInner>) {
    let _handle = executor.push(
        move || {
            if let Some(inner) = target.upgrade() {
                let state = inner.state.lock();
                if let Err(e) = inner.persist_cached_database(&state) {
                    log::warn!("Autocompaction failed: {}", e);
                }
            }
            Ok(())
        },
        false,
    );
}

fn datastore_closed() -> NedbError {
    log::error!("Datastore has been dropped");
    NedbError::new("Datastore has been dropped", ErrorKind::InvalidOperation)
}

impl DatastoreInner {
    fn create_new_id(&self, state: &DatastoreState) -> NedbResult<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.config.id_generator().generate();
            if !state.contains_id(&Value::from(id.as_str())) {
                return Ok(id);
            }
        }
        log::error!("Could not generate a free _id after {} attempts", MAX_ID_ATTEMPTS);
        Err(NedbError::new(
            &format!("Could not generate a free _id after {} attempts", MAX_ID_ATTEMPTS),
            ErrorKind::InternalError,
        ))
    }

    fn prepare_document_for_insertion(&self, state: &DatastoreState, mut doc: Document) -> NedbResult<Document> {
        if !doc.has_id() {
            doc.put(DOC_ID, self.create_new_id(state)?);
        }
        if self.config.timestamp_data() {
            let now = now_millis();
            if !doc.contains_key(CREATED_AT) {
                doc.put(CREATED_AT, now);
            }
            if !doc.contains_key(UPDATED_AT) {
                doc.put(UPDATED_AT, now);
            }
        }
        check_object(&doc)?;
        Ok(doc)
    }

    fn insert_locked(&self, state: &mut DatastoreState, docs: Vec<Document>) -> NedbResult<Vec<Document>> {
        let prepared: Vec<Arc<Document>> = docs
            .into_iter()
            .map(|doc| self.prepare_document_for_insertion(state, doc).map(Arc::new))
            .collect::<NedbResult<_>>()?;

        state.add_to_indexes(&prepared)?;
        self.persistence.persist_new_state(prepared.iter().map(|doc| doc.as_ref()))?;
        Ok(prepared.iter().map(|doc| Document::clone(doc)).collect())
    }

    /// Candidates for `query` from at most one index, with expired documents
    /// removed unless `skip_expiry` is set.
    fn get_candidates(
        &self,
        state: &mut DatastoreState,
        query: &Query,
        skip_expiry: bool,
    ) -> NedbResult<Vec<Arc<Document>>> {
        let candidates = state.raw_candidates(query.filter());
        if skip_expiry || state.ttl_indexes.is_empty() {
            return Ok(candidates);
        }

        let now = Utc::now().timestamp_millis();
        let (expired, valid): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|doc| state.is_expired(doc, now));

        for doc in expired {
            let Some(id) = doc.id() else {
                continue;
            };
            let mut filter = Document::new();
            filter.put(DOC_ID, id.clone());
            if let Err(e) = self.remove_locked(state, &Query::new(filter), false) {
                log::error!("Failed to remove expired document {}: {}", id, e);
                return Err(e);
            }
        }
        Ok(valid)
    }

    fn find_locked(
        &self,
        state: &mut DatastoreState,
        query: &Query,
        options: &CursorOptions,
    ) -> NedbResult<Vec<Document>> {
        let candidates = self.get_candidates(state, query, false)?;
        execute_cursor(candidates, query, options, self.config.compare_strings())
    }

    fn update_locked(
        &self,
        state: &mut DatastoreState,
        query: &Query,
        update: &Document,
        options: UpdateOptions,
    ) -> NedbResult<UpdateResult> {
        if options.is_upsert() {
            let existing = self.find_locked(
                state,
                query,
                &CursorOptions {
                    limit: Some(1),
                    ..CursorOptions::default()
                },
            )?;

            if existing.is_empty() {
                let to_insert = match check_object(update) {
                    Ok(()) => update.clone(),
                    Err(_) => modify(&deep_copy_strict(query.filter()), update)?,
                };
                let mut inserted = self.insert_locked(state, vec![to_insert])?;
                return Ok(UpdateResult {
                    num_affected: 1,
                    affected_documents: inserted.pop().map(AffectedDocuments::One),
                    upsert: true,
                });
            }
        }

        let candidates = self.get_candidates(state, query, false)?;
        let mut pairs: Vec<(Arc<Document>, Arc<Document>)> = Vec::new();
        for candidate in candidates {
            if !query.matches(&candidate)? {
                continue;
            }

            let mut modified = modify(&candidate, update)?;
            if self.config.timestamp_data() {
                match candidate.get(CREATED_AT) {
                    Some(created_at) => modified.put(CREATED_AT, created_at.clone()),
                    None => {
                        modified.remove(CREATED_AT);
                    }
                }
                modified.put(UPDATED_AT, now_millis());
            }
            pairs.push((candidate, Arc::new(modified)));

            if !options.is_multi() {
                break;
            }
        }

        state.update_indexes(&pairs)?;
        self.persistence
            .persist_new_state(pairs.iter().map(|(_, new_doc)| new_doc.as_ref()))?;

        let affected_documents = if options.is_return_updated_docs() {
            let mut updated: Vec<Document> = pairs.iter().map(|(_, new_doc)| Document::clone(new_doc)).collect();
            if options.is_multi() {
                Some(AffectedDocuments::Many(updated))
            } else {
                updated.pop().map(AffectedDocuments::One)
            }
        } else {
            None
        };

        Ok(UpdateResult {
            num_affected: pairs.len(),
            affected_documents,
            upsert: false,
        })
    }

    fn remove_locked(&self, state: &mut DatastoreState, query: &Query, multi: bool) -> NedbResult<usize> {
        let candidates = self.get_candidates(state, query, true)?;
        let mut removed: Vec<Arc<Document>> = Vec::new();
        for candidate in candidates {
            if !multi && !removed.is_empty() {
                break;
            }
            if query.matches(&candidate)? {
                removed.push(candidate);
            }
        }

        for doc in &removed {
            state.remove_from_indexes(doc);
        }
        let tombstones: Vec<Document> = removed.iter().filter_map(|doc| doc.id()).map(tombstone).collect();
        self.persistence.persist_new_state(&tombstones)?;
        Ok(removed.len())
    }

    fn ensure_index_locked(&self, state: &mut DatastoreState, options: IndexOptions) -> NedbResult<()> {
        if options.field_name.is_empty() {
            log::error!("Cannot create an index without a fieldName");
            return Err(NedbError::new(
                "Cannot create an index without a fieldName",
                ErrorKind::MissingFieldName,
            ));
        }
        if state.indexes.contains_key(&options.field_name) {
            return Ok(());
        }

        let mut index = Index::new(options.clone());
        index.insert_many(&state.all_documents())?;
        state.indexes.insert(options.field_name.clone(), index);
        if let Some(ttl) = options.expire_after_seconds {
            state.ttl_indexes.insert(options.field_name.clone(), ttl);
        }
        log::debug!("Created index on {}", options.field_name);

        self.persistence.persist_new_state(&[index_created_marker(&options)?])
    }

    fn remove_index_locked(&self, state: &mut DatastoreState, field_name: &str) -> NedbResult<()> {
        if field_name == DOC_ID {
            log::error!("The _id index cannot be removed");
            return Err(NedbError::new("The _id index cannot be removed", ErrorKind::InvalidOperation));
        }

        state.indexes.shift_remove(field_name);
        state.ttl_indexes.remove(field_name);
        self.persistence.persist_new_state(&[index_removed_marker(field_name)])
    }

    fn load_locked(&self, state: &mut DatastoreState) -> NedbResult<()> {
        state.clear_indexes();
        if self.persistence.in_memory_only() {
            return Ok(());
        }

        let content = self.persistence.read_datafile()?;
        for (field_name, options) in content.indexes {
            if field_name == DOC_ID {
                continue;
            }
            match options.expire_after_seconds {
                Some(ttl) => state.ttl_indexes.insert(field_name.clone(), ttl),
                None => state.ttl_indexes.remove(&field_name),
            };
            state.indexes.insert(field_name, Index::new(options));
        }

        let docs: Vec<Arc<Document>> = content.documents.into_iter().map(Arc::new).collect();
        if let Err(e) = state.reset_indexes(&docs) {
            state.clear_indexes();
            return Err(e);
        }

        self.persist_cached_database(state)?;
        log::info!("Loaded {} document(s) into the datastore", docs.len());
        Ok(())
    }

    fn persist_cached_database(&self, state: &DatastoreState) -> NedbResult<()> {
        self.persistence
            .persist_cached_database(&state.all_documents(), &state.index_options())?;

        if let Some(filename) = self.persistence.filename() {
            let event = DatastoreEventInfo::new(
                DatastoreEvents::CompactionDone,
                Some(filename.display().to_string()),
            );
            if let Err(e) = self.event_bus.publish(event) {
                log::warn!("Compaction listener failed: {}", e);
            }
        }
        Ok(())
    }
}

/// In-memory state, only touched from tasks running on the executor.
struct DatastoreState {
    indexes: IndexMap<String, Index>,
    ttl_indexes: HashMap<String, f64>,
}

impl DatastoreState {
    fn new() -> Self {
        let mut indexes = IndexMap::new();
        indexes.insert(DOC_ID.to_string(), Index::new(unique_index(DOC_ID)));
        DatastoreState {
            indexes,
            ttl_indexes: HashMap::new(),
        }
    }

    fn all_documents(&self) -> Vec<Arc<Document>> {
        self.indexes
            .get(DOC_ID)
            .map(Index::get_all)
            .unwrap_or_default()
    }

    fn contains_id(&self, id: &Value) -> bool {
        self.indexes
            .get(DOC_ID)
            .is_some_and(|index| !index.get_matching(id).is_empty())
    }

    fn index_options(&self) -> Vec<IndexOptions> {
        self.indexes
            .iter()
            .filter(|(field_name, _)| field_name.as_str() != DOC_ID)
            .map(|(_, index)| index.options().clone())
            .collect()
    }

    fn clear_indexes(&mut self) {
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    fn reset_indexes(&mut self, docs: &[Arc<Document>]) -> NedbResult<()> {
        for index in self.indexes.values_mut() {
            index.reset(Some(docs))?;
        }
        Ok(())
    }

    /// Adds the documents to every index, or to none of them.
    fn add_to_indexes(&mut self, docs: &[Arc<Document>]) -> NedbResult<()> {
        for position in 0..self.indexes.len() {
            let result = match self.indexes.get_index_mut(position) {
                Some((_, index)) => index.insert_many(docs),
                None => Ok(()),
            };
            if let Err(e) = result {
                for (_, index) in self.indexes.iter_mut().take(position) {
                    index.remove_many(docs);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn remove_from_indexes(&mut self, doc: &Arc<Document>) {
        for index in self.indexes.values_mut() {
            index.remove(doc);
        }
    }

    /// Applies the replacements to every index, or to none of them.
    fn update_indexes(&mut self, pairs: &[(Arc<Document>, Arc<Document>)]) -> NedbResult<()> {
        for position in 0..self.indexes.len() {
            let result = match self.indexes.get_index_mut(position) {
                Some((_, index)) => index.update_many(pairs),
                None => Ok(()),
            };
            if let Err(e) = result {
                for (field_name, index) in self.indexes.iter_mut().take(position) {
                    if let Err(revert_error) = index.revert_update_many(pairs) {
                        log::error!("Failed to revert update on index {}: {}", field_name, revert_error);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Picks one index to narrow the scan: an indexed field compared to a
    /// plain value, else an indexed `$in`, else an indexed range; the last such
    /// field of the query wins. Falls back to every document.
    fn raw_candidates(&self, filter: &Document) -> Vec<Arc<Document>> {
        let equality = filter
            .iter()
            .filter(|(_, value)| value.is_primitive())
            .filter_map(|(field, value)| self.indexes.get(field.as_str()).map(|index| (index, value)))
            .last();
        if let Some((index, value)) = equality {
            return index.get_matching(value);
        }

        let membership = filter
            .iter()
            .filter_map(|(field, value)| {
                let values = value.as_document()?.get("$in")?;
                Some((self.indexes.get(field.as_str())?, values))
            })
            .last();
        if let Some((index, values)) = membership {
            return index.get_matching(values);
        }

        let range = filter
            .iter()
            .filter_map(|(field, value)| {
                let bounds = value.as_document()?;
                if !RANGE_OPERATORS.iter().any(|op| bounds.contains_key(op)) {
                    return None;
                }
                Some((self.indexes.get(field.as_str())?, bounds))
            })
            .last();
        if let Some((index, bounds)) = range {
            return index.get_between_bounds(bounds);
        }

        self.all_documents()
    }

    fn is_expired(&self, doc: &Document, now_millis: i64) -> bool {
        self.ttl_indexes.iter().any(|(field_name, ttl)| {
            match doc.get_dot_value(field_name) {
                Some(Value::Date(date)) => now_millis > date.timestamp_millis() + (ttl * 1000.0) as i64,
                _ => false,
            }
        })
    }
}
