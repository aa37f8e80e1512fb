use crate::common::get_current_time_or_zero;
use crate::errors::NedbResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::Debug;
use std::sync::Arc;

/// Event types published by a datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreEvents {
    /// The datafile was rewritten to one line per live document.
    CompactionDone,
}

/// Information about a datastore event.
///
/// # Usage
///
/// ```ignore
/// datastore.subscribe(DatastoreEventListener::new(|event: DatastoreEventInfo| {
///     if event.event_type() == DatastoreEvents::CompactionDone {
///         println!("compacted {:?}", event.filename());
///     }
///     Ok(())
/// }))?;
/// ```
#[derive(Clone)]
pub struct DatastoreEventInfo {
    inner: Arc<DatastoreEventInner>,
}

impl DatastoreEventInfo {
    pub fn new(event_type: DatastoreEvents, filename: Option<String>) -> Self {
        DatastoreEventInfo {
            inner: Arc::new(DatastoreEventInner {
                event_type,
                filename,
                timestamp: get_current_time_or_zero(),
            }),
        }
    }

    pub fn event_type(&self) -> DatastoreEvents {
        self.inner.event_type
    }

    /// Datafile the event relates to; `None` for in-memory datastores.
    pub fn filename(&self) -> Option<&str> {
        self.inner.filename.as_deref()
    }

    /// Milliseconds since the epoch at which the event was created.
    pub fn timestamp(&self) -> u128 {
        self.inner.timestamp
    }
}

impl Debug for DatastoreEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreEventInfo")
            .field("event_type", &self.event_type())
            .field("filename", &self.filename())
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

struct DatastoreEventInner {
    event_type: DatastoreEvents,
    filename: Option<String>,
    timestamp: u128,
}

/// Closure signature of a datastore event handler.
pub trait DatastoreEventCallback: Send + Sync + Fn(DatastoreEventInfo) -> NedbResult<()> {}

impl<F> DatastoreEventCallback for F where F: Send + Sync + Fn(DatastoreEventInfo) -> NedbResult<()> {}

/// Listener for datastore events, registered with `Datastore::subscribe`.
///
/// Handlers run synchronously on the thread that published the event, which
/// for compaction is the datastore's executor thread. A handler must not
/// wait on the datastore it listens to.
#[derive(Clone)]
pub struct DatastoreEventListener {
    on_event: Arc<dyn DatastoreEventCallback>,
}

impl DatastoreEventListener {
    pub fn new(on_event: impl DatastoreEventCallback + 'static) -> Self {
        DatastoreEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<DatastoreEventInfo> for DatastoreEventListener {
    fn handle(&self, event: &Event<DatastoreEventInfo>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for DatastoreEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreEventListener").finish()
    }
}
