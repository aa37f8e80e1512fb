use crate::common::NEDB_EVENT;
use crate::errors::{ErrorKind, NedbError, NedbResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Synchronous publish/subscribe channel for datastore events.
///
/// Listeners are invoked on the publishing thread. Publishing with no listener
/// registered is a no-op and does not allocate an event.
#[derive(Clone)]
pub struct NedbEventBus<E, L> {
    inner: Arc<NedbEventBusInner<E, L>>,
}

impl<E, L> Default for NedbEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> NedbEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        NedbEventBus {
            inner: Arc::new(NedbEventBusInner::new()),
        }
    }

    pub fn register(&self, listener: L) -> NedbResult<SubscriberRef> {
        self.inner.register(listener)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> NedbResult<()> {
        self.inner.deregister(subscriber)
    }

    pub fn publish(&self, event: E) -> NedbResult<()> {
        self.inner.publish(event)
    }
}

/// Handle returned by a subscription, used to unsubscribe.
pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct NedbEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> NedbEventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        NedbEventBusInner {
            event_bus: EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> NedbResult<SubscriberRef> {
        match self.event_bus.subscribe(NEDB_EVENT, Box::new(listener)) {
            Ok(subscriber) => Ok(SubscriberRef::new(subscriber)),
            Err(e) => Err(Self::nedb_error(e)),
        }
    }

    #[inline]
    fn deregister(&self, subscriber: SubscriberRef) -> NedbResult<()> {
        self.event_bus
            .unsubscribe(NEDB_EVENT, &subscriber.inner)
            .map_err(Self::nedb_error)
    }

    #[inline]
    fn publish(&self, event: E) -> NedbResult<()> {
        let handler_count = match self.event_bus.get_handler_count(NEDB_EVENT) {
            Ok(count) => count,
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::nedb_error(e)),
        };

        if handler_count == 0 {
            return Ok(());
        }

        let basu_event = Event::new(event);
        self.event_bus
            .publish(NEDB_EVENT, &basu_event)
            .map_err(Self::nedb_error)
    }

    fn nedb_error(e: BasuError) -> NedbError {
        match e {
            BasuError::EventTypeNotFOUND => NedbError::new(
                "Event bus error: no listener is registered for datastore events",
                ErrorKind::EventError,
            ),
            BasuError::MutexPoisoned => NedbError::new(
                "Event bus error: internal mutex poisoned",
                ErrorKind::EventError,
            ),
            BasuError::HandlerError(e) => {
                let message = e
                    .source()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| e.to_string());
                NedbError::new(
                    &format!("Event handler error: {}", message),
                    ErrorKind::EventError,
                )
            }
        }
    }
}
