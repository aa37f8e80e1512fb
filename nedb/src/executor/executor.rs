use crate::errors::{ErrorKind, NedbError, NedbResult};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single lane FIFO queue running every datastore operation on one worker thread.
///
/// The executor starts in the buffering phase: tasks pushed without
/// `force_queuing` are held back until [`Executor::process_buffer`] moves them,
/// in order, onto the live queue. From then on every task runs immediately
/// after the ones queued before it. A failing or panicking task only affects
/// its own [`TaskHandle`].
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    state: Mutex<ExecutorState>,
    sender: Sender<Task>,
    worker: ThreadId,
}

struct ExecutorState {
    ready: bool,
    buffer: Vec<Task>,
}

impl Executor {
    pub fn new() -> NedbResult<Executor> {
        let (sender, receiver) = unbounded::<Task>();
        let worker = thread::Builder::new()
            .name("nedb-executor".to_string())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    task();
                }
                log::debug!("Executor queue closed, worker exiting");
            })?;

        Ok(Executor {
            inner: Arc::new(ExecutorInner {
                state: Mutex::new(ExecutorState {
                    ready: false,
                    buffer: Vec::new(),
                }),
                sender,
                worker: worker.thread().id(),
            }),
        })
    }

    /// Queues a task. `force_queuing` skips the buffer even before the executor is ready.
    pub fn push<T, F>(&self, task: F, force_queuing: bool) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> NedbResult<T> + Send + 'static,
    {
        let (reply, receiver) = bounded::<NedbResult<T>>(1);
        let job: Task = Box::new(move || {
            let result = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("Datastore task panicked: {}", message);
                    Err(NedbError::new(
                        &format!("Datastore task panicked: {}", message),
                        ErrorKind::InternalError,
                    ))
                }
            };
            // the caller may have dropped its handle
            let _ = reply.send(result);
        });

        let mut state = self.inner.state.lock();
        if !state.ready && !force_queuing {
            state.buffer.push(job);
        } else if self.inner.sender.send(job).is_err() {
            log::error!("Executor worker is gone, task dropped");
        }

        TaskHandle {
            receiver,
            worker: self.inner.worker,
        }
    }

    /// Leaves the buffering phase, queueing every buffered task in its original order.
    pub fn process_buffer(&self) {
        let mut state = self.inner.state.lock();
        state.ready = true;
        let buffered = std::mem::take(&mut state.buffer);
        if !buffered.is_empty() {
            log::debug!("Queueing {} buffered task(s)", buffered.len());
        }
        for job in buffered {
            if self.inner.sender.send(job).is_err() {
                log::error!("Executor worker is gone, buffered task dropped");
            }
        }
    }

    /// Returns to the buffering phase and discards the buffered tasks.
    ///
    /// Handles of discarded tasks resolve to an `InvalidOperation` error.
    pub fn reset_buffer(&self) -> usize {
        let mut state = self.inner.state.lock();
        state.ready = false;
        let discarded = state.buffer.len();
        state.buffer.clear();
        if discarded > 0 {
            log::warn!("Discarded {} buffered task(s)", discarded);
        }
        discarded
    }

    /// Blocks until every task already on the live queue has run.
    pub fn drain(&self) -> NedbResult<()> {
        self.push(|| Ok(()), true).wait()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().ready
    }

    pub fn buffered(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.inner.worker
    }
}

/// Pending result of a queued task.
pub struct TaskHandle<T> {
    receiver: Receiver<NedbResult<T>>,
    worker: ThreadId,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has run and returns its result.
    ///
    /// Fails with `InvalidOperation` when called from a task running on the
    /// executor itself, which would otherwise never return.
    pub fn wait(self) -> NedbResult<T> {
        if thread::current().id() == self.worker {
            log::error!("Cannot wait for a queued task from inside the executor");
            return Err(NedbError::new(
                "Cannot wait for a queued task from inside the executor",
                ErrorKind::InvalidOperation,
            ));
        }

        match self.receiver.recv() {
            Ok(result) => result,
            Err(_) => Err(discarded()),
        }
    }

    /// Returns the result if the task has already run.
    pub fn try_wait(&self) -> Option<NedbResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(discarded())),
        }
    }
}

fn discarded() -> NedbError {
    log::error!("Task was discarded before it could run");
    NedbError::new(
        "Task was discarded before it could run",
        ErrorKind::InvalidOperation,
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
