use parking_lot::Mutex;
use std::time::Duration;
use timer::{Guard, Timer};

/// Runs repeating background jobs on a dedicated timer thread.
///
/// Every scheduled job is kept alive by its [`Guard`]; dropping the guards (through
/// [`Scheduler::stop`] or by dropping the scheduler) cancels the jobs.
pub(crate) struct Scheduler {
    timer: Timer,
    guards: Mutex<Vec<Guard>>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler {
            timer: Timer::new(),
            guards: Mutex::from(Vec::with_capacity(1)),
        }
    }

    #[inline]
    pub fn schedule<F>(&self, interval: Duration, f: F)
    where
        F: 'static + FnMut() + Send,
    {
        match chrono::Duration::from_std(interval) {
            Ok(chrono_duration) => {
                let guard = self.timer.schedule_repeating(chrono_duration, f);
                self.guards.lock().push(guard);
            }
            Err(e) => {
                log::error!(
                    "Failed to convert interval to chrono::Duration: {}, skipping task scheduling",
                    e
                );
            }
        }
    }

    #[inline]
    pub fn stop(&self) {
        self.guards.lock().clear();
    }

    #[inline]
    pub fn has_tasks(&self) -> bool {
        !self.guards.lock().is_empty()
    }
}
