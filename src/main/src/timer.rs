use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, tick, Sender};
use log::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Callback = Arc<Mutex<Box<dyn FnMut() + Send>>>;

/// Factory for recurring timers, one worker thread per armed timer.
#[derive(Debug, Default)]
pub struct TimerService {
    created: Mutex<u32>,
}

impl TimerService {
    pub fn new() -> Result<TimerService> {
        Ok(TimerService::default())
    }

    pub fn timer<F>(&self, callback: F) -> Result<Timer>
    where
        F: FnMut() + Send + 'static,
    {
        let mut created = self.created.lock();
        *created += 1;
        Ok(Timer {
            name: format!("timer-{}", *created),
            callback: Arc::new(Mutex::new(Box::new(callback))),
            cancel: Mutex::new(None),
        })
    }
}

/// A recurring callback. Dropping the handle cancels it.
pub struct Timer {
    name: String,
    callback: Callback,
    // Dropping the sender wakes the worker and ends it
    cancel: Mutex<Option<Sender<()>>>,
}

impl Timer {
    /// Run the callback every `period`, replacing any earlier schedule.
    pub fn every(&self, period: Duration) -> Result<()> {
        let mut cancel = self.cancel.lock();
        cancel.take();

        let (sender, cancelled) = bounded::<()>(0);
        let ticks = tick(period);
        let callback = self.callback.clone();
        thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || loop {
                select! {
                    recv(ticks) -> _ => {
                        let mut callback = callback.lock();
                        callback();
                    }
                    recv(cancelled) -> _ => break,
                }
            })
            .with_context(|| format!("Failed to spawn {}", self.name))?;

        debug!("Armed {} every {:?}", self.name, period);
        *cancel = Some(sender);
        Ok(())
    }

    /// Stop the schedule. Returns whether the timer was armed.
    pub fn cancel(&self) -> bool {
        let was_armed = self.cancel.lock().take().is_some();
        if was_armed {
            debug!("Cancelled {}", self.name);
        }
        was_armed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
