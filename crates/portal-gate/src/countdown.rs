//! Cancellable countdown
//!
//! A tokio task that calls back once per tick until the count reaches zero or
//! the callback breaks. Dropping the [`Countdown`] aborts the task, so an
//! owner going away never leaves a timer running.

use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a running countdown
#[derive(Debug)]
pub struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Start counting down from `total`, calling `on_tick` with the remaining count
    ///
    /// The last call receives 0. Must be called inside a tokio runtime.
    pub fn start<F>(total: u32, tick: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u32) -> ControlFlow<()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut remaining = total;
            while remaining > 0 {
                tokio::time::sleep(tick).await;
                remaining -= 1;
                if on_tick(remaining).is_break() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Stop the countdown, no further ticks fire
    #[inline]
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Check if the task has ended
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
