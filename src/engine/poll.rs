//! Fixed-interval polling loop
//!
//! Hosts without their own frame loop drive the scheduler from here.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default tick interval (50 Hz)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Calls a closure every `interval` until it breaks or the loop is stopped
#[derive(Debug, Clone)]
pub struct PollLoop {
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl Default for PollLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl PollLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Flag that ends the loop from another thread once set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Run until `tick` returns `Break` or [`PollLoop::stop`] is called.
    ///
    /// Returns the number of ticks run. A tick that overruns the interval
    /// is followed immediately by the next one.
    pub fn run<F>(&self, mut tick: F) -> u64
    where
        F: FnMut() -> ControlFlow<()>,
    {
        let mut ticks = 0;
        while !self.stop.load(Ordering::Relaxed) {
            let started = Instant::now();
            ticks += 1;
            if tick().is_break() {
                break;
            }
            if let Some(rest) = self.interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_until_break() {
        let poll = PollLoop::new(Duration::from_millis(1));
        let mut count = 0;
        let ticks = poll.run(|| {
            count += 1;
            if count == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(ticks, 5);
        assert_eq!(count, 5);
    }

    #[test]
    fn test_stop_handle_ends_loop() {
        let poll = PollLoop::new(Duration::from_millis(1));
        let handle = poll.stop_handle();
        let ticks = poll.run(|| {
            handle.store(true, Ordering::Relaxed);
            ControlFlow::Continue(())
        });
        assert_eq!(ticks, 1);
    }
}
