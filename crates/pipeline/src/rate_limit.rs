//! Sliding-window limiter on job starts.
//!
//! At most `max_starts` jobs may start within any `window`-long interval.
//! The limiter never rejects work: the worker asks how long to wait, sleeps,
//! and then starts the next job in FIFO order.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_starts: usize,
    window: Duration,
    starts: VecDeque<Instant>,
}

impl SlidingWindowLimiter {
    /// `max_starts` is raised to at least 1.
    pub fn new(max_starts: usize, window: Duration) -> Self {
        Self {
            max_starts: max_starts.max(1),
            window,
            starts: VecDeque::new(),
        }
    }

    /// Time to wait at `now` before another start is allowed, or `None` if a
    /// start is allowed immediately.
    pub fn delay_at(&mut self, now: Instant) -> Option<Duration> {
        self.evict(now);
        if self.starts.len() < self.max_starts {
            return None;
        }
        self.starts
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .filter(|wait| !wait.is_zero())
    }

    /// Record a job start at `now`.
    pub fn record(&mut self, now: Instant) {
        self.evict(now);
        self.starts.push_back(now);
    }

    /// Starts currently inside the window.
    pub fn in_window(&mut self, now: Instant) -> usize {
        self.evict(now);
        self.starts.len()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.starts.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.starts.pop_front();
            } else {
                break;
            }
        }
    }
}
