//! Sliding-window error admission.
//!
//! Caps how many errors the handler processes within a rolling window. This
//! is a plain timestamp window, not a token bucket: an error is admitted when
//! fewer than `limit` admitted errors remain inside the window.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Result of offering one error to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Over the limit. `first` is set on the first suppression of a storm.
    Suppressed { first: bool },
}

#[derive(Debug)]
pub struct ErrorWindow {
    limit: usize,
    window: Duration,
    timestamps: VecDeque<Instant>,
    storm_reported: bool,
}

impl ErrorWindow {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            timestamps: VecDeque::with_capacity(limit),
            storm_reported: false,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn admit(&mut self, now: Instant) -> Admission {
        self.prune(now);

        if self.timestamps.len() >= self.limit {
            let first = !self.storm_reported;
            self.storm_reported = true;
            return Admission::Suppressed { first };
        }

        self.storm_reported = false;
        self.timestamps.push_back(now);
        Admission::Admitted
    }

    /// Admitted errors still inside the window.
    pub fn recent(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.timestamps.len()
    }
}
