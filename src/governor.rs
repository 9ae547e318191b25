//! Sliding-window admission control for outbound upstream calls.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Bounds the number of upstream calls admitted within a rolling time window.
///
/// The governor keeps the admission timestamps of the current window in order.
/// A call is admitted when, after evicting timestamps older than the window,
/// fewer than `ceiling` remain; denied calls are not recorded and so do not
/// extend the congestion. Denial is a normal outcome, not an error.
pub struct RateGovernor {
    window: Duration,
    ceiling: usize,
    hits: VecDeque<Instant>,
}

impl RateGovernor {
    pub fn new(window: Duration, ceiling: usize) -> Self {
        Self {
            window,
            ceiling,
            hits: VecDeque::with_capacity(ceiling),
        }
    }

    /// Returns `true` and records the call if it fits the current window.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&mut self, now: Instant) -> bool {
        // An entry exactly one window old still counts against the ceiling.
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) > self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
        if self.hits.len() >= self.ceiling {
            return false;
        }
        self.hits.push_back(now);
        true
    }
}
