//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciliations. The sequence grows more slowly
//! than exponential backoff: with the defaults it runs 5s, 5s, 10s, 15s,
//! 25s, 40s, 65s, ... capped at 5 minutes.
//!
//! The reconciler itself never retries. The watch loop asks the
//! [`BackoffTracker`] for the next delay of a failing cluster and resets it
//! once that cluster reconciles cleanly.

use cluster_store::ObjectKey;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const DEFAULT_MIN_SECONDS: u64 = 5;
const DEFAULT_MAX_SECONDS: u64 = 300;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting from `min_seconds`
/// twice and capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_seconds: u64,
    prev_seconds: u64,
    current_seconds: u64,
    max_seconds: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;
        let next = self.prev_seconds + self.current_seconds;
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next, self.max_seconds);
        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SECONDS, DEFAULT_MAX_SECONDS)
    }
}

/// Per-cluster backoff state
#[derive(Debug, Default)]
pub struct BackoffTracker {
    states: Mutex<HashMap<ObjectKey, FibonacciBackoff>>,
}

impl BackoffTracker {
    /// Delay before the next attempt for `key`, advancing its sequence
    pub fn next_for(&self, key: &ObjectKey) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.entry(key.clone()).or_default().next_backoff()
    }

    /// Forget the failure history of `key`
    pub fn reset(&self, key: &ObjectKey) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(key);
    }
}
