//! Holds new-file signals until the file stops changing.
//!
//! A create notification usually arrives while the file is still being
//! written. Signals wait here until no write has been seen on their path
//! for the settle duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::pairing::Signal;

#[derive(Debug)]
pub struct SettleQueue {
    /// Pending signals: path -> (signal, last activity).
    pending: HashMap<PathBuf, (Signal, Instant)>,
    duration: Duration,
}

impl SettleQueue {
    pub fn new(settle_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(settle_ms),
        }
    }

    /// Queue a signal, resetting the timer if its path is already queued.
    pub fn record(&mut self, signal: Signal) {
        self.pending
            .insert(signal.path.clone(), (signal, Instant::now()));
    }

    /// Reset the timer for a queued path. Returns `false` if not queued.
    pub fn touch(&mut self, path: &Path) -> bool {
        match self.pending.get_mut(path) {
            Some((_, last)) => {
                *last = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Take every signal whose path has been quiet for the settle duration.
    pub fn take_ready(&mut self) -> Vec<Signal> {
        let now = Instant::now();
        let mut ready = Vec::new();
        let duration = self.duration;

        self.pending.retain(|_, (signal, last)| {
            if now.duration_since(*last) >= duration {
                ready.push(signal.clone());
                false
            } else {
                true
            }
        });

        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
