//! ---
//! pw_section: "01-core-functionality"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Primary watch pipeline and generation lifecycle."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
//! Per-path coalescing of change notifications.
//!
//! A path becomes ready once no further notification for it has arrived for
//! the whole window. Bursts of writes to one file then produce a single
//! generation attempt.
use std::path::PathBuf;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: IndexMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: IndexMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// A zero window disables coalescing.
    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    /// Record a notification for `path`, restarting its window.
    pub fn record(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path, now);
    }

    /// Remove and return paths whose window has elapsed, oldest first.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let window = self.window;
        let mut ready = Vec::new();
        self.pending.retain(|path, seen| {
            if now.saturating_duration_since(*seen) >= window {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
