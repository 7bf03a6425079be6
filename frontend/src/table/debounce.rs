//! Quiet-period coalescing of rapid edits (search keystrokes, filter rows).
//!
//! Every edit pushes the deadline back by the delay; the accumulated value
//! is released once the deadline passes without further edits. Time comes
//! from `tokio::time`, so paused-clock tests drive it deterministically.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T: Default> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Fold an edit into the pending value and restart the quiet period.
    pub fn update(&mut self, edit: impl FnOnce(&mut T)) {
        let mut value = self.pending.take().map(|(v, _)| v).unwrap_or_default();
        edit(&mut value);
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the pending value if its quiet period is over.
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Release the pending value regardless of the deadline.
    pub fn take_now(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
