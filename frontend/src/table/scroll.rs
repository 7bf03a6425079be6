//! Infinite-scroll bookkeeping.
//!
//! The row `lead` places before the end of the loaded list is the sentinel.
//! Each rendered row gets a [`RowRef`]; when the UI reports that the
//! sentinel is visible past the threshold, the next page is due.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRef {
    pub index: usize,
    pub is_sentinel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTracker {
    lead: usize,
    threshold: f64,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(10, 0.25)
    }
}

impl ScrollTracker {
    pub fn new(lead: usize, threshold: f64) -> Self {
        Self {
            lead,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Index of the sentinel row of a list of `len` rows. Lists shorter than
    /// the lead use their first row.
    pub fn sentinel_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| len.saturating_sub(self.lead + 1))
    }

    pub fn assign_ref(&self, index: usize, len: usize) -> RowRef {
        RowRef {
            index,
            is_sentinel: self.sentinel_index(len) == Some(index),
        }
    }

    /// Whether a visibility report for `row` should trigger the next page.
    /// The sentinel is re-checked against the current length so refs handed
    /// out before the list grew do not fire.
    pub fn should_load(&self, row: RowRef, len: usize, visible_ratio: f64, can_load_more: bool) -> bool {
        can_load_more
            && self.sentinel_index(len) == Some(row.index)
            && visible_ratio >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_lead_rows_before_the_end() {
        let tracker = ScrollTracker::default();
        assert_eq!(tracker.sentinel_index(50), Some(39));
        assert_eq!(tracker.sentinel_index(5), Some(0));
        assert_eq!(tracker.sentinel_index(0), None);
        assert!(tracker.assign_ref(39, 50).is_sentinel);
        assert!(!tracker.assign_ref(40, 50).is_sentinel);
    }

    #[test]
    fn test_should_load() {
        let tracker = ScrollTracker::default();
        let sentinel = tracker.assign_ref(39, 50);
        assert!(tracker.should_load(sentinel, 50, 0.25, true));
        assert!(!tracker.should_load(sentinel, 50, 0.2, true));
        assert!(!tracker.should_load(sentinel, 50, 1.0, false));
        // The list grew to 100 rows; row 39 is no longer the sentinel.
        assert!(!tracker.should_load(sentinel, 100, 1.0, true));
    }
}
