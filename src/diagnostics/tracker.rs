//! Work tracking for one computation

use std::time::Duration;

use super::CalcProfile;

/// Tracks work done while the recursion engine fills the cache
#[derive(Debug, Default)]
pub struct CalcTracker {
    /// Moments derived so far
    sub_calculations: usize,

    /// Cache lookups that hit
    cache_hits: usize,

    /// Current recursion depth
    depth: usize,

    /// Maximum seen
    max_depth: usize,

    /// Scheduler batches started
    batches: usize,
}

impl CalcTracker {
    /// Create new tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a cache miss (one recursion level)
    pub fn push_frame(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    /// Leave a recursion level
    pub fn pop_frame(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current recursion depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Count a derived lattice point
    pub fn record_calculation(&mut self) {
        self.sub_calculations += 1;
    }

    /// Count a cache hit
    pub fn record_hit(&mut self) {
        self.cache_hits += 1;
    }

    /// Count a scheduler batch
    pub fn record_batch(&mut self) {
        self.batches += 1;
    }

    /// Moments derived so far
    pub fn sub_calculations(&self) -> usize {
        self.sub_calculations
    }

    /// Cache hits so far
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// Deepest recursion so far
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Freeze the counters into a profile.
    pub fn snapshot(&self, lattice_size: usize, elapsed: Duration) -> CalcProfile {
        CalcProfile {
            sub_calculations: self.sub_calculations,
            cache_hits: self.cache_hits,
            max_depth: self.max_depth,
            batches: self.batches,
            lattice_size,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_maximum() {
        let mut tracker = CalcTracker::new();
        tracker.push_frame();
        tracker.push_frame();
        tracker.pop_frame();
        tracker.push_frame();
        tracker.pop_frame();
        tracker.pop_frame();

        assert_eq!(tracker.depth(), 0);
        assert_eq!(tracker.max_depth(), 2);
        tracker.pop_frame();
        assert_eq!(tracker.depth(), 0);
    }
}
