//! Calculation accounting and profiling
//!
//! Tracks sub-calculations, cache hits and recursion depth so a finished
//! run can report how much work it did.

mod tracker;

pub use tracker::CalcTracker;

use std::time::Duration;

/// Counters collected over one computation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct CalcProfile {
    /// Lattice points whose moments were derived (zero vector excluded)
    pub sub_calculations: usize,
    /// Lookups answered from the memo cache
    pub cache_hits: usize,
    /// Deepest recursion observed; 1 for a fully seeded run
    pub max_depth: usize,
    /// Batches executed by the scheduler
    pub batches: usize,
    /// Number of lattice points
    pub lattice_size: usize,
    /// Wall-clock time of the computation
    pub elapsed: Duration,
}

impl CalcProfile {
    /// Whether the run never recursed past the state being seeded.
    pub fn is_flat(&self) -> bool {
        self.max_depth <= 1
    }

    /// Generate report
    pub fn report(&self) -> String {
        format!(
            "finished with {} sub-calculations and {} cache hits, max recursive depth: {}, batches: {}, time: {:.2}s",
            self.sub_calculations,
            self.cache_hits,
            self.max_depth,
            self.batches,
            self.elapsed.as_secs_f64()
        )
    }
}
