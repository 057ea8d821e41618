//! # Multi-reward negative binomial statistics
//!
//! Computes the expected number of trials, and its variance, until a set of
//! required amounts of several reward types has been collected from
//! repeated independent trials of a weighted drop table.
//!
//! ## Core Algorithm
//!
//! 1. **Dense drop table**: outcomes as dense reward bundles plus an
//!    implicit null outcome
//! 2. **Recursion**: total probability for the mean, total variance for the
//!    variance, negative binomial closed form as base case
//! 3. **Memoization**: one cache cell per point of the requirement lattice
//! 4. **Batched seeding**: lattice points visited bottom-up in odometer
//!    order, with a yield point between batches
//!
//! ## Usage Example
//!
//! ```
//! use dropstat::{calculate_stats, DropTable, RewardCounts};
//!
//! let table = DropTable::independent([("A", 0.1), ("B", 0.2), ("C", 0.3)])?;
//! let required = RewardCounts::new().with("A", 1).with("B", 2).with("C", 3);
//!
//! let mut mean = 0.0;
//! calculate_stats(&table, Some(&required), |_| {}, |stats| mean = stats.expected)?;
//! assert!((mean - 16.56).abs() < 0.01);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

// Core modules - each implements a key component of the algorithm
pub mod table;       // Drop tables and reward counts
pub mod lattice;     // Requirement vectors and lattice indexing
pub mod cache;       // Memoized moments per lattice point
pub mod engine;      // Expected value / variance recursion
pub mod scheduler;   // Batched lattice seeding
pub mod ledger;      // Streaming progress tracking
pub mod diagnostics; // Work accounting

// Re-exports for convenience
pub use cache::Moments;
pub use diagnostics::CalcProfile;
pub use lattice::RequirementVector;
pub use scheduler::{BatchScheduler, BatchStatus, CancellationToken, NoYield, ThreadYield, YieldPoint};
pub use table::{combine, DropTable, RewardCounts, RewardKey, TableError};

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Lattice points seeded per batch before yielding.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

/// Configuration parameters for a computation
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Lattice points seeded between yield points
    pub batch_size: usize,

    /// Wall-clock budget checked at every batch boundary
    pub time_budget: Option<Duration>,
}

impl StatsConfig {
    /// Set the batch size (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Abort computations running longer than `budget`.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            time_budget: None,
        }
    }
}

/// Result of a computation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct DropStats {
    /// Expected number of trials
    pub expected: f64,

    /// Variance of the number of trials
    pub variance: f64,

    /// Work counters of the run
    pub profile: CalcProfile,
}

impl DropStats {
    /// Statistics of a requirement that is already met.
    pub fn zero() -> Self {
        Self {
            expected: 0.0,
            variance: 0.0,
            profile: CalcProfile::default(),
        }
    }

    /// Standard deviation of the number of trials
    pub fn std_dev(&self) -> f64 {
        self.moments().std_dev()
    }

    /// Mean and variance as a pair
    pub fn moments(&self) -> Moments {
        Moments {
            expected: self.expected,
            variance: self.variance,
        }
    }
}

impl fmt::Display for DropStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean: {:.2}", self.expected)?;
        writeln!(f, "Variance: {:.2}", self.variance)?;
        write!(f, "Std Dev: {:.2}", self.std_dev())
    }
}

/// Errors that can occur during a computation
#[derive(Error, Debug)]
pub enum StatsError {
    /// Invalid drop table or requirement lookup
    #[error(transparent)]
    Table(#[from] TableError),

    /// Requirement vector width differs from the table's reward count
    #[error("requirement has {actual} rewards, table has {expected}")]
    DimensionMismatch {
        /// Rewards known to the table
        expected: usize,
        /// Width of the supplied requirement
        actual: usize,
    },

    /// The requirement lattice has more points than can be addressed
    #[error("requirement lattice for {requirement:?} is too large")]
    LatticeTooLarge {
        /// Requirement that was rejected
        requirement: Vec<u32>,
    },

    /// The computation was cancelled at a batch boundary
    #[error("calculation cancelled")]
    Cancelled,

    /// The wall-clock budget ran out at a batch boundary
    #[error("time budget of {budget:?} exceeded after {elapsed:?}")]
    TimeBudgetExceeded {
        /// Time spent before stopping
        elapsed: Duration,
        /// Configured budget
        budget: Duration,
    },
}

/// Main computation orchestrator
///
/// Resolves requirements against a table and drives the batch scheduler.
#[derive(Debug)]
pub struct StatsCalculator<'t> {
    table: &'t DropTable,
    config: StatsConfig,
    cancel: CancellationToken,
}

impl<'t> StatsCalculator<'t> {
    /// Create new calculator
    pub fn new(table: &'t DropTable, config: StatsConfig) -> Self {
        Self {
            table,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` for cancellation requests.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this calculator's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dense requirement; `None` asks for one of every reward.
    pub fn requirement(&self, required: Option<&RewardCounts>) -> Result<RequirementVector, StatsError> {
        match required {
            Some(required) => Ok(self.table.requirement_vector(required)?),
            None => Ok(self.table.default_requirement()),
        }
    }

    /// Scheduler for step-by-step execution inside a host event loop.
    pub fn scheduler(&self, requirement: &RequirementVector) -> Result<BatchScheduler<'t>, StatsError> {
        BatchScheduler::new(self.table, requirement, &self.config)
    }

    /// Run to completion, yielding the thread between batches.
    pub fn run(
        &self,
        required: Option<&RewardCounts>,
        progress: impl FnMut(f64),
        result: impl FnOnce(DropStats),
    ) -> Result<(), StatsError> {
        self.run_with(required, &mut ThreadYield, progress, result)
    }

    /// Run to completion with a caller-supplied yield point.
    ///
    /// `result` is called exactly once on success and never on error.
    pub fn run_with<Y: YieldPoint + ?Sized>(
        &self,
        required: Option<&RewardCounts>,
        yielder: &mut Y,
        mut progress: impl FnMut(f64),
        result: impl FnOnce(DropStats),
    ) -> Result<(), StatsError> {
        let requirement = self.requirement(required)?;

        if requirement.is_zero() {
            progress(0.0);
            progress(1.0);
            result(DropStats::zero());
            return Ok(());
        }

        let mut scheduler = self.scheduler(&requirement)?;
        let stats = scheduler.run(yielder, &mut progress, &self.cancel)?;
        result(stats);
        Ok(())
    }
}

/// Compute statistics with the default configuration.
///
/// `required` of `None` asks for one of every reward in the table.
pub fn calculate_stats(
    table: &DropTable,
    required: Option<&RewardCounts>,
    progress: impl FnMut(f64),
    result: impl FnOnce(DropStats),
) -> Result<(), StatsError> {
    StatsCalculator::new(table, StatsConfig::default()).run(required, progress, result)
}
