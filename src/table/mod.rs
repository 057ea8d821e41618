//! Drop tables: weighted distributions over reward bundles.
//!
//! A [`DropTable`] stores one dense bundle per outcome, indexed by a reward
//! id assigned on first appearance of each [`RewardKey`]. Probability not
//! assigned to any entry belongs to the implicit null outcome.

mod combine;
mod counts;
mod dense;
mod filter;

pub use combine::combine;
pub use counts::{RewardCounts, RewardKey};
pub use dense::DropTable;
pub use filter::FilteredTable;

use thiserror::Error;

/// Overshoot of the total probability above 1 that is still treated as
/// floating-point rounding and corrected by renormalizing.
pub const PROBABILITY_TOLERANCE: f64 = 0.01;

/// Errors raised while building or querying a drop table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    /// Entry probabilities sum to more than `1 + PROBABILITY_TOLERANCE`.
    #[error("total probability exceeds 1: {total:.4}")]
    ProbabilitySumInvalid {
        /// Total probability the rejected insertion would have produced.
        total: f64,
    },

    /// Probability is negative or non-finite.
    #[error("invalid outcome probability {0}")]
    InvalidProbability(f64),

    /// Strict lookup of a reward key that no entry grants.
    #[error("reward '{0}' not found in drop table")]
    UnknownReward(RewardKey),
}
