//! Batched lattice enumeration
//!
//! Seeds the memo cache bottom-up: lattice points are visited in odometer
//! order, which is ascending flat-index order, and every dependency of a
//! point has a strictly smaller index. Each seeded point therefore resolves
//! its children from the cache and recursion never goes deeper than one
//! level. Work is cut into fixed-size batches with a yield point between
//! them.

mod yield_point;

pub use yield_point::{CancellationToken, NoYield, ThreadYield, YieldPoint};

use std::time::{Duration, Instant};

use crate::{
    engine::RecursionEngine,
    lattice::{Lattice, Odometer, RequirementVector},
    ledger::ProgressLedger,
    table::DropTable,
    DropStats, StatsConfig, StatsError,
};

/// Outcome of one batch.
#[derive(Debug, Clone)]
pub enum BatchStatus {
    /// More lattice points remain; progress so far in `[0, 1)`.
    Pending {
        /// Fraction of lattice points seeded
        progress: f64,
    },
    /// Every point is seeded; statistics for the root requirement.
    Complete(DropStats),
}

/// Drives a [`RecursionEngine`] over the whole lattice in batches.
#[derive(Debug)]
pub struct BatchScheduler<'t> {
    engine: RecursionEngine<'t>,
    odometer: Odometer,
    ledger: ProgressLedger,
    batch_size: usize,
    time_budget: Option<Duration>,
    root: usize,
    started: Instant,
    outcome: Option<DropStats>,
}

impl<'t> BatchScheduler<'t> {
    /// Prepare a computation of `requirement` over `table`.
    ///
    /// Fails before any work is done when the requirement does not match
    /// the table or spans a lattice too large to address and cache. Every
    /// reward id of a table is granted by some entry, so each state with a
    /// nonzero requirement has live entries.
    pub fn new(
        table: &'t DropTable,
        requirement: &RequirementVector,
        config: &StatsConfig,
    ) -> Result<Self, StatsError> {
        if requirement.len() != table.num_rewards() {
            return Err(StatsError::DimensionMismatch {
                expected: table.num_rewards(),
                actual: requirement.len(),
            });
        }
        let too_large = || StatsError::LatticeTooLarge {
            requirement: requirement.to_vec(),
        };
        let lattice = Lattice::new(requirement).ok_or_else(too_large)?;

        tracing::debug!(
            lattice_size = lattice.size(),
            batch_size = config.batch_size,
            "prepared lattice"
        );

        let odometer = Odometer::new(lattice.bounds());
        let ledger = ProgressLedger::new(lattice.size());
        let root = lattice.root_index();
        let engine = RecursionEngine::new(table, lattice).map_err(|err| {
            tracing::warn!(%err, "memo cache allocation failed");
            too_large()
        })?;

        Ok(Self {
            odometer,
            ledger,
            root,
            engine,
            batch_size: config.batch_size.max(1),
            time_budget: config.time_budget,
            started: Instant::now(),
            outcome: None,
        })
    }

    /// Seed up to one batch of lattice points.
    pub fn run_batch(&mut self) -> BatchStatus {
        if let Some(stats) = &self.outcome {
            return BatchStatus::Complete(stats.clone());
        }

        self.engine.tracker_mut().record_batch();
        for _ in 0..self.batch_size {
            let index = match self.odometer.advance() {
                Some(point) => self.engine.lattice().index_of(point),
                None => return BatchStatus::Complete(self.finish()),
            };
            debug_assert_eq!(index, self.ledger.completed());
            self.engine.moments(index);
            self.ledger.mark_complete();
        }

        // A batch that ends exactly on the last point completes on the next
        // call, after the odometer reports the overflow.
        let progress = self.ledger.report().min(self.pending_ceiling());
        tracing::debug!(
            seeded = self.ledger.completed(),
            total = self.ledger.total(),
            "batch finished"
        );
        BatchStatus::Pending { progress }
    }

    /// Run every batch, yielding in between, and return the root statistics.
    ///
    /// `progress` is called with 0 first, once per batch boundary, and with
    /// 1 on success. Cancellation and the time budget are checked before
    /// each batch; a stopped run returns an error and no statistics.
    pub fn run<Y: YieldPoint + ?Sized>(
        &mut self,
        yielder: &mut Y,
        progress: &mut dyn FnMut(f64),
        cancel: &CancellationToken,
    ) -> Result<DropStats, StatsError> {
        progress(0.0);
        loop {
            if cancel.is_cancelled() {
                tracing::info!(seeded = self.ledger.completed(), "calculation cancelled");
                return Err(StatsError::Cancelled);
            }
            if let Some(budget) = self.time_budget {
                let elapsed = self.started.elapsed();
                if elapsed > budget {
                    return Err(StatsError::TimeBudgetExceeded { elapsed, budget });
                }
            }

            match self.run_batch() {
                BatchStatus::Pending { progress: fraction } => {
                    progress(fraction);
                    yielder.yield_now();
                }
                BatchStatus::Complete(stats) => {
                    progress(1.0);
                    return Ok(stats);
                }
            }
        }
    }

    fn finish(&mut self) -> DropStats {
        let moments = self.engine.moments(self.root);
        self.ledger.finish();

        let profile = self
            .engine
            .tracker()
            .snapshot(self.engine.lattice().size(), self.started.elapsed());
        if !profile.is_flat() {
            tracing::warn!(max_depth = profile.max_depth, "seeded run recursed deeper than one level");
        }
        tracing::info!("{}", profile.report());

        let stats = DropStats {
            expected: moments.expected,
            variance: moments.variance,
            profile,
        };
        self.outcome = Some(stats.clone());
        stats
    }

    /// Largest fraction reported while the run is still pending.
    fn pending_ceiling(&self) -> f64 {
        let total = self.ledger.total() as f64;
        (total - 0.5) / total
    }

    /// Whether the root statistics are available.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Fraction of lattice points seeded so far.
    pub fn progress(&self) -> f64 {
        self.ledger.completed() as f64 / self.ledger.total() as f64
    }

    /// The engine, for inspecting the cache and counters.
    pub fn engine(&self) -> &RecursionEngine<'t> {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler_for<'t>(table: &'t DropTable, root: Vec<u32>, batch_size: usize) -> BatchScheduler<'t> {
        let config = StatsConfig::default().with_batch_size(batch_size);
        BatchScheduler::new(table, &RequirementVector::new(root), &config).unwrap()
    }

    #[test]
    fn batches_cover_the_lattice() {
        let table = DropTable::independent([("A", 0.2), ("B", 0.3)]).unwrap();
        let mut scheduler = scheduler_for(&table, vec![3, 2], 5);

        let mut pending = 0;
        let stats = loop {
            match scheduler.run_batch() {
                BatchStatus::Pending { progress } => {
                    assert!(progress < 1.0);
                    pending += 1;
                }
                BatchStatus::Complete(stats) => break stats,
            }
        };

        // 12 points in batches of 5: two full batches, then the remainder.
        assert_eq!(pending, 2);
        assert_eq!(stats.profile.batches, 3);
        assert_eq!(stats.profile.lattice_size, 12);
        assert_eq!(stats.profile.max_depth, 1);
        assert_eq!(stats.profile.sub_calculations, 11);
        assert!(scheduler.is_complete());
    }

    #[test]
    fn completion_is_sticky() {
        let table = DropTable::independent([("A", 0.5)]).unwrap();
        let mut scheduler = scheduler_for(&table, vec![2], 100);

        let first = match scheduler.run_batch() {
            BatchStatus::Complete(stats) => stats,
            other => panic!("expected completion, got {other:?}"),
        };
        match scheduler.run_batch() {
            BatchStatus::Complete(stats) => assert_eq!(stats.expected, first.expected),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn unallocatable_lattice_is_rejected() {
        let table = DropTable::independent([("A", 0.5), ("B", 0.5)]).unwrap();
        let config = StatsConfig::default();
        // 2^31 * 2^30 points fit in usize, but not their cache cells.
        let root = RequirementVector::new(vec![(1 << 31) - 1, (1 << 30) - 1]);
        let err = BatchScheduler::new(&table, &root, &config).unwrap_err();
        assert!(matches!(err, StatsError::LatticeTooLarge { .. }), "{err:?}");
    }

    #[test]
    fn mismatched_requirement_is_rejected() {
        let table = DropTable::independent([("A", 0.5)]).unwrap();
        let config = StatsConfig::default();
        let err = BatchScheduler::new(&table, &RequirementVector::new(vec![1, 1]), &config).unwrap_err();
        assert!(matches!(err, StatsError::DimensionMismatch { expected: 1, actual: 2 }));
    }
}
