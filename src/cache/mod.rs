//! Memoization cache over the requirement lattice
//!
//! One cell per lattice point, addressed by flat index. A populated bit
//! per cell separates "not computed yet" from a stored pair.

use std::collections::TryReserveError;

use bitvec::prelude::*;

/// Expected trial count and its variance for one requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct Moments {
    /// Expected number of trials
    pub expected: f64,
    /// Variance of the number of trials
    pub variance: f64,
}

impl Moments {
    /// Nothing left to collect.
    pub const ZERO: Self = Self {
        expected: 0.0,
        variance: 0.0,
    };

    /// Negative binomial moments: trials until `successes` successes of
    /// probability `p`.
    pub fn negative_binomial(p: f64, successes: u32) -> Self {
        let n = successes as f64;
        Self {
            expected: n / p,
            variance: n * (1.0 - p) / (p * p),
        }
    }

    /// Standard deviation (rounding noise below zero is clamped).
    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}

/// Dense memo table with one optional [`Moments`] per lattice point.
#[derive(Debug)]
pub struct MemoCache {
    cells: Vec<Moments>,
    populated: BitVec,
}

impl MemoCache {
    /// Empty cache for `size` lattice points.
    ///
    /// Fails instead of aborting when the cells cannot be allocated.
    pub fn new(size: usize) -> Result<Self, TryReserveError> {
        let mut cells = Vec::new();
        cells.try_reserve_exact(size)?;
        cells.resize(size, Moments::ZERO);

        let word_count = size.div_ceil(usize::BITS as usize);
        let mut words: Vec<usize> = Vec::new();
        words.try_reserve_exact(word_count)?;
        words.resize(word_count, 0);
        let mut populated = BitVec::from_vec(words);
        populated.truncate(size);

        Ok(Self { cells, populated })
    }

    /// Stored pair for `index`, if computed.
    pub fn get(&self, index: usize) -> Option<Moments> {
        self.populated[index].then(|| self.cells[index])
    }

    /// Store the pair for `index`. A populated cell is never overwritten.
    pub fn insert(&mut self, index: usize, moments: Moments) {
        if self.populated[index] {
            debug_assert!(false, "cache cell {index} populated twice");
            return;
        }
        self.cells[index] = moments;
        self.populated.set(index, true);
    }

    /// Whether `index` holds a pair.
    pub fn is_populated(&self, index: usize) -> bool {
        self.populated[index]
    }

    /// Number of populated cells.
    pub fn populated_count(&self) -> usize {
        self.populated.count_ones()
    }

}
