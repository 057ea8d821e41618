//! Dense drop table representation
//!
//! Layout: (num entries) x (num rewards) grid of granted amounts, one
//! probability and one bundle total per entry. The null outcome is not
//! stored as an entry; its probability is tracked separately.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{FilteredTable, RewardCounts, RewardKey, TableError, PROBABILITY_TOLERANCE};
use crate::lattice::RequirementVector;

/// Weighted distribution over reward bundles.
#[derive(Debug, Clone)]
pub struct DropTable {
    /// Reward keys by id
    keys: Vec<RewardKey>,
    /// Reverse mapping from key to id
    ids: HashMap<RewardKey, usize>,
    /// Dense bundle per entry, `num_rewards` wide
    bundles: Vec<Vec<u32>>,
    /// Sum of each entry's bundle
    totals: Vec<u32>,
    /// Probability per entry
    probabilities: Vec<f64>,
    /// Probability that a trial grants nothing
    null_probability: f64,
}

impl DropTable {
    /// Create an empty table (every trial grants nothing).
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            ids: HashMap::new(),
            bundles: Vec::new(),
            totals: Vec::new(),
            probabilities: Vec::new(),
            null_probability: 1.0,
        }
    }

    /// Table of mutually exclusive outcomes that each grant one unit of a
    /// single reward.
    pub fn independent<K, I>(outcomes: I) -> Result<Self, TableError>
    where
        K: Into<RewardKey>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let mut table = Self::new();
        for (key, probability) in outcomes {
            table.add_entry(probability, &RewardCounts::new().with(key, 1))?;
        }
        Ok(table)
    }

    /// Builder-style [`add_entry`](Self::add_entry).
    pub fn with_entry(mut self, probability: f64, bundle: &RewardCounts) -> Result<Self, TableError> {
        self.add_entry(probability, bundle)?;
        Ok(self)
    }

    /// Add an outcome granting `bundle` with the given probability.
    ///
    /// Bundles equal to an existing entry are merged into it. Zero
    /// probability and empty bundles are ignored. Overshoot is judged on
    /// the table total only: within [`PROBABILITY_TOLERANCE`] every entry is
    /// rescaled, beyond it the insertion fails. On error the table is left
    /// unchanged.
    pub fn add_entry(&mut self, probability: f64, bundle: &RewardCounts) -> Result<(), TableError> {
        if !probability.is_finite() || probability < 0.0 {
            return Err(TableError::InvalidProbability(probability));
        }
        if probability == 0.0 || bundle.is_empty() {
            return Ok(());
        }

        let remaining = self.null_probability - probability;
        if remaining < -PROBABILITY_TOLERANCE {
            return Err(TableError::ProbabilitySumInvalid {
                total: 1.0 - remaining,
            });
        }

        let (total, dense) = self.densify(bundle);
        let existing = (0..self.bundles.len())
            .find(|&i| self.totals[i] == total && self.bundles[i] == dense);
        match existing {
            Some(i) => self.probabilities[i] += probability,
            None => {
                self.bundles.push(dense);
                self.totals.push(total);
                self.probabilities.push(probability);
            }
        }

        self.null_probability = remaining;
        self.correct_rounding();
        Ok(())
    }

    /// Convert a sparse bundle to the dense id space, assigning new ids.
    fn densify(&mut self, bundle: &RewardCounts) -> (u32, Vec<u32>) {
        for (key, _) in bundle.iter() {
            self.reward_id_or_insert(key);
        }
        let mut dense = vec![0; self.keys.len()];
        let mut total = 0u32;
        for (key, amount) in bundle.iter() {
            dense[self.ids[key]] = amount;
            total = total.saturating_add(amount);
        }
        (total, dense)
    }

    fn reward_id_or_insert(&mut self, key: &RewardKey) -> usize {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.keys.len();
        self.keys.push(Arc::clone(key));
        self.ids.insert(Arc::clone(key), id);
        for bundle in &mut self.bundles {
            bundle.push(0);
        }
        id
    }

    /// Rescale entries when the total overshoots 1 within tolerance.
    fn correct_rounding(&mut self) {
        if self.null_probability >= 0.0 {
            return;
        }
        let total = 1.0 - self.null_probability;
        tracing::warn!(total, "fixing probability rounding error: {total:.4} -> 1.0");
        let factor = total.recip();
        for p in &mut self.probabilities {
            *p *= factor;
        }
        self.null_probability = 0.0;
    }

    /// Cap every bundle at `requirement`, writing into `scratch`.
    ///
    /// The returned view borrows the scratch table, so a caller cannot hold
    /// a previous view of the same scratch across calls.
    pub fn filtered<'s>(&self, requirement: &[u32], scratch: &'s mut FilteredTable) -> &'s FilteredTable {
        debug_assert_eq!(requirement.len(), self.keys.len());
        scratch.reset(self.keys.len(), &self.probabilities);
        for (i, (bundle, &total)) in self.bundles.iter().zip(&self.totals).enumerate() {
            if total > 0 {
                scratch.cap_entry(i, bundle, requirement);
            }
        }
        scratch
    }

    /// Iterate `(probability, bundle)` over non-empty entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[u32])> + '_ {
        self.probabilities
            .iter()
            .zip(&self.bundles)
            .zip(&self.totals)
            .filter(|((&p, _), &total)| p > 0.0 && total > 0)
            .map(|((&p, bundle), _)| (p, bundle.as_slice()))
    }

    /// Callback form of [`iter`](Self::iter).
    pub fn for_each_entry(&self, mut f: impl FnMut(f64, &[u32])) {
        for (p, bundle) in self.iter() {
            f(p, bundle);
        }
    }

    /// Entry as a sparse map, keyed by reward.
    pub fn entry_counts(&self, bundle: &[u32]) -> RewardCounts {
        self.keys
            .iter()
            .zip(bundle)
            .filter(|(_, &n)| n > 0)
            .map(|(key, &n)| (Arc::clone(key), n))
            .collect()
    }

    /// Number of entries with a non-empty bundle.
    pub fn size(&self) -> usize {
        self.totals.iter().filter(|&&total| total > 0).count()
    }

    /// Whether no entry grants anything.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of distinct reward keys seen so far.
    pub fn num_rewards(&self) -> usize {
        self.keys.len()
    }

    /// Reward keys in id order.
    pub fn keys(&self) -> &[RewardKey] {
        &self.keys
    }

    /// Dense id of `key`, if known.
    pub fn reward_id(&self, key: &str) -> Option<usize> {
        self.ids.get(key).copied()
    }

    /// Probability that a trial grants nothing.
    pub fn null_probability(&self) -> f64 {
        self.null_probability
    }

    /// Sum of all entry probabilities.
    pub fn total_probability(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    /// Resolve sparse requirements into a dense vector (strict lookup).
    pub fn requirement_vector(&self, required: &RewardCounts) -> Result<RequirementVector, TableError> {
        let mut dense = vec![0; self.keys.len()];
        for (key, amount) in required.iter() {
            let id = self
                .reward_id(key)
                .ok_or_else(|| TableError::UnknownReward(Arc::clone(key)))?;
            dense[id] = amount;
        }
        Ok(RequirementVector::new(dense))
    }

    /// One of every known reward.
    pub fn default_requirement(&self) -> RequirementVector {
        RequirementVector::new(vec![1; self.keys.len()])
    }
}

impl Default for DropTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DropTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (p, bundle) in self.iter() {
            write!(f, "{:.2}%: ", 100.0 * p)?;
            let mut written = 0;
            for (key, &amount) in self.keys.iter().zip(bundle) {
                if amount == 0 {
                    continue;
                }
                if written > 0 {
                    f.write_str(", ")?;
                }
                if amount > 1 {
                    write!(f, "{amount}x")?;
                }
                f.write_str(key)?;
                written += 1;
            }
            writeln!(f)?;
        }
        // The null outcome counts as an entry.
        write!(f, "total entries: {}, nonempty: {}", self.bundles.len() + 1, self.size())
    }
}
