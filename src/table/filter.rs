//! Reusable filtered view of a drop table
//!
//! Bundles live in one flat arena (`entries x num_rewards`) so repeated
//! filtering of the same table never reallocates.

/// Drop table with every bundle capped at a requirement.
///
/// Produced by [`DropTable::filtered`](super::DropTable::filtered). Entries
/// whose capped bundle is empty stay in place and are skipped on iteration.
#[derive(Debug, Clone, Default)]
pub struct FilteredTable {
    num_rewards: usize,
    probabilities: Vec<f64>,
    bundles: Vec<u32>,
    totals: Vec<u32>,
    live: usize,
}

impl FilteredTable {
    /// Shape the scratch for a source table and clear every entry.
    pub(super) fn reset(&mut self, num_rewards: usize, probabilities: &[f64]) {
        let entries = probabilities.len();
        self.num_rewards = num_rewards;
        self.probabilities.clear();
        self.probabilities.extend_from_slice(probabilities);
        self.bundles.clear();
        self.bundles.resize(entries * num_rewards, 0);
        self.totals.clear();
        self.totals.resize(entries, 0);
        self.live = 0;
    }

    /// Write entry `i` capped elementwise at `requirement`.
    pub(super) fn cap_entry(&mut self, i: usize, bundle: &[u32], requirement: &[u32]) {
        let start = i * self.num_rewards;
        let slot = &mut self.bundles[start..start + self.num_rewards];
        let mut total = 0u32;
        for ((out, &amount), &needed) in slot.iter_mut().zip(bundle).zip(requirement) {
            *out = amount.min(needed);
            total += *out;
        }
        self.totals[i] = total;
        if total > 0 {
            self.live += 1;
        }
    }

    /// Iterate `(probability, capped bundle)` over live entries.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[u32])> + '_ {
        (0..self.totals.len())
            .filter(move |&i| self.totals[i] > 0 && self.probabilities[i] > 0.0)
            .map(move |i| {
                let start = i * self.num_rewards;
                (self.probabilities[i], &self.bundles[start..start + self.num_rewards])
            })
    }

    /// Callback form of [`iter`](Self::iter).
    pub fn for_each_entry(&self, mut f: impl FnMut(f64, &[u32])) {
        for (p, bundle) in self.iter() {
            f(p, bundle);
        }
    }

    /// Number of entries with a non-empty capped bundle.
    pub fn size(&self) -> usize {
        self.live
    }

    /// Whether no entry can make progress.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
