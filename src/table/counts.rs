//! Sparse reward counts keyed by reward identifier.

use std::fmt;
use std::sync::Arc;

/// Opaque identifier of one kind of reward.
pub type RewardKey = Arc<str>;

/// Insertion-ordered sparse map from reward key to count.
///
/// Used to describe both the bundle granted by one outcome and the amounts a
/// caller wants to collect. Zero counts are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardCounts {
    counts: Vec<(RewardKey, u32)>,
}

impl RewardCounts {
    /// Create an empty map.
    pub fn new() -> Self {
        Self { counts: Vec::new() }
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, key: impl Into<RewardKey>, amount: u32) -> Self {
        self.add(key, amount);
        self
    }

    /// Add `amount` to the count for `key`.
    pub fn add(&mut self, key: impl Into<RewardKey>, amount: u32) {
        let key = key.into();
        let current = self.get(&key);
        self.set(key, current.saturating_add(amount));
    }

    /// Overwrite the count for `key`; a zero count removes the key.
    pub fn set(&mut self, key: impl Into<RewardKey>, amount: u32) {
        let key = key.into();
        match self.position(&key) {
            Some(idx) if amount == 0 => {
                self.counts.remove(idx);
            }
            Some(idx) => self.counts[idx].1 = amount,
            None if amount == 0 => {}
            None => self.counts.push((key, amount)),
        }
    }

    /// Count for `key`, zero when absent.
    pub fn get(&self, key: &str) -> u32 {
        self.position(key).map(|idx| self.counts[idx].1).unwrap_or(0)
    }

    /// Add every count of `other` into this map.
    pub fn add_all(&mut self, other: &RewardCounts) {
        for (key, amount) in other.iter() {
            self.add(Arc::clone(key), amount);
        }
    }

    /// Iterate `(key, count)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&RewardKey, u32)> + '_ {
        self.counts.iter().map(|(key, amount)| (key, *amount))
    }

    /// Number of distinct keys with a nonzero count.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no key has a nonzero count.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.counts.iter().position(|(k, _)| k.as_ref() == key)
    }
}

impl<K: Into<RewardKey>> FromIterator<(K, u32)> for RewardCounts {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        let mut counts = RewardCounts::new();
        for (key, amount) in iter {
            counts.add(key, amount);
        }
        counts
    }
}

impl fmt::Display for RewardCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, amount)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(key)?;
            if amount != 1 {
                write!(f, " x{amount}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_and_keeps_insertion_order() {
        let counts = RewardCounts::new().with("B", 1).with("A", 2).with("B", 2);
        let keys: Vec<_> = counts.iter().map(|(k, n)| (k.to_string(), n)).collect();
        assert_eq!(keys, vec![("B".to_string(), 3), ("A".to_string(), 2)]);
    }

    #[test]
    fn zero_counts_are_not_stored() {
        let mut counts = RewardCounts::new().with("A", 0);
        assert!(counts.is_empty());

        counts.add("A", 4);
        counts.set("A", 0);
        assert!(counts.is_empty());
        assert_eq!(counts.get("A"), 0);
    }

    #[test]
    fn display_omits_unit_counts() {
        let counts = RewardCounts::new().with("Chassis", 1).with("BP", 3);
        assert_eq!(counts.to_string(), "Chassis, BP x3");
    }
}
