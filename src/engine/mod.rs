//! Expected-value and variance recursion
//!
//! For a table `T` and requirement `r`, let `E(r)` be the expected number
//! of trials until every component of `r` is collected and `V(r)` its
//! variance. With live entries `p_i, b_i` after filtering by `r`,
//! `P = sum(p_i)` and `r_i = max(r - b_i, 0)`:
//!
//! ```text
//! E(r) = (1 + sum(p_i * E(r_i))) / P
//! V(r) = (sum(p_i * V(r_i)) + S2 - S1^2) / P
//!   S1 = sum(p_i * E(r_i))   + (1 - P) * E(r)
//!   S2 = sum(p_i * E(r_i)^2) + (1 - P) * E(r)^2
//! ```
//!
//! The null outcome leaves `r` unchanged; dividing by `P` instead of 1
//! removes its self-reference from `E`, and its contribution to the
//! spread of conditional expectations is kept in `S1`/`S2`. When one
//! reward and one entry remain the negative binomial closed form applies.

use std::collections::TryReserveError;

use crate::cache::{MemoCache, Moments};
use crate::diagnostics::CalcTracker;
use crate::lattice::{reduce_into, Lattice};
use crate::table::{DropTable, FilteredTable};

/// Scratch owned by one recursion level.
#[derive(Debug, Default)]
struct Frame {
    filtered: FilteredTable,
    coords: Vec<u32>,
    reduced: Vec<u32>,
    children: Vec<(f64, usize)>,
}

/// Memoized evaluator of `(E, V)` over one lattice.
#[derive(Debug)]
pub struct RecursionEngine<'t> {
    table: &'t DropTable,
    lattice: Lattice,
    cache: MemoCache,
    tracker: CalcTracker,
    /// Frame pool indexed by `depth - 1`
    frames: Vec<Frame>,
}

impl<'t> RecursionEngine<'t> {
    /// Engine over `lattice` with an empty cache.
    ///
    /// Fails when the cache for every lattice point cannot be allocated.
    pub fn new(table: &'t DropTable, lattice: Lattice) -> Result<Self, TryReserveError> {
        debug_assert_eq!(table.num_rewards(), lattice.dims());
        let cache = MemoCache::new(lattice.size())?;
        Ok(Self {
            table,
            lattice,
            cache,
            tracker: CalcTracker::new(),
            frames: Vec::new(),
        })
    }

    /// Moments for the lattice point at `index`, from cache or derived.
    pub fn moments(&mut self, index: usize) -> Moments {
        if let Some(moments) = self.cache.get(index) {
            self.tracker.record_hit();
            return moments;
        }

        self.tracker.push_frame();
        let depth = self.tracker.depth();
        if self.frames.len() < depth {
            self.frames.resize_with(depth, Frame::default);
        }
        let mut frame = std::mem::take(&mut self.frames[depth - 1]);
        self.lattice.coords_into(index, &mut frame.coords);

        let moments = self.derive(&mut frame);

        self.frames[depth - 1] = frame;
        self.tracker.pop_frame();
        self.cache.insert(index, moments);
        moments
    }

    /// Moments for an explicit requirement inside the lattice.
    pub fn moments_at(&mut self, requirement: &[u32]) -> Moments {
        let index = self.lattice.index_of(requirement);
        self.moments(index)
    }

    fn derive(&mut self, frame: &mut Frame) -> Moments {
        let nonzero = frame.coords.iter().filter(|&&n| n > 0).count();
        if nonzero == 0 {
            return Moments::ZERO;
        }
        self.tracker.record_calculation();

        let filtered = self.table.filtered(&frame.coords, &mut frame.filtered);

        if nonzero == 1 && filtered.size() == 1 {
            let axis = frame.coords.iter().position(|&n| n > 0).unwrap_or(0);
            if let Some((p, bundle)) = filtered.iter().next() {
                let needed = frame.coords[axis].div_ceil(bundle[axis]);
                return Moments::negative_binomial(p, needed);
            }
        }

        frame.reduced.resize(frame.coords.len(), 0);
        frame.children.clear();
        let mut prob_sum = 0.0;
        for (p, bundle) in filtered.iter() {
            prob_sum += p;
            reduce_into(&frame.coords, bundle, &mut frame.reduced);
            frame.children.push((p, self.lattice.index_of(&frame.reduced)));
        }
        debug_assert!(prob_sum > 0.0, "requirement {:?} is unreachable", frame.coords);

        let mut e_sum = 0.0;
        let mut es_sum = 0.0;
        let mut v_sum = 0.0;
        for &(p, child) in &frame.children {
            let m = self.moments(child);
            e_sum += p * m.expected;
            es_sum += p * m.expected * m.expected;
            v_sum += p * m.variance;
        }

        let expected = (1.0 + e_sum) / prob_sum;
        let null = 1.0 - prob_sum;
        e_sum += null * expected;
        es_sum += null * expected * expected;
        let variance = (v_sum + es_sum - e_sum * e_sum) / prob_sum;

        Moments { expected, variance }
    }

    /// Shape of the lattice this engine evaluates.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Work counters.
    pub fn tracker(&self) -> &CalcTracker {
        &self.tracker
    }

    /// Mutable work counters (the scheduler records batches here).
    pub fn tracker_mut(&mut self) -> &mut CalcTracker {
        &mut self.tracker
    }

    /// Whether the point at `index` is already cached.
    pub fn is_cached(&self, index: usize) -> bool {
        self.cache.is_populated(index)
    }

    /// Number of cached lattice points.
    pub fn cached_count(&self) -> usize {
        self.cache.populated_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RewardCounts;

    fn engine_for<'t>(table: &'t DropTable, root: &[u32]) -> RecursionEngine<'t> {
        RecursionEngine::new(table, Lattice::new(root).unwrap()).unwrap()
    }

    #[test]
    fn zero_requirement_is_free() {
        let table = DropTable::independent([("A", 0.5)]).unwrap();
        let mut engine = engine_for(&table, &[0]);
        assert_eq!(engine.moments(0), Moments::ZERO);
        assert_eq!(engine.tracker().sub_calculations(), 0);
    }

    #[test]
    fn single_reward_uses_negative_binomial() {
        let table = DropTable::new()
            .with_entry(0.25, &RewardCounts::new().with("A", 2))
            .unwrap();
        let mut engine = engine_for(&table, &[5]);
        let m = engine.moments_at(&[5]);

        // ceil(5 / 2) = 3 successes needed.
        assert!((m.expected - 12.0).abs() < 1e-12);
        assert!((m.variance - 36.0).abs() < 1e-12);
        assert_eq!(engine.tracker().max_depth(), 1);
    }

    #[test]
    fn certain_outcome_has_no_variance() {
        let table = DropTable::independent([("A", 0.5), ("B", 0.5)]).unwrap();
        let mut engine = engine_for(&table, &[1, 0]);
        let m = engine.moments_at(&[1, 0]);
        assert!((m.expected - 2.0).abs() < 1e-12);

        let table = DropTable::new()
            .with_entry(1.0, &RewardCounts::new().with("A", 1).with("B", 1))
            .unwrap();
        let mut engine = engine_for(&table, &[3, 2]);
        let m = engine.moments_at(&[3, 2]);
        assert!((m.expected - 3.0).abs() < 1e-9);
        assert!(m.variance.abs() < 1e-9);
    }

    #[test]
    fn two_rewards_match_hand_derivation() {
        // A and B each with p = 0.5 and nothing else: E = 1 + 1/0.5 = 3,
        // V = 0 + Var(Geom(0.5)) = 2.
        let table = DropTable::independent([("A", 0.5), ("B", 0.5)]).unwrap();
        let mut engine = engine_for(&table, &[1, 1]);
        let m = engine.moments_at(&[1, 1]);
        assert!((m.expected - 3.0).abs() < 1e-12);
        assert!((m.variance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn shared_states_are_cached() {
        let table = DropTable::independent([("A", 0.3), ("B", 0.3)]).unwrap();
        let mut engine = engine_for(&table, &[2, 2]);
        engine.moments_at(&[2, 2]);

        // Every point except the zero vector is derived exactly once; the
        // zero vector itself is never reached because single-reward states
        // close with the negative binomial form.
        assert_eq!(engine.tracker().sub_calculations(), 8);
        assert!(engine.tracker().cache_hits() > 0);
        assert_eq!(engine.cached_count(), 8);
        assert!(!engine.is_cached(0));
    }
}
