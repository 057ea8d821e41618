//! Streaming progress ledger
//!
//! Counts seeded lattice points against the lattice size and hands out
//! progress fractions that never decrease.

/// Monotonic progress accounting for one computation
#[derive(Debug)]
pub struct ProgressLedger {
    /// Lattice points seeded so far
    completed: usize,

    /// Number of lattice points
    total: usize,

    /// Last fraction handed out
    reported: f64,
}

impl ProgressLedger {
    /// Create ledger for `total` units of work
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            reported: 0.0,
        }
    }

    /// Mark one more unit complete
    pub fn mark_complete(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
    }

    /// Units completed so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Units in total
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether every unit has been marked
    pub fn all_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Current fraction in `[0, 1]`, never below a previous report
    pub fn report(&mut self) -> f64 {
        let fraction = if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        };
        self.reported = self.reported.max(fraction.clamp(0.0, 1.0));
        self.reported
    }

    /// Close the ledger; the final report is always exactly 1
    pub fn finish(&mut self) -> f64 {
        self.completed = self.total;
        self.reported = 1.0;
        self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_are_monotone_fractions() {
        let mut ledger = ProgressLedger::new(4);
        assert_eq!(ledger.report(), 0.0);

        ledger.mark_complete();
        assert_eq!(ledger.report(), 0.25);

        for _ in 0..10 {
            ledger.mark_complete();
        }
        assert!(ledger.all_complete());
        assert_eq!(ledger.report(), 1.0);
        assert_eq!(ledger.finish(), 1.0);
    }

    #[test]
    fn empty_ledger_is_complete() {
        let mut ledger = ProgressLedger::new(0);
        assert!(ledger.all_complete());
        assert_eq!(ledger.report(), 1.0);
    }
}
