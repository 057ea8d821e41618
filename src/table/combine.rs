//! Combine independent trial sources into one table.
//!
//! One trial draws from every source at once. Each source contributes one
//! of its entries or its own null outcome; probabilities multiply and the
//! granted bundles add up.

use super::{DropTable, RewardCounts, TableError};
use crate::lattice::Odometer;

/// Cartesian product of independent tables.
pub fn combine(tables: &[DropTable]) -> Result<DropTable, TableError> {
    match tables {
        [] => return Ok(DropTable::new()),
        [single] => return Ok(single.clone()),
        _ => {}
    }

    // Choice 0 of every source is its null outcome.
    let choices: Vec<Vec<(f64, RewardCounts)>> = tables
        .iter()
        .map(|table| {
            std::iter::once((table.null_probability(), RewardCounts::new()))
                .chain(table.iter().map(|(p, bundle)| (p, table.entry_counts(bundle))))
                .collect()
        })
        .collect();
    let bounds: Vec<u32> = choices.iter().map(|c| (c.len() - 1) as u32).collect();

    let mut combined = DropTable::new();
    let mut odometer = Odometer::new(&bounds);
    while let Some(pick) = odometer.advance() {
        let mut probability = 1.0;
        let mut bundle = RewardCounts::new();
        for (source, &choice) in choices.iter().zip(pick) {
            let (p, counts) = &source[choice as usize];
            probability *= p;
            bundle.add_all(counts);
        }
        combined.add_entry(probability.min(1.0), &bundle)?;
    }

    tracing::debug!(
        sources = tables.len(),
        entries = combined.size(),
        "combined drop tables"
    );
    Ok(combined)
}
