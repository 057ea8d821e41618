//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use dropstat::{combine, DropStats, DropTable, NoYield, RewardCounts, StatsCalculator, StatsConfig};

/// Compare a table's rendering with `tests/snapshots/<name>`.
///
/// With `DROPSTAT_UPDATE_SNAPSHOTS` set the file is rewritten instead.
pub fn assert_table_layout(name: &str, table: &DropTable) {
    let rendered = table.to_string();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/snapshots").join(name);
    if std::env::var_os("DROPSTAT_UPDATE_SNAPSHOTS").is_some() {
        fs::write(&path, format!("{rendered}\n")).expect("write table layout");
        return;
    }

    let stored = fs::read_to_string(&path).unwrap_or_else(|err| panic!("{}: {err}", path.display()));
    let expected: Vec<&str> = stored.lines().map(str::trim_end).collect();
    let actual: Vec<&str> = rendered.lines().map(str::trim_end).collect();
    for (line, (want, got)) in expected.iter().zip(&actual).enumerate() {
        assert_eq!(want, got, "{} line {}", path.display(), line + 1);
    }
    assert_eq!(
        expected.len(),
        actual.len(),
        "{}: line count differs, set DROPSTAT_UPDATE_SNAPSHOTS=1 to regenerate",
        path.display()
    );
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected} +/- {tolerance}, got {actual}"
    );
}

/// Run a calculation to completion without yielding.
pub fn stats_for(table: &DropTable, required: Option<&RewardCounts>) -> DropStats {
    let calculator = StatsCalculator::new(table, StatsConfig::default());
    let mut outcome = None;
    calculator
        .run_with(required, &mut NoYield, |_| {}, |stats| outcome = Some(stats))
        .expect("calculation succeeds");
    outcome.expect("result delivered")
}

/// One source per reward, each granting a single unit.
pub fn single_reward_sources(outcomes: &[(&str, f64)]) -> Vec<DropTable> {
    outcomes
        .iter()
        .map(|&(key, p)| DropTable::independent([(key, p)]).expect("valid source"))
        .collect()
}

/// Two Chassis sources, one Helmet source and one Systems-or-BP source.
pub fn four_source_table() -> DropTable {
    let mut sources = single_reward_sources(&[("Chassis", 0.10), ("Chassis", 0.10), ("Helmet", 0.10)]);
    sources.push(DropTable::independent([("Systems", 0.10), ("BP", 0.10)]).expect("valid source"));
    combine(&sources).expect("sources combine")
}

pub fn counts(items: &[(&str, u32)]) -> RewardCounts {
    items.iter().map(|&(key, n)| (key, n)).collect()
}
