use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dropstat::{combine, DropTable, RewardCounts, StatsCalculator, StatsConfig, DEFAULT_BATCH_SIZE};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dropstat", about = "Expected trials to collect rewards from weighted drop tables")]
struct Cli {
    /// Log progress details and run statistics.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the mean and variance of the number of trials.
    Stats {
        /// Trial source: `prob:reward[;prob:reward...]`, rewards joined by `+`
        /// with an optional `Nx` amount prefix (e.g. `0.1:2xA+B;5%:C`).
        /// Repeat to combine independent sources rolled on every trial.
        #[arg(long = "source", short, required = true)]
        sources: Vec<String>,
        /// Required amount as `reward=count`; defaults to one of each reward.
        #[arg(long = "require", short)]
        requirements: Vec<String>,
        /// Lattice points per batch between progress updates.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Give up after this many seconds.
        #[arg(long)]
        time_budget_secs: Option<f64>,
        /// Suppress the progress display.
        #[arg(long, short)]
        quiet: bool,
    },
    /// Print the combined drop table.
    Table {
        /// Trial source, same syntax as for `stats`.
        #[arg(long = "source", short, required = true)]
        sources: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stats {
            sources,
            requirements,
            batch_size,
            time_budget_secs,
            quiet,
        } => run_stats(&sources, &requirements, batch_size, time_budget_secs, quiet)?,
        Commands::Table { sources } => {
            let table = build_table(&sources)?;
            println!("{table}");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_stats(
    sources: &[String],
    requirements: &[String],
    batch_size: usize,
    time_budget_secs: Option<f64>,
    quiet: bool,
) -> Result<()> {
    let table = build_table(sources)?;
    let required = if requirements.is_empty() {
        None
    } else {
        Some(parse_requirements(requirements)?)
    };

    let mut config = StatsConfig::default().with_batch_size(batch_size);
    if let Some(secs) = time_budget_secs {
        let budget = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid time budget {secs}"))?;
        config = config.with_time_budget(budget);
    }

    let calculator = StatsCalculator::new(&table, config);
    let mut outcome = None;
    calculator
        .run(
            required.as_ref(),
            |fraction| {
                if !quiet {
                    eprint!("\rProgress: {:6.2}%", fraction * 100.0);
                    let _ = std::io::stderr().flush();
                }
            },
            |stats| outcome = Some(stats),
        )
        .context("statistics calculation failed")?;
    if !quiet {
        eprintln!();
    }

    if let Some(stats) = outcome {
        println!("{stats}");
    }
    Ok(())
}

fn build_table(sources: &[String]) -> Result<DropTable> {
    let tables = sources
        .iter()
        .map(|source| {
            parse_source(source).with_context(|| format!("invalid source '{source}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    combine(&tables).context("failed to combine sources")
}

/// Parse `prob:bundle;prob:bundle...` into one table.
fn parse_source(source: &str) -> Result<DropTable> {
    let mut table = DropTable::new();
    for outcome in source.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (prob, bundle) = outcome
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("missing ':' in outcome '{outcome}'"))?;
        let probability = parse_probability(prob.trim())?;
        let bundle = parse_bundle(bundle)?;
        table.add_entry(probability, &bundle)?;
    }
    Ok(table)
}

/// `0.125` or `12.5%`.
fn parse_probability(text: &str) -> Result<f64> {
    let (number, scale) = match text.strip_suffix('%') {
        Some(percent) => (percent, 0.01),
        None => (text, 1.0),
    };
    let value: f64 = number
        .trim()
        .parse()
        .with_context(|| format!("invalid probability '{text}'"))?;
    Ok(value * scale)
}

/// `2xA+B` grants two A and one B.
fn parse_bundle(text: &str) -> Result<RewardCounts> {
    let mut bundle = RewardCounts::new();
    for item in text.split('+').map(str::trim) {
        if item.is_empty() {
            bail!("empty reward in bundle '{text}'");
        }
        let (amount, key) = split_amount(item);
        bundle.add(key, amount);
    }
    Ok(bundle)
}

/// Split an optional `Nx` amount prefix off a reward name.
fn split_amount(item: &str) -> (u32, &str) {
    let digits = item.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && item[digits..].starts_with('x') && item.len() > digits + 1 {
        if let Ok(amount) = item[..digits].parse() {
            return (amount, &item[digits + 1..]);
        }
    }
    (1, item)
}

fn parse_requirements(requirements: &[String]) -> Result<RewardCounts> {
    let mut required = RewardCounts::new();
    for requirement in requirements {
        let (key, count) = match requirement.split_once('=') {
            Some((key, count)) => {
                let count: u32 = count
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid count in requirement '{requirement}'"))?;
                (key.trim(), count)
            }
            None => (requirement.trim(), 1),
        };
        if key.is_empty() {
            bail!("missing reward name in requirement '{requirement}'");
        }
        required.add(key, count);
    }
    Ok(required)
}
