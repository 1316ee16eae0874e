//! Command-line miner: reads a transactions file (one row per line,
//! whitespace-separated column indices), mines significant patterns and
//! prints a JSON document with the patterns and the execution time.

use clap::Parser;
use descry::{Adjustment, Dataset, DescryError, DescryResult, Miner, Pattern, descry_err, init_logging};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "descry", version, about = "Mine statistically significant itemset patterns")]
struct Args {
    /// Transactions file: one row per line, whitespace-separated column
    /// indices (zero-based). Blank lines are empty rows.
    transactions: PathBuf,

    /// Optional group labels file: one integer per line, one line per row.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Target error rate.
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Family-wise error control (the default).
    #[arg(long, conflicts_with = "fdr")]
    fwer: bool,

    /// Sequential false-discovery control instead of FWER.
    #[arg(long)]
    fdr: bool,

    /// Minimum absolute row count per pattern.
    #[arg(long, default_value_t = 2)]
    min_support: usize,

    /// Cap on patterns per model factor (at most 12).
    #[arg(long, default_value_t = 8)]
    max_factor_size: usize,

    /// Cap on singletons per model factor.
    #[arg(long, default_value_t = 50)]
    max_factor_width: usize,

    /// Node-expansion budget.
    #[arg(long)]
    max_expansions: Option<usize>,

    /// Accepted-pattern budget.
    #[arg(long)]
    max_discoveries: Option<usize>,

    /// Wall-clock budget in seconds.
    #[arg(long)]
    max_seconds: Option<f64>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Patterns {
    Single(Vec<Pattern>),
    Grouped(Vec<Vec<Pattern>>),
}

#[derive(Serialize)]
struct Output {
    patterns: Patterns,
    executiontime: f64,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(&args) {
        Ok(output) => match serde_json::to_string(&output) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("descry: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("descry: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> DescryResult<Output> {
    let text = std::fs::read_to_string(&args.transactions)
        .map_err(|err| DescryError::from(err).context(format!(
            "reading transactions from {}",
            args.transactions.display()
        )))?;
    let rows = parse_transactions(&text)?;
    let columns = rows
        .iter()
        .flatten()
        .map(|&j| j as usize + 1)
        .max()
        .unwrap_or(0);
    let dataset = Dataset::from_rows(columns, &rows)?;

    let mut builder = Miner::builder()
        .adjustment(if args.fdr { Adjustment::Fdr } else { Adjustment::Fwer })
        .alpha(args.alpha)
        .min_support(args.min_support)
        .max_factor_size(args.max_factor_size)
        .max_factor_width(args.max_factor_width);
    if let Some(max_expansions) = args.max_expansions {
        builder = builder.max_expansions(max_expansions);
    }
    if let Some(max_discoveries) = args.max_discoveries {
        builder = builder.max_discoveries(max_discoveries);
    }
    if let Some(max_seconds) = args.max_seconds {
        builder = builder.max_seconds(max_seconds);
    }
    let miner = builder.build()?;

    let start = Instant::now();
    let patterns = match &args.labels {
        None => Patterns::Single(miner.fit(&dataset)?.patterns()),
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|err| {
                DescryError::from(err).context(format!("reading labels from {}", path.display()))
            })?;
            let labels = parse_labels(&text)?;
            Patterns::Grouped(
                miner
                    .fit_grouped(&dataset, &labels)?
                    .into_iter()
                    .map(|model| model.patterns())
                    .collect(),
            )
        }
    };

    Ok(Output {
        patterns,
        executiontime: start.elapsed().as_secs_f64(),
    })
}

fn parse_transactions(text: &str) -> DescryResult<Vec<Vec<u32>>> {
    text.lines()
        .enumerate()
        .map(|(line, row)| {
            row.split_whitespace()
                .map(|token| {
                    token.parse::<u32>().map_err(|_| {
                        descry_err!(Dataset: "line {}: invalid column index {:?}", line + 1, token)
                    })
                })
                .collect()
        })
        .collect()
}

fn parse_labels(text: &str) -> DescryResult<Vec<i64>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line, token)| {
            token.trim().parse::<i64>().map_err(|_| {
                descry_err!(Dataset: "line {}: invalid group label {:?}", line + 1, token)
            })
        })
        .collect()
}
