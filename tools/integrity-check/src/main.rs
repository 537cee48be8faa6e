//! Command-line runner for the integrity engine.
//!
//! Intended for `adb shell` and CI diagnostics. Always exits 0 once the
//! evaluation ran; findings are reported, not acted upon.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use connectias_integrity::{EngineConfig, IntegrityEngine, ProbeOutcome, SecurityReport, ThreatCategory};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "integrity-check")]
#[command(about = "Inspect the runtime environment for root, instrumentation, emulation, debuggers and tamper tools")]
struct Cli {
    /// JSON engine configuration; omitted fields use built-in signatures
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run one category
    #[arg(long, value_enum)]
    category: Option<Category>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    Root,
    Instrumentation,
    Emulator,
    Debugger,
    Tamper,
}

impl From<Category> for ThreatCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Root => ThreatCategory::Root,
            Category::Instrumentation => ThreatCategory::Instrumentation,
            Category::Emulator => ThreatCategory::Emulator,
            Category::Debugger => ThreatCategory::Debugger,
            Category::Tamper => ThreatCategory::TamperTool,
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    let _ = builder.try_init();
}

fn format_outcome(outcome: &ProbeOutcome) -> String {
    match (&outcome.evidence, outcome.detected) {
        (Some(evidence), true) => format!("{}: detected ({})", outcome.category, evidence),
        (None, true) => format!("{}: detected", outcome.category),
        (_, false) => format!("{}: clean", outcome.category),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = IntegrityEngine::new(config);

    let report = match cli.category {
        Some(category) => SecurityReport::from_outcomes(vec![engine.check(category.into())]),
        None => engine.report(),
    };

    if cli.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
        return Ok(());
    }

    let shown: Vec<&ProbeOutcome> = match cli.category {
        Some(category) => report
            .outcome(category.into())
            .into_iter()
            .collect(),
        None => report.outcomes.iter().collect(),
    };
    for outcome in shown {
        println!("{}", format_outcome(outcome));
    }
    println!("status: {:#07b} ({})", report.status.bits(), report.status.bits());

    Ok(())
}
