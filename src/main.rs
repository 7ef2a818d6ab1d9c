//! RRQ Projection CLI
//!
//! Command-line interface for projecting QPP benefits and contribution IRRs

use anyhow::{Context, Result};
use clap::Parser;
use rrq_projection::profile::{load_earnings, load_profile};
use rrq_projection::projection::DetailRow;
use rrq_projection::{
    EarningsHistory, EarningsMode, PersonProfile, ProjectionConfig, ProjectionEngine, ReferenceTable,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "rrq_projection",
    about = "Quebec Pension Plan benefit projection with the IRR of each contribution year"
)]
struct Cli {
    #[arg(long, help = "Reference table CSV (semicolon separated); defaults to the bundled table")]
    reference: Option<PathBuf>,

    #[arg(long, help = "Person profile JSON; defaults to the built-in example profile")]
    profile: Option<PathBuf>,

    #[arg(long, help = "Earnings CSV with columns age,earnings; blank earnings are extrapolated")]
    earnings: Option<PathBuf>,

    #[arg(long, help = "Read earnings as percent of the year's MGA instead of dollars")]
    percent: bool,

    #[arg(long, help = "Write the per-year detail table to this CSV file")]
    output: Option<PathBuf>,

    #[arg(long, help = "Print the full result as JSON instead of the text summary")]
    json: bool,

    #[arg(long, help = "Compute on a single thread")]
    sequential: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let profile: PersonProfile = match &cli.profile {
        Some(path) => load_profile(path).with_context(|| format!("loading profile {}", path.display()))?,
        None => PersonProfile::default(),
    };

    let table = match &cli.reference {
        Some(path) => ReferenceTable::from_csv_path(path, profile.salary_growth_rate)
            .with_context(|| format!("loading reference table {}", path.display()))?,
        None => ReferenceTable::bundled(profile.salary_growth_rate).context("loading bundled reference table")?,
    };

    let mode = if cli.percent {
        EarningsMode::PercentOfCeiling
    } else {
        EarningsMode::Amount
    };
    let history = match &cli.earnings {
        Some(path) => load_earnings(path, &profile, mode)
            .with_context(|| format!("loading earnings {}", path.display()))?,
        None => EarningsHistory::empty(&profile).with_mode(mode),
    };

    let config = ProjectionConfig {
        parallel: !cli.sequential,
        ..Default::default()
    };

    let start = Instant::now();
    let engine = ProjectionEngine::new(&table, config);
    let result = engine.project(&profile, &history)?;
    log::info!("projection ran in {:?}", start.elapsed());

    if let Some(path) = &cli.output {
        write_detail_csv(path, &result.detail).with_context(|| format!("writing {}", path.display()))?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let summary = &result.summary;
    println!("RRQ Projection v{}", env!("CARGO_PKG_VERSION"));
    println!("======================\n");
    println!("Born {}", profile.birth_date());
    println!("Benefit starting {} (age {})", summary.claim_date, summary.claim_age);
    println!(
        "{:<16} {:>14} {:>14}",
        "Annual benefit",
        format!("{} $", summary.claim_date.format("%Y")),
        format!("{} $", profile.reference_year)
    );
    println!("{}", "-".repeat(46));
    let lines = [
        ("Total", summary.annual_benefit, summary.annual_benefit_reference),
        ("Base plan", summary.basic_annual, summary.basic_annual_reference),
        ("Supplement 1", summary.volet1_annual, summary.volet1_annual_reference),
        ("Supplement 2", summary.volet2_annual, summary.volet2_annual_reference),
    ];
    for (label, claim_dollars, reference_dollars) in lines {
        println!("{:<16} {:>14.2} {:>14.2}", label, claim_dollars, reference_dollars);
    }

    println!(
        "\n{:>4} {:>5} {:>8} {:>14} {:>14} {:>14}",
        "Age", "Year", "IRR %", "Contribution", "Accumulated", "Incremental"
    );
    println!("{}", "-".repeat(64));
    for row in &result.detail {
        let irr = row.irr_pct.map_or_else(|| "-".to_string(), |pct| format!("{:.2}", pct));
        println!(
            "{:>4} {:>5} {:>8} {:>14.2} {:>14.2} {:>14.2}",
            row.age, row.year, irr, row.contribution, row.accumulated_benefit, row.incremental_benefit
        );
    }

    if let Some(path) = &cli.output {
        println!("\nDetail table written to: {}", path.display());
    }

    Ok(())
}

fn write_detail_csv(path: &Path, rows: &[DetailRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
