/// chartprep CLI - build chart datasets from JSON records
///
/// Usage:
///   chartprep build --options <file> --records <file>  - Build datasets
///   chartprep validate --options <file>                - Check chart options
///
/// Set RUST_LOG (e.g. `RUST_LOG=chart_prep=debug`) to see pipeline logs.
use anyhow::{Context, Result};
use chart_prep::{ChartBuilder, ChartOptions, ChartSpec, Dataset, MemorySource, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// chartprep - Chart Dataset Preparation
///
/// Filters, buckets and aggregates records into chart-ready datasets.
#[derive(Parser)]
#[command(name = "chartprep")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the datasets of a chart
    ///
    /// Examples:
    ///   chartprep build --options chart.json --records orders.json
    ///   chartprep build -o chart.json -r orders.json --today 2024-03-15 --json
    Build {
        /// Chart options file (JSON)
        #[arg(short, long)]
        options: PathBuf,

        /// Records file (JSON array of objects)
        #[arg(short, long)]
        records: PathBuf,

        /// Reference date for relative date windows (YYYY-MM-DD, default: today UTC)
        #[arg(short, long)]
        today: Option<NaiveDate>,

        /// Print datasets as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate chart options without building
    ///
    /// Example:
    ///   chartprep validate --options chart.json
    Validate {
        /// Chart options file (JSON)
        #[arg(short, long)]
        options: PathBuf,
    },
}

/// Read and validate a chart options file.
fn load_spec(path: &Path) -> Result<ChartSpec> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file: {}", path.display()))?;
    let options = ChartOptions::from_json(&text)
        .with_context(|| format!("Invalid options file: {}", path.display()))?;
    ChartSpec::from_options(&options).context("Invalid chart options")
}

/// Read a records file.
fn load_records(path: &Path) -> Result<MemorySource> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    MemorySource::from_json(&text)
        .with_context(|| format!("Records file must hold a JSON array: {}", path.display()))
}

/// Format a bucket value, dropping a zero fraction
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Print datasets as a colored table
fn print_datasets(spec: &ChartSpec, datasets: &[Dataset]) {
    println!(
        "{} {} ({}, {})",
        "Chart:".bold(),
        spec.title.bright_white(),
        spec.report_type.to_string().cyan(),
        spec.chart_type.to_string().cyan()
    );

    for dataset in datasets {
        println!();
        let name = if dataset.name.is_empty() {
            "(default series)".to_string()
        } else {
            dataset.name.clone()
        };
        if dataset.color.is_empty() {
            println!("  {}", name.bold());
        } else {
            println!("  {} {}", name.bold(), format!("[{}]", dataset.color).bright_black());
        }

        if dataset.is_empty() {
            println!("    {}", "no data".bright_black());
            continue;
        }

        let width = dataset.keys().map(str::len).max().unwrap_or(0).max(4);
        for (key, value) in &dataset.data {
            let label = if key.is_empty() { "(none)" } else { key.as_str() };
            let value = format_value(*value);
            if value == "0" {
                println!("    {label:<width$}  {}", value.bright_black());
            } else {
                println!("    {label:<width$}  {}", value.green());
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            options,
            records,
            today,
            json,
        } => {
            let spec = load_spec(&options)?;
            let source = load_records(&records)?;

            let mut builder = ChartBuilder::new(&spec);
            if let Some(today) = today {
                builder = builder.today(today);
            }
            let datasets = builder.build(&source).context("Failed to build chart")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&datasets)?);
            } else {
                print_datasets(&spec, &datasets);
            }
            Ok(())
        }

        Commands::Validate { options } => {
            let spec = load_spec(&options)?;
            println!("{}", "OK".green().bold());
            println!("  Chart: {} ({})", spec.title.cyan(), spec.name.bright_black());
            println!("  Report: {}", spec.report_type);
            println!("  Type: {}", spec.chart_type);
            println!("  Series: {}", spec.series_list().len());
            Ok(())
        }
    }
}
