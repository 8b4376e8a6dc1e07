// ScoreCrab - GPL-3.0-or-later
// This file is part of ScoreCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// ScoreCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// ScoreCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with ScoreCrab.  If not, see <https://www.gnu.org/licenses/>.

//! Export the threshold-to-score curve of a detector.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scorecrab::config::BenchmarkConfig;
use scorecrab::core::Runner;
use scorecrab::sweep::{best_row, ThresholdScore};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "scorecrab-curve")]
#[command(version)]
#[command(about = "Export the full threshold-to-score curve of a detector", long_about = None)]
struct Args {
    /// Detector whose results are swept
    detector: String,

    /// Cost profile to score with
    #[arg(short, long, default_value = "standard")]
    profile: String,

    /// Single results file, relative to the detector's results directory
    #[arg(short, long, value_name = "FILE")]
    file: Option<String>,

    #[arg(long, value_enum, default_value = "csv")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Benchmark config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    #[arg(long = "labels", value_name = "FILE")]
    label_path: Option<PathBuf>,

    #[arg(long = "profiles", value_name = "FILE")]
    profiles_path: Option<PathBuf>,

    #[arg(long)]
    probation_percent: Option<f64>,
}

fn write_curve(rows: &[ThresholdScore], format: Format, out: impl Write) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(out, rows).context("Failed to write JSON curve")?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row).context("Failed to write CSV curve")?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BenchmarkConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BenchmarkConfig::load(),
    };
    if let Some(dir) = &args.results_dir {
        config.results_dir.clone_from(dir);
    }
    if let Some(path) = &args.label_path {
        config.label_path.clone_from(path);
    }
    if let Some(path) = &args.profiles_path {
        config.profiles_path.clone_from(path);
    }
    if let Some(percent) = args.probation_percent {
        config.probation_percent = percent;
    }

    let mut runner = Runner::new(config);
    runner.initialize().context("Failed to initialize")?;
    let rows = runner
        .curve(&args.detector, &args.profile, args.file.as_deref())
        .with_context(|| format!("Failed to sweep {}", args.detector))?;

    for failure in runner.failures() {
        tracing::warn!("Skipped {}: {}", failure.file, failure.reason);
    }
    if let Some(best) = best_row(&rows) {
        tracing::info!(
            "{} rows; best threshold {} scores {:.4}",
            rows.len(),
            best.threshold,
            best.score
        );
    }

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_curve(&rows, args.format, std::io::BufWriter::new(file))
        }
        None => write_curve(&rows, args.format, std::io::stdout().lock()),
    }
}
