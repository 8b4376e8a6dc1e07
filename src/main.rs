/// `ScoreCrab` - A windowed threshold-sweep scorer for anomaly detectors
///
/// Copyright (C) 2025 Daniel Freiermuth
///
/// This program is free software: you can redistribute it and/or modify
/// it under the terms of the GNU General Public License as published by
/// the Free Software Foundation, either version 3 of the License, or
/// (at your option) any later version.
///
/// This program is distributed in the hope that it will be useful,
/// but WITHOUT ANY WARRANTY; without even the implied warranty of
/// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
/// GNU General Public License for more details.
///
/// You should have received a copy of the GNU General Public License
/// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use anyhow::{Context, Result};
use clap::Parser;
use scorecrab::config::BenchmarkConfig;
use scorecrab::core::{Runner, ThresholdRegistry};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "ram-profiling")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[derive(Parser, Debug)]
#[command(name = "scorecrab")]
#[command(author = "ScoreCrab Team")]
#[command(version)]
#[command(about = "Optimize, score and normalize anomaly detector results", long_about = None)]
struct Args {
    /// Find the corpus-optimal threshold per detector and profile
    #[arg(long)]
    optimize: bool,

    /// Score detectors at their registered thresholds
    #[arg(long)]
    score: bool,

    /// Normalize scores against the null detector
    #[arg(long)]
    normalize: bool,

    /// Detectors to process (default: every directory under the results dir)
    #[arg(short, long, num_args = 1..)]
    detectors: Vec<String>,

    /// Benchmark config file (default: user config dir, then built-in defaults)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// Combined label windows
    #[arg(long = "labels", value_name = "FILE")]
    label_path: Option<PathBuf>,

    /// Cost profiles
    #[arg(long = "profiles", value_name = "FILE")]
    profiles_path: Option<PathBuf>,

    /// Threshold registry
    #[arg(long = "thresholds", value_name = "FILE")]
    threshold_path: Option<PathBuf>,

    #[arg(long = "final-results", value_name = "FILE")]
    final_results_path: Option<PathBuf>,

    /// Worker threads (0 = all CPUs)
    #[arg(short = 'n', long)]
    num_cpus: Option<usize>,

    /// Share of each series treated as detector warm-up
    #[arg(long)]
    probation_percent: Option<f64>,

    /// Save the effective configuration as the user config
    #[arg(long)]
    save_config: bool,

    /// Path for the DHAT heap profiling output (only used when built with --features ram-profiling)
    #[cfg(feature = "ram-profiling")]
    #[arg(
        long = "profile-output",
        value_name = "PROFILE_FILE",
        default_value = "dhat-heap.json"
    )]
    profile_output: PathBuf,
}

impl Args {
    fn benchmark_config(&self) -> Result<BenchmarkConfig> {
        let mut config = match &self.config {
            Some(path) => BenchmarkConfig::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => BenchmarkConfig::load(),
        };

        let overrides = [
            (&self.data_dir, &mut config.data_dir),
            (&self.results_dir, &mut config.results_dir),
            (&self.label_path, &mut config.label_path),
            (&self.profiles_path, &mut config.profiles_path),
            (&self.threshold_path, &mut config.threshold_path),
            (&self.final_results_path, &mut config.final_results_path),
        ];
        for (value, field) in overrides {
            if let Some(path) = value {
                field.clone_from(path);
            }
        }
        if let Some(num_cpus) = self.num_cpus {
            config.num_cpus = num_cpus;
        }
        if let Some(percent) = self.probation_percent {
            config.probation_percent = percent;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Set RUST_LOG to override (e.g., RUST_LOG=scorecrab=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        "ScoreCrab starting up (version {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let args = Args::parse();

    #[cfg(feature = "ram-profiling")]
    let _profiler = {
        tracing::info!("RAM profiling enabled, output: {:?}", args.profile_output);
        dhat::Profiler::builder()
            .file_name(args.profile_output.clone())
            .build()
    };

    #[cfg(feature = "cpu-profiling")]
    let _tracy = {
        tracing::info!("CPU profiling enabled with Tracy - run Tracy profiler to connect");
        tracy_client::Client::start()
    };

    let config = args.benchmark_config()?;
    if args.save_config {
        let path = BenchmarkConfig::config_path()
            .context("No user config directory on this platform")?;
        config
            .save_to(&path)
            .with_context(|| format!("Failed to save config {}", path.display()))?;
    }
    let mut runner = Runner::new(config);
    runner.initialize().context("Failed to initialize benchmark")?;

    let detectors = if args.detectors.is_empty() {
        runner
            .discover_detectors()
            .context("Failed to list detectors")?
    } else {
        args.detectors.clone()
    };
    tracing::info!("Detectors: {}", detectors.join(", "));

    let run_all = !(args.optimize || args.score || args.normalize);

    if run_all || args.optimize {
        runner.optimize(&detectors).context("Optimize step failed")?;
    }

    if run_all || args.score {
        let threshold_path = runner.config().threshold_path.clone();
        let thresholds = ThresholdRegistry::load(&threshold_path)
            .with_context(|| format!("Failed to read thresholds {}", threshold_path.display()))?;
        runner
            .score(&detectors, &thresholds)
            .context("Scoring step failed")?;
    }

    if run_all || args.normalize {
        runner.normalize(&detectors).context("Normalize step failed")?;
    }

    let failures = runner.failures();
    if failures.is_empty() {
        tracing::info!("Benchmark finished");
    } else {
        tracing::warn!("Benchmark finished; {} files were skipped:", failures.len());
        for failure in failures {
            tracing::warn!("  {}/{}: {}", failure.detector, failure.file, failure.reason);
        }
    }
    Ok(())
}
