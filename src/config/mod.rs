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

pub mod profiles;

use crate::error::{Result, ScoreError};
use crate::sweep::sweeper::DEFAULT_PROBATION_PERCENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the benchmark reads its inputs and writes its outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Root of the raw data corpus
    pub data_dir: PathBuf,

    /// Root of the detector results, one directory per detector
    pub results_dir: PathBuf,

    /// Combined label windows
    pub label_path: PathBuf,

    /// Cost profiles
    pub profiles_path: PathBuf,

    /// Optimized thresholds per detector and profile
    pub threshold_path: PathBuf,

    /// Normalized scores per detector and profile
    pub final_results_path: PathBuf,

    /// Share of each series treated as detector warm-up
    pub probation_percent: f64,

    /// Worker threads; 0 uses every CPU
    pub num_cpus: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            label_path: PathBuf::from("labels/combined_windows.json"),
            profiles_path: PathBuf::from("config/profiles.json"),
            threshold_path: PathBuf::from("config/thresholds.json"),
            final_results_path: PathBuf::from("results/final_results.json"),
            probation_percent: DEFAULT_PROBATION_PERCENT,
            num_cpus: 0,
        }
    }
}

impl BenchmarkConfig {
    /// Get the path to the user config file
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scorecrab").join("config.json"))
    }

    /// Load the user config, returning defaults if there is none
    #[must_use]
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring unreadable config {}: {e}", path.display()),
                }
            } else {
                tracing::info!("No user config found, using defaults");
            }
        }

        Self::default()
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| ScoreError::io(path, e))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ScoreError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ScoreError::io(path, e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probation_percent) {
            return Err(ScoreError::config(format!(
                "probation_percent must be within [0, 1] (got {})",
                self.probation_percent
            )));
        }
        Ok(())
    }

    /// Thread count for the worker pool
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        if self.num_cpus == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.num_cpus
        }
    }

    /// Results directory of one detector
    #[must_use]
    pub fn detector_dir(&self, detector: &str) -> PathBuf {
        self.results_dir.join(detector)
    }

    /// Summary table written by the scoring step
    #[must_use]
    pub fn summary_path(&self, detector: &str, profile: &str) -> PathBuf {
        self.detector_dir(detector)
            .join(format!("{detector}_{profile}_scores.csv"))
    }
}
