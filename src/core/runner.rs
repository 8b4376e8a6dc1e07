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

//! Benchmark driver: optimize thresholds, score detectors, normalize.
//!
//! Files of a detector corpus are processed on a rayon pool. A file that
//! cannot be scored is logged, recorded in [`Runner::failures`] and left out;
//! its siblings are still scored.

use crate::config::profiles::Profiles;
use crate::config::BenchmarkConfig;
use crate::core::registry::{FinalResults, ThresholdEntry, ThresholdRegistry};
use crate::core::summary::{read_totals, ScoreSummary};
use crate::corpus::labels::CorpusLabels;
use crate::corpus::{data_path_for_result, Corpus, DataSet};
use crate::error::{Result, ScoreError};
use crate::sweep::optimizer::CorpusSweep;
use crate::sweep::point::{AnomalyPoint, ThresholdScore};
use crate::sweep::sweeper::{DataSetScore, Sweeper};
use crate::sweep::window::Window;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Detector whose scores anchor the normalized scale at zero
pub const NULL_DETECTOR: &str = "null";

const SUMMARY_SUFFIX: &str = "_scores.csv";

/// A file left out of a step, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub detector: String,
    pub file: String,
    pub reason: String,
}

/// Map a raw corpus score onto the null-to-perfect scale
#[must_use]
pub fn normalize_score(raw: f64, null: f64, perfect: f64) -> f64 {
    100.0 * (raw - null) / (perfect - null)
}

pub struct Runner {
    config: BenchmarkConfig,
    labels: CorpusLabels,
    profiles: Profiles,
    pool: Option<rayon::ThreadPool>,
    failures: Vec<FileFailure>,
}

impl Runner {
    #[must_use]
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            labels: CorpusLabels::default(),
            profiles: Profiles::default(),
            pool: None,
            failures: Vec::new(),
        }
    }

    /// Load labels and profiles and start the worker pool
    pub fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        self.labels = CorpusLabels::load(&self.config.label_path)?;
        self.profiles = Profiles::load(&self.config.profiles_path)?;
        if self.profiles.is_empty() {
            return Err(ScoreError::config(format!(
                "{} defines no cost profiles",
                self.config.profiles_path.display()
            )));
        }

        if self.config.data_dir.is_dir() {
            let data = Corpus::load(&self.config.data_dir)?;
            if let Err(e) = self.labels.validate_against(&data) {
                tracing::warn!("Labels do not match {}: {e}", self.config.data_dir.display());
            }
        }

        let threads = self.config.worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("scorecrab-worker-{i}"))
            .build()
            .map_err(|e| ScoreError::config(format!("failed to start worker pool: {e}")))?;
        self.pool = Some(pool);

        tracing::info!(
            "Runner initialized: {} profiles, {} labeled files, {threads} worker threads",
            self.profiles.len(),
            self.labels.files().count()
        );
        Ok(())
    }

    #[must_use]
    pub const fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    #[must_use]
    pub const fn profiles(&self) -> &Profiles {
        &self.profiles
    }

    #[must_use]
    pub const fn labels(&self) -> &CorpusLabels {
        &self.labels
    }

    /// Files left out of any step so far
    #[must_use]
    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    /// Detector names under the results directory, sorted
    pub fn discover_detectors(&self) -> Result<Vec<String>> {
        let results_dir = &self.config.results_dir;
        let entries =
            std::fs::read_dir(results_dir).map_err(|e| ScoreError::io(results_dir, e))?;

        let mut detectors = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScoreError::io(results_dir, e))?;
            if entry.file_type().is_ok_and(|kind| kind.is_dir()) {
                detectors.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(detectors.into_iter().collect())
    }

    /// Find the corpus-optimal threshold of every detector under every
    /// profile and merge them into the threshold registry
    pub fn optimize(&mut self, detectors: &[String]) -> Result<ThresholdRegistry> {
        profiling::scope!("Runner::optimize");
        tracing::info!("Running optimize step");

        let mut found = ThresholdRegistry::default();
        let mut failures = Vec::new();
        for detector in detectors {
            let corpus = self.load_results(detector)?;

            for (profile, cost) in self.profiles.iter() {
                let sweeper = Sweeper::new(self.config.probation_percent, *cost)?;
                let combined = self.sweep_corpus(detector, &corpus, sweeper, None, &mut failures)?;

                if let Some(best) = combined.best() {
                    tracing::info!(
                        "Optimizer found a max score of {:.4} with threshold {} for {detector}/{profile} over {} files",
                        best.score,
                        best.threshold,
                        combined.series_count()
                    );
                    found.insert(
                        detector,
                        profile,
                        ThresholdEntry {
                            threshold: best.threshold,
                            score: best.score,
                        },
                    );
                }
            }
        }

        self.failures.extend(failures);
        ThresholdRegistry::update_file(&self.config.threshold_path, &found)?;
        Ok(found)
    }

    /// Threshold curve of one detector under one profile, over its whole
    /// results corpus or a single results file
    pub fn curve(
        &mut self,
        detector: &str,
        profile: &str,
        file: Option<&str>,
    ) -> Result<Vec<ThresholdScore>> {
        let cost = *self
            .profiles
            .get(profile)
            .ok_or_else(|| ScoreError::config(format!("unknown profile '{profile}'")))?;
        let corpus = self.load_results(detector)?;
        if let Some(file) = file.filter(|f| corpus.get(f).is_none()) {
            return Err(ScoreError::data(format!(
                "{file} is not a results file of {detector}"
            )));
        }

        let sweeper = Sweeper::new(self.config.probation_percent, cost)?;
        let mut failures = Vec::new();
        let combined = self.sweep_corpus(detector, &corpus, sweeper, file, &mut failures)?;
        self.failures.extend(failures);
        Ok(combined.curve())
    }

    /// Score every detector at its registered threshold, write the per-record
    /// `S(t)_<profile>` columns back into the results files and write one
    /// summary table per detector and profile
    pub fn score(
        &mut self,
        detectors: &[String],
        thresholds: &ThresholdRegistry,
    ) -> Result<Vec<ScoreSummary>> {
        profiling::scope!("Runner::score");
        tracing::info!("Running scoring step");

        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        for detector in detectors {
            let mut corpus = self.load_results(detector)?;
            let mut touched = BTreeSet::new();

            for (profile, cost) in self.profiles.iter() {
                let entry = thresholds.get(detector, profile).ok_or_else(|| {
                    ScoreError::config(format!(
                        "no threshold registered for {detector}/{profile}; run the optimize step first"
                    ))
                })?;
                let sweeper = Sweeper::new(self.config.probation_percent, *cost)?;

                let outcomes = self.on_pool(|| {
                    result_files(&corpus)
                        .par_iter()
                        .map(|(file, data)| {
                            (
                                (*file).to_string(),
                                self.score_file(detector, &sweeper, file, data, entry.threshold),
                            )
                        })
                        .collect::<Vec<_>>()
                })?;

                let mut summary = ScoreSummary::new(detector, profile, entry.threshold);
                let column = format!("S(t)_{profile}");
                for (file, outcome) in outcomes {
                    let scored = outcome.and_then(|scored| {
                        corpus
                            .get_mut(&file)
                            .ok_or_else(|| ScoreError::data(format!("{file} vanished from corpus")))?
                            .add_column(&column, &scored.sweep_scores)?;
                        Ok(scored)
                    });
                    match scored {
                        Ok(scored) => {
                            summary.push(&file, &scored.row);
                            touched.insert(file);
                        }
                        Err(e) => failures.push(failure(detector, &file, &e)),
                    }
                }

                summary.write(&self.config.summary_path(detector, profile))?;
                tracing::info!(
                    "{detector}/{profile}: total score {:.4} over {} files",
                    summary.totals().score,
                    summary.rows.len()
                );
                summaries.push(summary);
            }

            let written = self.on_pool(|| {
                corpus
                    .data_sets_mut()
                    .filter(|data| touched.contains(data.relative_path()))
                    .collect::<Vec<&mut DataSet>>()
                    .into_par_iter()
                    .map(|data| data.write().map_err(|e| (data.relative_path().to_string(), e)))
                    .collect::<Vec<_>>()
            })?;
            for outcome in written {
                if let Err((file, e)) = outcome {
                    failures.push(failure(detector, &file, &e));
                }
            }
        }

        self.failures.extend(failures);
        Ok(summaries)
    }

    /// Normalize every detector's total score against the null baseline and
    /// a perfect detector, and write the final results registry
    pub fn normalize(&self, detectors: &[String]) -> Result<FinalResults> {
        profiling::scope!("Runner::normalize");
        tracing::info!("Running normalize step");

        let total_windows = self.labels.total_windows() as f64;
        let mut results = FinalResults::default();

        for (profile, cost) in self.profiles.iter() {
            let baseline_path = self.config.summary_path(NULL_DETECTOR, profile);
            if !baseline_path.exists() {
                return Err(ScoreError::MissingBaseline {
                    profile: profile.to_string(),
                    path: baseline_path,
                });
            }
            let null = read_totals(&baseline_path)?.score;
            let perfect = total_windows * cost.tp_weight;
            if perfect == null {
                return Err(ScoreError::data(format!(
                    "profile '{profile}': perfect and null scores are both {null}"
                )));
            }

            for detector in detectors {
                let raw = read_totals(&self.config.summary_path(detector, profile))?.score;
                let normalized = normalize_score(raw, null, perfect);
                tracing::info!("Final score for '{detector}' under '{profile}': {normalized:.2}");
                results.insert(detector, profile, normalized);
            }
        }

        results.save(&self.config.final_results_path)?;
        Ok(results)
    }

    fn load_results(&mut self, detector: &str) -> Result<Corpus> {
        let corpus = Corpus::load(&self.config.detector_dir(detector))?;
        let rejected: Vec<FileFailure> = corpus
            .rejected()
            .iter()
            .map(|(file, reason)| FileFailure {
                detector: detector.to_string(),
                file: file.clone(),
                reason: reason.clone(),
            })
            .collect();
        self.failures.extend(rejected);
        Ok(corpus)
    }

    /// Sweep points of every results file (or just `only`), combined
    fn sweep_corpus(
        &self,
        detector: &str,
        corpus: &Corpus,
        sweeper: Sweeper,
        only: Option<&str>,
        failures: &mut Vec<FileFailure>,
    ) -> Result<CorpusSweep> {
        let outcomes = self.on_pool(|| {
            result_files(corpus)
                .par_iter()
                .filter(|(file, _)| only.is_none_or(|wanted| wanted == *file))
                .map(|(file, data)| {
                    (
                        (*file).to_string(),
                        self.sweep_file(detector, &sweeper, file, data),
                    )
                })
                .collect::<Vec<_>>()
        })?;

        let mut combined = CorpusSweep::new(sweeper);
        for (file, outcome) in outcomes {
            match outcome {
                Ok(points) => combined.add_series(points),
                Err(e) => failures.push(failure(detector, &file, &e)),
            }
        }
        Ok(combined)
    }

    fn on_pool<T: Send>(&self, work: impl FnOnce() -> T + Send) -> Result<T> {
        self.pool
            .as_ref()
            .map(|pool| pool.install(work))
            .ok_or_else(|| ScoreError::config("runner used before initialize()"))
    }

    fn series_windows<'a>(
        &'a self,
        detector: &str,
        file: &str,
    ) -> Result<(String, &'a [Window])> {
        let series = data_path_for_result(file, detector);
        if !self.labels.contains(&series) {
            return Err(ScoreError::data(format!("{file}: no labels for {series}")));
        }
        let windows = self.labels.windows_for(&series);
        Ok((series, windows))
    }

    fn sweep_file(
        &self,
        detector: &str,
        sweeper: &Sweeper,
        file: &str,
        data: &DataSet,
    ) -> Result<Vec<AnomalyPoint>> {
        let (series, windows) = self.series_windows(detector, file)?;
        sweeper.calc_sweep_score(&data.timestamps()?, &data.anomaly_scores()?, windows, &series)
    }

    fn score_file(
        &self,
        detector: &str,
        sweeper: &Sweeper,
        file: &str,
        data: &DataSet,
        threshold: f64,
    ) -> Result<DataSetScore> {
        let (series, windows) = self.series_windows(detector, file)?;
        sweeper.score_data_set(
            &data.timestamps()?,
            &data.anomaly_scores()?,
            windows,
            &series,
            threshold,
        )
    }
}

/// Results tables of a detector corpus, without its summary tables
fn result_files(corpus: &Corpus) -> Vec<(&str, &DataSet)> {
    corpus
        .iter()
        .filter(|(file, _)| !file.ends_with(SUMMARY_SUFFIX))
        .collect()
}

fn failure(detector: &str, file: &str, error: &ScoreError) -> FileFailure {
    tracing::error!("{detector}: skipping {file}: {error}");
    FileFailure {
        detector: detector.to_string(),
        file: file.to_string(),
        reason: error.to_string(),
    }
}
