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

use crate::error::{Result, ScoreError};
use crate::sweep::point::ThresholdScore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File column value of the row that sums a whole summary
pub const TOTALS_ROW: &str = "Totals";

/// One line of a `<detector>_<profile>_scores.csv` summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Detector")]
    pub detector: String,
    #[serde(rename = "Profile")]
    pub profile: String,
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Threshold")]
    pub threshold: f64,
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "TP")]
    pub true_positives: usize,
    #[serde(rename = "TN")]
    pub true_negatives: usize,
    #[serde(rename = "FP")]
    pub false_positives: usize,
    #[serde(rename = "FN")]
    pub false_negatives: usize,
    #[serde(rename = "Total_Count")]
    pub total: usize,
}

impl SummaryRow {
    #[must_use]
    pub fn from_score(detector: &str, profile: &str, file: &str, row: &ThresholdScore) -> Self {
        Self {
            detector: detector.to_string(),
            profile: profile.to_string(),
            file: file.to_string(),
            threshold: row.threshold,
            score: row.score,
            true_positives: row.true_positives,
            true_negatives: row.true_negatives,
            false_positives: row.false_positives,
            false_negatives: row.false_negatives,
            total: row.total,
        }
    }
}

/// Per-file scores of one detector under one profile
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub detector: String,
    pub profile: String,
    pub threshold: f64,
    pub rows: Vec<SummaryRow>,
}

impl ScoreSummary {
    #[must_use]
    pub fn new(detector: &str, profile: &str, threshold: f64) -> Self {
        Self {
            detector: detector.to_string(),
            profile: profile.to_string(),
            threshold,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, file: &str, row: &ThresholdScore) {
        self.rows
            .push(SummaryRow::from_score(&self.detector, &self.profile, file, row));
    }

    /// Sum of every file's score and counts
    #[must_use]
    pub fn totals(&self) -> SummaryRow {
        self.rows.iter().fold(
            SummaryRow {
                detector: self.detector.clone(),
                profile: self.profile.clone(),
                file: TOTALS_ROW.to_string(),
                threshold: self.threshold,
                score: 0.0,
                true_positives: 0,
                true_negatives: 0,
                false_positives: 0,
                false_negatives: 0,
                total: 0,
            },
            |mut acc, row| {
                acc.score += row.score;
                acc.true_positives += row.true_positives;
                acc.true_negatives += row.true_negatives;
                acc.false_positives += row.false_positives;
                acc.false_negatives += row.false_negatives;
                acc.total += row.total;
                acc
            },
        )
    }

    /// Write the per-file rows followed by the totals row
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ScoreError::io(parent, e))?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.serialize(self.totals())?;
        writer.flush().map_err(|e| ScoreError::io(path, e))?;

        tracing::info!(
            "{} detector scores for profile '{}' written to {}",
            self.detector,
            self.profile,
            path.display()
        );
        Ok(())
    }
}

/// Read the totals row of a summary written by [`ScoreSummary::write`]
pub fn read_totals(path: &Path) -> Result<SummaryRow> {
    let mut reader = csv::Reader::from_path(path)?;
    for row in reader.deserialize::<SummaryRow>() {
        let row = row?;
        if row.file == TOTALS_ROW {
            return Ok(row);
        }
    }
    Err(ScoreError::data(format!(
        "{}: no '{TOTALS_ROW}' row",
        path.display()
    )))
}
