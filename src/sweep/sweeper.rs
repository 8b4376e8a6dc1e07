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

//! Threshold-sweep scoring.
//!
//! Scoring happens in two passes over a series:
//!
//! 1. [`Sweeper::calc_sweep_score`] annotates every record with the score it
//!    would earn if flagged, based on its position relative to the labeled
//!    windows.
//! 2. [`Sweeper::calc_score_by_threshold`] sorts the annotated records by
//!    anomaly score and walks them once, yielding the total score and
//!    confusion counts for every distinct threshold.

use crate::config::profiles::CostProfile;
use crate::error::{Result, ScoreError};
use crate::sweep::point::{AnomalyPoint, ThresholdScore, WindowId, WindowTag};
use crate::sweep::sigmoid::{max_tp, scaled_sigmoid};
use crate::sweep::window::{resolve_windows, Placement, Window, WindowTracker};
use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// Probation never covers more than this share of a 5000-record series
const PROBATION_CAP_ROWS: f64 = 5000.0;

/// Threshold above every anomaly score; its row means "nothing flagged"
pub const SENTINEL_THRESHOLD: f64 = 1.1;

/// Default share of each series treated as detector warm-up
pub const DEFAULT_PROBATION_PERCENT: f64 = 0.15;

/// Sweep scores of one series and the row selected for a threshold
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetScore {
    /// One sweep score per input record, in record order
    pub sweep_scores: Vec<f64>,
    pub row: ThresholdScore,
}

/// Scores anomaly-score streams against labeled windows for one cost profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweeper {
    probation_percent: f64,
    cost: CostProfile,
}

impl Sweeper {
    pub fn new(probation_percent: f64, cost: CostProfile) -> Result<Self> {
        if !(0.0..=1.0).contains(&probation_percent) {
            return Err(ScoreError::config(format!(
                "probation percent must be within [0, 1] (got {probation_percent})"
            )));
        }
        cost.validate()?;
        Ok(Self {
            probation_percent,
            cost,
        })
    }

    #[must_use]
    pub const fn cost(&self) -> &CostProfile {
        &self.cost
    }

    #[must_use]
    pub const fn probation_percent(&self) -> f64 {
        self.probation_percent
    }

    /// Number of leading records excluded from scoring in a series of
    /// `num_rows` records.
    ///
    /// The cap may be fractional; every record whose index is below it is
    /// probationary, hence the ceiling.
    #[must_use]
    pub fn probationary_length(&self, num_rows: usize) -> usize {
        let by_share = (self.probation_percent * num_rows as f64).floor();
        by_share
            .min(self.probation_percent * PROBATION_CAP_ROWS)
            .ceil() as usize
    }

    /// Annotate every record of one series with its sweep score.
    ///
    /// `series` qualifies the window ids so points of several series can be
    /// swept together.
    pub fn calc_sweep_score(
        &self,
        timestamps: &[NaiveDateTime],
        anomaly_scores: &[f64],
        windows: &[Window],
        series: &str,
    ) -> Result<Vec<AnomalyPoint>> {
        profiling::scope!("calc_sweep_score");

        if timestamps.len() != anomaly_scores.len() {
            return Err(ScoreError::data(format!(
                "{series}: {} timestamps but {} anomaly scores",
                timestamps.len(),
                anomaly_scores.len()
            )));
        }

        let spans = resolve_windows(series, timestamps, windows)?;
        let probationary = self.probationary_length(timestamps.len());
        let max_tp = max_tp();
        let mut tracker = WindowTracker::new(&spans);

        let points = timestamps
            .iter()
            .zip(anomaly_scores)
            .enumerate()
            .map(|(index, (&timestamp, &anomaly_score))| {
                let (sweep_score, tag) = match tracker.step(index) {
                    Placement::Inside { window, position } => (
                        scaled_sigmoid(position) * self.cost.tp_weight / max_tp,
                        WindowTag::Window(window.id.clone()),
                    ),
                    Placement::PastWindow {
                        position: Some(position),
                    } => (scaled_sigmoid(position) * self.cost.fp_weight, WindowTag::Outside),
                    Placement::PastWindow { position: None } | Placement::BeforeFirstWindow => {
                        (-self.cost.fp_weight, WindowTag::Outside)
                    }
                };

                AnomalyPoint {
                    timestamp,
                    anomaly_score,
                    sweep_score,
                    window: if index < probationary {
                        WindowTag::Probationary
                    } else {
                        tag
                    },
                }
            })
            .collect();

        Ok(points)
    }

    /// Score every distinct threshold in one pass.
    ///
    /// Rows come back in descending threshold order, starting with the
    /// [`SENTINEL_THRESHOLD`] row where nothing is flagged.
    #[must_use]
    pub fn calc_score_by_threshold(&self, points: &[AnomalyPoint]) -> Vec<ThresholdScore> {
        profiling::scope!("calc_score_by_threshold");

        let mut scored: Vec<&AnomalyPoint> = points
            .iter()
            .filter(|point| !point.window.is_probationary())
            .collect();

        // Every window starts out as a miss
        let mut window_scores: IndexMap<&WindowId, f64> = IndexMap::new();
        for id in points.iter().filter_map(|point| point.window.window()) {
            window_scores.entry(id).or_insert(-self.cost.fn_weight);
        }

        scored.sort_by(|a, b| b.anomaly_score.total_cmp(&a.anomaly_score));

        let total = scored.len();
        let mut true_positives = 0;
        let mut false_positives = 0;
        let mut false_negatives = scored
            .iter()
            .filter(|point| point.window.window().is_some())
            .count();
        let mut true_negatives = total - false_negatives;
        let mut false_positive_sum = 0.0;

        let mut rows = Vec::new();
        let mut current = SENTINEL_THRESHOLD;

        for point in scored {
            if !same_score(point.anomaly_score, current) {
                rows.push(ThresholdScore {
                    threshold: current,
                    score: window_scores.values().fold(false_positive_sum, |acc, s| acc + s),
                    true_positives,
                    true_negatives,
                    false_positives,
                    false_negatives,
                    total,
                });
                current = point.anomaly_score;
            }

            match point.window.window() {
                Some(id) => {
                    true_positives += 1;
                    false_negatives -= 1;
                    if let Some(best) = window_scores.get_mut(id) {
                        *best = best.max(point.sweep_score);
                    }
                }
                None => {
                    false_positives += 1;
                    true_negatives -= 1;
                    false_positive_sum += point.sweep_score;
                }
            }
        }

        rows.push(ThresholdScore {
            threshold: current,
            score: window_scores.values().fold(false_positive_sum, |acc, s| acc + s),
            true_positives,
            true_negatives,
            false_positives,
            false_negatives,
            total,
        });

        rows
    }

    /// Score one series at a fixed detection threshold
    pub fn score_data_set(
        &self,
        timestamps: &[NaiveDateTime],
        anomaly_scores: &[f64],
        windows: &[Window],
        series: &str,
        threshold: f64,
    ) -> Result<DataSetScore> {
        let points = self.calc_sweep_score(timestamps, anomaly_scores, windows, series)?;
        let rows = self.calc_score_by_threshold(&points);
        let row = select_row(&rows, threshold).ok_or_else(|| {
            ScoreError::data(format!("{series}: no score rows for threshold {threshold}"))
        })?;

        Ok(DataSetScore {
            sweep_scores: points.iter().map(|point| point.sweep_score).collect(),
            row,
        })
    }
}

/// `0.0` and `-0.0` are one score; so is a NaN with itself
fn same_score(a: f64, b: f64) -> bool {
    a == b || a.total_cmp(&b).is_eq()
}

/// Pick the row that applies to `threshold` from a descending curve.
///
/// An exact match wins; otherwise the last row whose threshold is still above
/// the request applies. A request above every threshold gets the first row,
/// one below every threshold gets the last.
#[must_use]
pub fn select_row(rows: &[ThresholdScore], threshold: f64) -> Option<ThresholdScore> {
    for (index, row) in rows.iter().enumerate() {
        if row.threshold == threshold {
            return Some(*row);
        }
        if row.threshold < threshold {
            return Some(rows[index.saturating_sub(1)]);
        }
    }
    rows.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn assert_approx_eq(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(
            delta <= 1e-4,
            "expected {expected}, got {actual} (delta={delta})"
        );
    }

    fn timestamps(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        (0..n)
            .map(|i| start + Duration::minutes(5 * i as i64))
            .collect()
    }

    fn sweeper(tp: f64, fp: f64, fn_: f64) -> Sweeper {
        Sweeper::new(0.0, CostProfile::new(tp, fp, fn_)).expect("valid sweeper")
    }

    fn point(minute: i64, anomaly_score: f64, sweep_score: f64, window: WindowTag) -> AnomalyPoint {
        AnomalyPoint {
            timestamp: timestamps(1)[0] + Duration::minutes(minute),
            anomaly_score,
            sweep_score,
            window,
        }
    }

    #[test]
    fn test_probationary_length() {
        let cases = [
            (100, 0.0, 0),
            (100, 1.0, 100),
            (100, 0.1, 10),
            (100, 0.15, 15),
            (5000, 0.1, 500),
            (6000, 0.1, 500),
            (10000, 0.1001, 501),
            (10000, 0.0001, 1),
            (3, 0.5, 1),
        ];
        for (rows, percent, expected) in cases {
            let sweeper = Sweeper::new(percent, CostProfile::new(1.0, 1.0, 1.0))
                .expect("valid sweeper");
            assert_eq!(
                sweeper.probationary_length(rows),
                expected,
                "rows={rows} percent={percent}"
            );
        }
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let cost = CostProfile::new(1.0, 1.0, 1.0);
        assert!(matches!(Sweeper::new(1.5, cost), Err(ScoreError::Config(_))));
        assert!(matches!(Sweeper::new(-0.1, cost), Err(ScoreError::Config(_))));
        assert!(Sweeper::new(0.15, CostProfile::new(1.0, f64::INFINITY, 1.0)).is_err());
    }

    #[test]
    fn test_length_mismatch_is_data_error() {
        let ts = timestamps(3);
        let err = sweeper(1.0, 1.0, 1.0)
            .calc_sweep_score(&ts, &[0.0, 0.0], &[], "a.csv")
            .expect_err("mismatched columns");
        assert!(err.is_data_error());
    }

    #[test]
    fn test_true_positive_halfway_into_window() {
        let ts = timestamps(7);
        let scores = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let windows = [Window::new(ts[1], ts[2])];

        let result = sweeper(1.1, 0.11, 1.2)
            .score_data_set(&ts, &scores, &windows, "a.csv", 0.5)
            .expect("scoring should succeed");

        assert_approx_eq(
            result.row.score,
            0.848_283_639_957_513_1 * 1.1 / 0.986_614_298_151_430_5,
        );
        assert_eq!(result.row.true_positives, 1);
        assert_eq!(result.row.false_negatives, 1);
        assert_eq!(result.sweep_scores.len(), 7);
    }

    #[test]
    fn test_detection_on_left_edge_earns_full_weight() {
        let ts = timestamps(7);
        let scores = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let windows = [Window::new(ts[4], ts[5])];

        let result = sweeper(1.3, 0.5, 1.0)
            .score_data_set(&ts, &scores, &windows, "a.csv", 1.0)
            .expect("scoring should succeed");
        assert_approx_eq(result.row.score, 1.3);
    }

    #[test]
    fn test_false_positive_after_window() {
        let ts = timestamps(5);
        let windows = [Window::new(ts[1], ts[2])];
        let sweeper = sweeper(1.0, 0.3, 0.7);

        let late = sweeper
            .score_data_set(&ts, &[0.0, 0.0, 0.0, 0.0, 1.0], &windows, "a.csv", 1.0)
            .expect("scoring should succeed");
        assert_approx_eq(late.row.score, -0.999_909_204_262_595_1 * 0.3 - 0.7);

        let early = sweeper
            .score_data_set(&ts, &[0.0, 0.0, 0.0, 1.0, 0.0], &windows, "a.csv", 1.0)
            .expect("scoring should succeed");
        assert_approx_eq(early.row.score, -0.986_614_298_151_430_3 * 0.3 - 0.7);
    }

    #[test]
    fn test_false_positive_without_windows() {
        let ts = timestamps(5);
        let result = sweeper(1.0, 0.3, 0.7)
            .score_data_set(&ts, &[0.0, 1.0, 0.0, 1.0, 0.0], &[], "a.csv", 1.0)
            .expect("scoring should succeed");
        assert_approx_eq(result.row.score, -0.6);
        assert!(result.sweep_scores.iter().all(|&s| s == -0.3));
    }

    #[test]
    fn test_no_windows_no_detections_scores_zero() {
        let ts = timestamps(20);
        let result = sweeper(1.0, 0.11, 1.0)
            .score_data_set(&ts, &[0.0; 20], &[], "a.csv", 0.5)
            .expect("scoring should succeed");
        assert_eq!(result.row.score, 0.0);
        assert_eq!(result.row.true_negatives, 20);
    }

    #[test]
    fn test_missed_window_costs_fn_weight() {
        let ts = timestamps(10);
        let windows = [Window::new(ts[3], ts[6])];
        let result = sweeper(1.0, 0.11, 2.5)
            .score_data_set(&ts, &[0.0; 10], &windows, "a.csv", 0.5)
            .expect("scoring should succeed");
        assert_approx_eq(result.row.score, -2.5);
        assert_eq!(result.row.false_negatives, 4);
    }

    #[test]
    fn test_probation_is_excluded_but_tracked() {
        let ts = timestamps(10);
        let windows = [Window::new(ts[1], ts[3])];
        let sweeper = Sweeper::new(0.2, CostProfile::new(1.0, 1.0, 1.0)).expect("valid sweeper");

        let points = sweeper
            .calc_sweep_score(&ts, &[0.0; 10], &windows, "a.csv")
            .expect("points");
        assert!(points[0].window.is_probationary());
        assert!(points[1].window.is_probationary());
        assert!(points[2].window.window().is_some());

        // The window still opened during probation, so record 2 sits two
        // thirds of the way in
        assert_approx_eq(points[2].sweep_score, scaled_sigmoid(-2.0 / 3.0) / max_tp());

        let rows = sweeper.calc_score_by_threshold(&points);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.total == 8));
    }

    #[test]
    fn test_calc_score_by_threshold_rows() {
        let points = vec![
            point(0, 0.5, -1000.0, WindowTag::Probationary),
            point(1, 0.5, -1000.0, WindowTag::Probationary),
            point(2, 0.0, -3.0, WindowTag::Outside),
            point(4, 0.2, 20.0, WindowTag::Window(WindowId::from("a"))),
            point(5, 0.3, 10.0, WindowTag::Window(WindowId::from("a"))),
            point(6, 0.5, 5.0, WindowTag::Window(WindowId::from("b"))),
            point(7, 0.5, -3.0, WindowTag::Outside),
        ];
        let rows = sweeper(1.0, 1.0, 5.0).calc_score_by_threshold(&points);

        let expected = [
            (1.1, -10.0, 0, 2, 0, 3),
            (0.5, 5.0 - 3.0 - 5.0, 1, 1, 1, 2),
            (0.3, 12.0, 2, 1, 1, 1),
            (0.2, 22.0, 3, 1, 1, 0),
            (0.0, 19.0, 3, 0, 2, 0),
        ];
        assert_eq!(rows.len(), expected.len());
        for (row, (threshold, score, tp, tn, fp, fn_)) in rows.iter().zip(expected) {
            assert_eq!(row.threshold, threshold);
            assert_approx_eq(row.score, score);
            assert_eq!(
                (
                    row.true_positives,
                    row.true_negatives,
                    row.false_positives,
                    row.false_negatives,
                    row.total
                ),
                (tp, tn, fp, fn_, 5)
            );
        }
    }

    #[test]
    fn test_select_row() {
        let points = vec![
            point(0, 0.9, -1.0, WindowTag::Outside),
            point(1, 0.4, -1.0, WindowTag::Outside),
        ];
        let rows = sweeper(1.0, 1.0, 1.0).calc_score_by_threshold(&points);
        let thresholds: Vec<f64> = rows.iter().map(|r| r.threshold).collect();
        assert_eq!(thresholds, vec![1.1, 0.9, 0.4]);

        let pick = |t: f64| select_row(&rows, t).map(|r| r.threshold);
        assert_eq!(pick(0.9), Some(0.9));
        assert_eq!(pick(0.5), Some(0.9));
        assert_eq!(pick(1.0), Some(1.1));
        assert_eq!(pick(0.1), Some(0.4));
        assert_eq!(pick(2.0), Some(1.1));
        assert_eq!(select_row(&[], 0.5), None);
    }

    #[test]
    fn test_fractional_probation_cap_covers_boundary_record() {
        let ts = timestamps(10_000);
        let sweeper = Sweeper::new(0.1001, CostProfile::new(1.0, 1.0, 1.0)).expect("valid sweeper");
        let points = sweeper
            .calc_sweep_score(&ts, &vec![0.0; ts.len()], &[], "a.csv")
            .expect("points");
        assert!(points[500].window.is_probationary());
        assert_eq!(points[501].window, WindowTag::Outside);
    }

    #[test]
    fn test_touching_windows_share_record_with_later_window() {
        let ts = timestamps(7);
        let windows = [Window::new(ts[1], ts[3]), Window::new(ts[3], ts[5])];
        let sweeper = sweeper(1.0, 0.11, 1.0);

        let points = sweeper
            .calc_sweep_score(&ts, &[0.0; 7], &windows, "a.csv")
            .expect("points");
        assert_eq!(points[3].window, points[4].window);
        assert_ne!(points[2].window, points[3].window);
        assert_approx_eq(points[3].sweep_score, 1.0);

        // The later window is caught on its left edge, the earlier one is missed
        let result = sweeper
            .score_data_set(&ts, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], &windows, "a.csv", 0.5)
            .expect("scoring should succeed");
        assert_approx_eq(result.row.score, 0.0);
        assert_eq!(result.row.true_positives, 1);
    }

    #[test]
    fn test_record_after_single_record_window_costs_full_fp_weight() {
        let ts = timestamps(6);
        let windows = [Window::new(ts[2], ts[2])];
        let points = sweeper(1.0, 0.4, 1.0)
            .calc_sweep_score(&ts, &[0.0; 6], &windows, "a.csv")
            .expect("points");

        assert!(points[2].window.window().is_some());
        assert_eq!(points[3].window, WindowTag::Outside);
        assert_eq!(points[3].sweep_score, -0.4);
        assert_eq!(points[5].sweep_score, -0.4);
    }

    #[test]
    fn test_signed_zero_scores_share_a_row() {
        let points = vec![
            point(0, 0.0, -1.0, WindowTag::Outside),
            point(1, -0.0, -1.0, WindowTag::Outside),
        ];
        let rows = sweeper(1.0, 1.0, 1.0).calc_score_by_threshold(&points);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].false_positives, 2);
    }
}
