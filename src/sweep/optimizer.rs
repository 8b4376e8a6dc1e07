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

use crate::sweep::point::{AnomalyPoint, ThresholdScore};
use crate::sweep::sweeper::Sweeper;

/// Annotated points of many series, swept as one corpus
#[derive(Debug, Clone)]
pub struct CorpusSweep {
    sweeper: Sweeper,
    points: Vec<AnomalyPoint>,
    series: usize,
}

impl CorpusSweep {
    #[must_use]
    pub const fn new(sweeper: Sweeper) -> Self {
        Self {
            sweeper,
            points: Vec::new(),
            series: 0,
        }
    }

    /// Append the points of one series; window ids must already be
    /// qualified by the series name
    pub fn add_series(&mut self, points: Vec<AnomalyPoint>) {
        self.points.extend(points);
        self.series += 1;
    }

    #[must_use]
    pub const fn series_count(&self) -> usize {
        self.series
    }

    /// Threshold curve over all series combined
    #[must_use]
    pub fn curve(&self) -> Vec<ThresholdScore> {
        self.sweeper.calc_score_by_threshold(&self.points)
    }

    /// Row with the highest corpus score
    #[must_use]
    pub fn best(&self) -> Option<ThresholdScore> {
        profiling::scope!("CorpusSweep::best");
        let best = best_row(&self.curve());
        if let Some(row) = &best {
            tracing::debug!(
                "Best threshold over {} series: {} (score {:.4})",
                self.series_count(),
                row.threshold,
                row.score
            );
        }
        best
    }
}

/// Highest-scoring row of a descending curve.
///
/// On a tie the earlier row wins, i.e. the higher threshold.
#[must_use]
pub fn best_row(rows: &[ThresholdScore]) -> Option<ThresholdScore> {
    rows.iter().copied().fold(None, |best, row| match best {
        Some(current) if !row.score.total_cmp(&current.score).is_gt() => Some(current),
        _ => Some(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profiles::CostProfile;
    use crate::sweep::window::Window;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn timestamps(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2014, 2, 14)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .expect("valid date");
        (0..n)
            .map(|i| start + Duration::minutes(5 * i as i64))
            .collect()
    }

    fn row(threshold: f64, score: f64) -> ThresholdScore {
        ThresholdScore {
            threshold,
            score,
            true_positives: 0,
            true_negatives: 0,
            false_positives: 0,
            false_negatives: 0,
            total: 0,
        }
    }

    #[test]
    fn test_best_row_prefers_higher_threshold_on_tie() {
        let rows = [row(1.1, -1.0), row(0.8, 2.0), row(0.5, 2.0), row(0.1, 1.0)];
        let best = best_row(&rows).expect("non-empty curve");
        assert_eq!(best.threshold, 0.8);
        assert_eq!(best_row(&[]), None);
    }

    #[test]
    fn test_corpus_sweep_combines_series() {
        let sweeper = Sweeper::new(0.0, CostProfile::new(1.0, 0.11, 1.0)).expect("valid sweeper");
        let ts = timestamps(10);
        let windows = [Window::new(ts[4], ts[6])];

        let mut corpus = CorpusSweep::new(sweeper);
        let mut first = vec![0.0; 10];
        first[4] = 0.9;
        let mut second = vec![0.0; 10];
        second[4] = 0.6;

        for (name, scores) in [("a.csv", &first), ("b.csv", &second)] {
            let points = sweeper
                .calc_sweep_score(&ts, scores, &windows, name)
                .expect("points");
            corpus.add_series(points);
        }
        assert_eq!(corpus.series_count(), 2);
        assert_eq!(corpus.curve()[0].total, 20);

        // Both windows are only caught once the threshold reaches 0.6
        let best = corpus.best().expect("curve has rows");
        assert_eq!(best.threshold, 0.6);
        assert!((best.score - 2.0).abs() < 1e-9);
        assert_eq!(best.true_positives, 2);
        assert_eq!(best.false_negatives, 4);
    }
}
