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

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scorecrab::config::profiles::CostProfile;
use scorecrab::sweep::{Sweeper, Window};

fn series(n: usize) -> (Vec<NaiveDateTime>, Vec<f64>, Vec<Window>) {
    let start = NaiveDate::from_ymd_opt(2014, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date");
    let timestamps: Vec<NaiveDateTime> = (0..n)
        .map(|i| start + Duration::minutes(5 * i as i64))
        .collect();
    let scores = (0..n)
        .map(|i| ((i as f64 * 0.37).sin() + 1.0) / 2.0)
        .collect();

    // One window of 10% width per fifth of the series
    let width = n / 10;
    let windows = (0..5)
        .map(|k| {
            let left = k * n / 5 + n / 20;
            Window::new(timestamps[left], timestamps[left + width - 1])
        })
        .collect();
    (timestamps, scores, windows)
}

fn bench_threshold_sweep(c: &mut Criterion) {
    let sweeper = Sweeper::new(0.15, CostProfile::new(1.0, 0.11, 1.0)).expect("valid sweeper");
    let mut group = c.benchmark_group("threshold_sweep");

    for n in [1_000_usize, 10_000, 100_000] {
        let (timestamps, scores, windows) = series(n);

        group.bench_with_input(BenchmarkId::new("calc_sweep_score", n), &n, |b, _| {
            b.iter(|| {
                sweeper
                    .calc_sweep_score(
                        black_box(&timestamps),
                        black_box(&scores),
                        &windows,
                        "bench.csv",
                    )
                    .expect("sweep should succeed")
            });
        });

        let points = sweeper
            .calc_sweep_score(&timestamps, &scores, &windows, "bench.csv")
            .expect("sweep should succeed");
        group.bench_with_input(BenchmarkId::new("calc_score_by_threshold", n), &n, |b, _| {
            b.iter(|| sweeper.calc_score_by_threshold(black_box(&points)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_threshold_sweep);
criterion_main!(benches);
