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

//! Labeled anomaly windows and the state machine that walks them.

use crate::corpus::timestamp::format_timestamp;
use crate::error::{Result, ScoreError};
use crate::sweep::point::WindowId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Ground-truth anomaly window `[start, end]`, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    #[must_use]
    pub const fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }
}

/// A window resolved to record indices of one series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpan {
    pub id: WindowId,
    /// First record inside the window
    pub left: usize,
    /// Last record inside the window
    pub right: usize,
}

impl WindowSpan {
    /// Number of records covered by the window
    #[must_use]
    pub const fn width(&self) -> usize {
        self.right - self.left + 1
    }
}

/// Resolve every window boundary to a record index.
///
/// Windows must be chronological and non-overlapping; the end of one window
/// may coincide with the start of the next, which then owns that record. A
/// boundary that does not match any record timestamp rejects the whole
/// series.
pub fn resolve_windows(
    series: &str,
    timestamps: &[NaiveDateTime],
    windows: &[Window],
) -> Result<Vec<WindowSpan>> {
    let find = |boundary: NaiveDateTime| {
        timestamps.iter().position(|&ts| ts == boundary).ok_or_else(|| {
            ScoreError::data(format!(
                "{series}: window boundary {} does not exist in the series",
                format_timestamp(boundary)
            ))
        })
    };

    let mut spans: Vec<WindowSpan> = Vec::with_capacity(windows.len());
    let mut previous: Option<&Window> = None;

    for window in windows {
        if window.start > window.end {
            return Err(ScoreError::data(format!(
                "{series}: window [{}, {}] ends before it starts",
                format_timestamp(window.start),
                format_timestamp(window.end)
            )));
        }
        if let Some(prev) = previous {
            if window.start <= prev.start {
                return Err(ScoreError::data(format!(
                    "{series}: windows are not in chronological order ({} listed after {})",
                    format_timestamp(window.start),
                    format_timestamp(prev.start)
                )));
            }
            if window.start < prev.end {
                return Err(ScoreError::data(format!(
                    "{series}: window starting at {} overlaps the window ending at {}",
                    format_timestamp(window.start),
                    format_timestamp(prev.end)
                )));
            }
        }

        let left = find(window.start)?;
        let right = find(window.end)?;
        if right < left {
            return Err(ScoreError::data(format!(
                "{series}: window [{}, {}] runs backwards through the series",
                format_timestamp(window.start),
                format_timestamp(window.end)
            )));
        }

        spans.push(WindowSpan {
            id: WindowId::new(series, window.start),
            left,
            right,
        });
        previous = Some(window);
    }

    Ok(spans)
}

/// Where a record sits relative to the labeled windows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement<'a> {
    /// Inside `window`; `position` runs from `-1.0` (left edge) towards `0.0`
    Inside { window: &'a WindowSpan, position: f64 },
    /// After the most recently closed window.
    ///
    /// `position` is the distance past its right edge as a fraction of its
    /// width, or `None` when that window covered a single record and the
    /// distance is undefined.
    PastWindow { position: Option<f64> },
    /// No window has closed yet
    BeforeFirstWindow,
}

#[derive(Debug, Clone, Copy)]
struct ClosedWindow {
    right: usize,
    width: usize,
}

/// Walks a series record by record, tracking the open window and the most
/// recently closed one.
///
/// Windows are consumed left to right through an index pointer; the span
/// slice itself is never modified.
#[derive(Debug)]
pub struct WindowTracker<'a> {
    spans: &'a [WindowSpan],
    next: usize,
    current: Option<&'a WindowSpan>,
    previous: Option<ClosedWindow>,
}

impl<'a> WindowTracker<'a> {
    #[must_use]
    pub const fn new(spans: &'a [WindowSpan]) -> Self {
        Self {
            spans,
            next: 0,
            current: None,
            previous: None,
        }
    }

    /// Place record `index`. Must be called with consecutive indices from 0.
    ///
    /// A window opens on its left edge, before the record is placed, and
    /// closes after its right edge has been placed. When the next window
    /// starts on the right edge of the open one, the shared record belongs to
    /// the next window and the open one is dropped without becoming the
    /// previous window.
    pub fn step(&mut self, index: usize) -> Placement<'a> {
        self.enter(index);

        let placement = self.current.map_or_else(
            || self.past_window(index),
            |window| {
                let remaining = (window.right - index + 1) as f64;
                Placement::Inside {
                    window,
                    position: -remaining / window.width() as f64,
                }
            },
        );

        self.exit(index);
        placement
    }

    fn past_window(&self, index: usize) -> Placement<'a> {
        match self.previous {
            None => Placement::BeforeFirstWindow,
            Some(closed) if closed.width <= 1 => Placement::PastWindow { position: None },
            Some(closed) => Placement::PastWindow {
                position: Some(closed.right.abs_diff(index) as f64 / (closed.width - 1) as f64),
            },
        }
    }

    fn enter(&mut self, index: usize) {
        let Some(upcoming) = self.spans.get(self.next) else {
            return;
        };
        if upcoming.left != index {
            return;
        }
        if let Some(open) = self.current {
            tracing::debug!("Window {} cut short by {}", open.id, upcoming.id);
        }
        tracing::debug!(
            "Entering window: {} (records {}..={})",
            upcoming.id,
            upcoming.left,
            upcoming.right
        );
        self.current = Some(upcoming);
        self.next += 1;
    }

    fn exit(&mut self, index: usize) {
        if let Some(open) = self.current.filter(|open| open.right == index) {
            tracing::debug!("Exiting window: {}", open.id);
            self.previous = Some(ClosedWindow {
                right: open.right,
                width: open.width(),
            });
            self.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn timestamps(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2016, 7, 5)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid date");
        (0..n)
            .map(|i| start + Duration::minutes(5 * i as i64))
            .collect()
    }

    fn span(left: usize, right: usize) -> WindowSpan {
        WindowSpan {
            id: WindowId::from(format!("test|{left}").as_str()),
            left,
            right,
        }
    }

    #[test]
    fn test_resolve_windows_to_indices() {
        let ts = timestamps(10);
        let windows = [Window::new(ts[1], ts[2]), Window::new(ts[5], ts[8])];

        let spans = resolve_windows("data.csv", &ts, &windows).expect("windows should resolve");
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].left, spans[0].right, spans[0].width()), (1, 2, 2));
        assert_eq!((spans[1].left, spans[1].right, spans[1].width()), (5, 8, 4));
        assert!(spans[0].id.as_str().starts_with("data.csv|"));
    }

    #[test]
    fn test_resolve_rejects_missing_boundary() {
        let ts = timestamps(10);
        let missing = ts[9] + Duration::minutes(5);
        let err = resolve_windows("data.csv", &ts, &[Window::new(ts[8], missing)])
            .expect_err("boundary outside the series must be rejected");
        assert!(err.is_data_error());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_rejects_overlap_and_disorder() {
        let ts = timestamps(10);

        let overlapping = [Window::new(ts[1], ts[4]), Window::new(ts[3], ts[6])];
        let err = resolve_windows("a", &ts, &overlapping).expect_err("overlap must fail");
        assert!(err.to_string().contains("overlaps"));

        let unordered = [Window::new(ts[6], ts[7]), Window::new(ts[1], ts[2])];
        let err = resolve_windows("a", &ts, &unordered).expect_err("disorder must fail");
        assert!(err.to_string().contains("chronological"));

        // A second window on the same start record could never be entered
        let same_start = [Window::new(ts[2], ts[2]), Window::new(ts[2], ts[4])];
        let err = resolve_windows("a", &ts, &same_start).expect_err("repeated start must fail");
        assert!(err.to_string().contains("chronological"));

        let backwards = [Window::new(ts[4], ts[2])];
        let err = resolve_windows("a", &ts, &backwards).expect_err("reversed window must fail");
        assert!(err.to_string().contains("ends before it starts"));
    }

    #[test]
    fn test_resolve_accepts_shared_boundary() {
        let ts = timestamps(10);
        let touching = [Window::new(ts[1], ts[3]), Window::new(ts[3], ts[5])];
        let spans = resolve_windows("a", &ts, &touching).expect("touching windows are allowed");
        assert_eq!(spans[0].right, spans[1].left);
    }

    #[test]
    fn test_tracker_positions() {
        let spans = [span(2, 5)];
        let mut tracker = WindowTracker::new(&spans);

        assert_eq!(tracker.step(0), Placement::BeforeFirstWindow);
        assert_eq!(tracker.step(1), Placement::BeforeFirstWindow);

        let Placement::Inside { position, .. } = tracker.step(2) else {
            unreachable!("record 2 opens the window");
        };
        assert_eq!(position, -1.0);
        let Placement::Inside { position, .. } = tracker.step(3) else {
            unreachable!("record 3 is inside the window");
        };
        assert_eq!(position, -0.75);
        tracker.step(4);
        let Placement::Inside { position, .. } = tracker.step(5) else {
            unreachable!("record 5 is the right edge");
        };
        assert_eq!(position, -0.25);

        // Width 4, so one record past the edge is a third of the way out
        assert_eq!(tracker.step(6), Placement::PastWindow { position: Some(1.0 / 3.0) });
        assert_eq!(tracker.step(8), Placement::PastWindow { position: Some(1.0) });
    }

    #[test]
    fn test_tracker_single_record_window_has_no_distance() {
        let spans = [span(1, 1)];
        let mut tracker = WindowTracker::new(&spans);
        tracker.step(0);
        assert!(matches!(tracker.step(1), Placement::Inside { .. }));
        assert_eq!(tracker.step(2), Placement::PastWindow { position: None });
    }

    #[test]
    fn test_tracker_shared_boundary_belongs_to_next_window() {
        let spans = [span(1, 3), span(3, 5)];
        let mut tracker = WindowTracker::new(&spans);
        assert_eq!(tracker.step(0), Placement::BeforeFirstWindow);
        tracker.step(1);
        tracker.step(2);

        let Placement::Inside { window, position } = tracker.step(3) else {
            unreachable!("record 3 opens the second window");
        };
        assert_eq!(window.left, 3);
        assert_eq!(position, -1.0);

        let Placement::Inside { window, position } = tracker.step(4) else {
            unreachable!("record 4 is inside the second window");
        };
        assert_eq!(window.left, 3);
        assert_eq!(position, -2.0 / 3.0);
        tracker.step(5);

        // Only the second window counts as closed: width 3, one record out
        assert_eq!(tracker.step(6), Placement::PastWindow { position: Some(0.5) });
    }
}
