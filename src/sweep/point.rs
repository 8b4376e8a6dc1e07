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

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Series-qualified window identifier, rendered as `<series>|<window start>`.
///
/// Two series never share an id, so points from a whole corpus can be
/// swept together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(Arc<str>);

impl WindowId {
    #[must_use]
    pub fn new(series: &str, start: NaiveDateTime) -> Self {
        Self(Arc::from(format!(
            "{series}|{}",
            crate::corpus::timestamp::format_timestamp(start)
        )))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WindowId {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which labeled region a record belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowTag {
    /// Not inside any labeled window
    Outside,
    /// Inside the warm-up prefix; never scored
    Probationary,
    /// Inside the given window
    Window(WindowId),
}

impl WindowTag {
    #[must_use]
    pub const fn is_probationary(&self) -> bool {
        matches!(self, Self::Probationary)
    }

    #[must_use]
    pub const fn window(&self) -> Option<&WindowId> {
        match self {
            Self::Window(id) => Some(id),
            Self::Outside | Self::Probationary => None,
        }
    }
}

/// One scored record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyPoint {
    pub timestamp: NaiveDateTime,
    /// Raw detector output, any real value
    pub anomaly_score: f64,
    /// Weighted score this record earns if it is flagged as a detection
    pub sweep_score: f64,
    pub window: WindowTag,
}

/// Score and confusion counts achieved with one detection threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdScore {
    pub threshold: f64,
    pub score: f64,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_window_id_is_series_qualified() {
        let start = NaiveDate::from_ymd_opt(2014, 4, 10)
            .and_then(|d| d.and_hms_opt(7, 15, 0))
            .expect("valid date");
        let a = WindowId::new("realKnownCause/nyc_taxi.csv", start);
        let b = WindowId::new("realKnownCause/ec2_request_latency.csv", start);

        assert_eq!(a.as_str(), "realKnownCause/nyc_taxi.csv|2014-04-10 07:15:00.000000");
        assert_ne!(a, b);
    }

    #[test]
    fn test_window_tag_accessors() {
        let id = WindowId::from("series|start");
        assert_eq!(WindowTag::Window(id.clone()).window(), Some(&id));
        assert_eq!(WindowTag::Outside.window(), None);
        assert!(WindowTag::Probationary.is_probationary());
        assert!(!WindowTag::Outside.is_probationary());
    }
}
