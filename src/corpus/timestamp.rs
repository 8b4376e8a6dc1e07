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
use chrono::NaiveDateTime;

// 2014-04-10 07:15:00 or 2014-04-10 07:15:00.000000
const SPACE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
// 2014-04-10T07:15:00.000
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Parse a corpus timestamp (space or `T` separated, optional fraction)
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, SPACE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, ISO_FORMAT))
        .map_err(|e| ScoreError::data(format!("invalid timestamp '{trimmed}': {e}")))
}

/// Render a timestamp the way label files write them
#[must_use]
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(OUTPUT_FORMAT).to_string()
}
