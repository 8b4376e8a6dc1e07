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

//! Error types shared by the scoring engine, the corpus loaders and the runner.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ScoreCrab operations
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Everything that can make a scoring run fail
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Invalid cost profile, probation percent or benchmark configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input data that cannot be scored (bad labels, mismatched columns, ...)
    #[error("Data error: {0}")]
    Data(String),

    /// Normalization needs the null detector's score for this profile
    #[error("Missing null baseline for profile '{profile}': expected scores in {}", path.display())]
    MissingBaseline { profile: String, path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScoreError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    #[must_use]
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that reject a single file rather than the whole run
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(self, Self::Data(_) | Self::Csv(_))
    }
}
