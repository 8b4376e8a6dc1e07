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

//! ScoreCrab scores anomaly-detector output against labeled anomaly windows.
//!
//! The [`sweep`] engine turns one series of anomaly scores into the full
//! threshold-to-score curve in a single pass. [`corpus`], [`config`] and
//! [`core`] wrap it into the optimize, score and normalize steps of a
//! benchmark run over a directory of detector results.

pub mod config;
pub mod core;
pub mod corpus;
pub mod error;
pub mod sweep;

pub use error::{Result, ScoreError};
