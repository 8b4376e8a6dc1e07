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

//! The windowed threshold-sweep scoring engine.

pub mod optimizer;
pub mod point;
pub mod sigmoid;
pub mod sweeper;
pub mod window;

pub use optimizer::{best_row, CorpusSweep};
pub use point::{AnomalyPoint, ThresholdScore, WindowId, WindowTag};
pub use sweeper::{select_row, DataSetScore, Sweeper};
pub use window::Window;
