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

//! Position-sensitive scoring curve.
//!
//! Relative positions are signed fractions of a window width:
//!
//! * `-1.0` is the window's left edge (earliest credit, `≈ 0.98661`)
//! * `-0.5` is halfway into the window (`≈ 0.84828`)
//! * `0.0` is the window's right edge (`0.0`)
//! * `> 0.0` is the distance past the right edge of the previous window,
//!   approaching `-1.0`; anything beyond `3.0` is clamped to `-1.0`

/// Positions further than this past a window score as a full false positive
const FAR_PAST_WINDOW: f64 = 3.0;

/// Standard logistic function
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Map a relative window position to a score in `[-1, 1]`
#[must_use]
pub fn scaled_sigmoid(relative_position: f64) -> f64 {
    if relative_position > FAR_PAST_WINDOW {
        -1.0
    } else {
        2.0 * sigmoid(-5.0 * relative_position) - 1.0
    }
}

/// Score of a detection on a window's left edge.
///
/// True-positive scores are divided by this so the earliest possible
/// detection is worth exactly the profile's `tp_weight`.
#[must_use]
pub fn max_tp() -> f64 {
    scaled_sigmoid(-1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(delta <= 1e-5, "expected {expected}, got {actual} (delta={delta})");
    }

    #[test]
    fn test_reference_points() {
        assert_close(scaled_sigmoid(-1.0), 0.986_614_3);
        assert_close(scaled_sigmoid(-0.5), 0.848_283_6);
        assert_close(scaled_sigmoid(1.0), -0.986_614_3);
        assert_eq!(scaled_sigmoid(0.0), 0.0);
        assert_close(max_tp(), 0.986_614_298_151_430_5);
    }

    #[test]
    fn test_clamps_far_past_window() {
        assert_eq!(scaled_sigmoid(3.000_001), -1.0);
        assert_eq!(scaled_sigmoid(1_000.0), -1.0);
        // 3.0 itself is still on the curve
        assert!(scaled_sigmoid(3.0) > -1.0);
        assert_close(scaled_sigmoid(3.0), -1.0);
    }

    #[test]
    fn test_monotonically_decreasing() {
        let mut previous = f64::INFINITY;
        for step in -400..=400 {
            let value = scaled_sigmoid(f64::from(step) / 100.0);
            assert!(value <= previous, "not decreasing at {step}");
            assert!((-1.0..=1.0).contains(&value));
            previous = value;
        }
    }
}
