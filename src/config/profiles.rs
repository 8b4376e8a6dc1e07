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
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application weights for true positives, false positives and misses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostProfile {
    #[serde(rename = "tpWeight")]
    pub tp_weight: f64,
    #[serde(rename = "fpWeight")]
    pub fp_weight: f64,
    #[serde(rename = "fnWeight")]
    pub fn_weight: f64,
}

impl CostProfile {
    #[must_use]
    pub const fn new(tp_weight: f64, fp_weight: f64, fn_weight: f64) -> Self {
        Self {
            tp_weight,
            fp_weight,
            fn_weight,
        }
    }

    /// Reject negative or non-finite weights
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("tpWeight", self.tp_weight),
            ("fpWeight", self.fp_weight),
            ("fnWeight", self.fn_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ScoreError::config(format!(
                    "{name} must be a finite, non-negative number (got {weight})"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileEntry {
    #[serde(rename = "CostMatrix")]
    cost_matrix: CostProfile,
}

/// Named cost profiles, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profiles {
    profiles: IndexMap<String, CostProfile>,
}

impl Profiles {
    /// Load profiles from `{"<name>": {"CostMatrix": {...}}}` JSON
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ScoreError::io(path, e))?;
        let profiles = Self::from_json(&contents).map_err(|e| match e {
            ScoreError::Config(message) => {
                ScoreError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        tracing::info!(
            "Loaded {} cost profiles from {}",
            profiles.len(),
            path.display()
        );
        Ok(profiles)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let entries: IndexMap<String, ProfileEntry> = serde_json::from_str(contents)
            .map_err(|e| ScoreError::config(format!("invalid cost profiles: {e}")))?;

        let mut profiles = IndexMap::with_capacity(entries.len());
        for (name, entry) in entries {
            entry
                .cost_matrix
                .validate()
                .map_err(|e| ScoreError::config(format!("profile '{name}': {e}")))?;
            profiles.insert(name, entry.cost_matrix);
        }
        Ok(Self { profiles })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CostProfile> {
        self.profiles.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CostProfile)> {
        self.profiles.iter().map(|(name, cost)| (name.as_str(), cost))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<(String, CostProfile)> for Profiles {
    fn from_iter<I: IntoIterator<Item = (String, CostProfile)>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}
