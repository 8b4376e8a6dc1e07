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

//! JSON registries shared between benchmark runs.
//!
//! Both registries are keyed `detector -> profile`. Writes happen under an
//! exclusive file lock so concurrent runs for different detectors do not
//! drop each other's entries.

use crate::error::{Result, ScoreError};
use fs2::FileExt;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Best threshold found for one detector and profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub threshold: f64,
    pub score: f64,
}

type Nested<T> = IndexMap<String, IndexMap<String, T>>;

/// Optimized thresholds, `detector -> profile -> {threshold, score}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdRegistry {
    entries: Nested<ThresholdEntry>,
}

impl ThresholdRegistry {
    /// Load the registry; a missing file is an empty registry
    pub fn load(path: &Path) -> Result<Self> {
        load_or_default(path)
    }

    #[must_use]
    pub fn get(&self, detector: &str, profile: &str) -> Option<&ThresholdEntry> {
        self.entries.get(detector)?.get(profile)
    }

    pub fn insert(&mut self, detector: &str, profile: &str, entry: ThresholdEntry) {
        self.entries
            .entry(detector.to_string())
            .or_default()
            .insert(profile.to_string(), entry);
    }

    /// Add every entry of `newer`, overwriting entries already present
    pub fn update(&mut self, newer: &Self) {
        for (detector, profiles) in &newer.entries {
            for (profile, entry) in profiles {
                self.insert(detector, profile, *entry);
            }
        }
    }

    pub fn detectors(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(IndexMap::is_empty)
    }

    /// Merge `newer` into the registry stored at `path` and return the result
    pub fn update_file(path: &Path, newer: &Self) -> Result<Self> {
        let mut merged = Self::default();
        rewrite_locked(path, |existing: Option<Self>| {
            merged = existing.unwrap_or_default();
            merged.update(newer);
            Ok(merged.clone())
        })?;
        tracing::info!("Updated thresholds in {}", path.display());
        Ok(merged)
    }
}

/// Normalized benchmark scores, `detector -> profile -> score`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalResults {
    entries: Nested<f64>,
}

impl FinalResults {
    pub fn load(path: &Path) -> Result<Self> {
        load_or_default(path)
    }

    #[must_use]
    pub fn get(&self, detector: &str, profile: &str) -> Option<f64> {
        self.entries.get(detector)?.get(profile).copied()
    }

    pub fn insert(&mut self, detector: &str, profile: &str, score: f64) {
        self.entries
            .entry(detector.to_string())
            .or_default()
            .insert(profile.to_string(), score);
    }

    /// Write these results to `path`, keeping entries of other detectors
    pub fn save(&self, path: &Path) -> Result<()> {
        rewrite_locked(path, |existing: Option<Self>| {
            let mut merged = existing.unwrap_or_default();
            for (detector, profiles) in &self.entries {
                for (profile, score) in profiles {
                    merged.insert(detector, profile, *score);
                }
            }
            Ok(merged)
        })?;
        tracing::info!("Final results written to {}", path.display());
        Ok(())
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path).map_err(|e| ScoreError::io(path, e))?;
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&contents)?)
}

/// Read, transform and rewrite a JSON file while holding an exclusive lock
fn rewrite_locked<T, F>(path: &Path, update: F) -> Result<()>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(Option<T>) -> Result<T>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ScoreError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| ScoreError::io(path, e))?;
    FileExt::lock_exclusive(&file).map_err(|e| ScoreError::io(path, e))?;

    let result = (|| -> Result<()> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ScoreError::io(path, e))?;
        let existing = if contents.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&contents)?)
        };

        let json = serde_json::to_string_pretty(&update(existing)?)?;
        let io = |e| ScoreError::io(path, e);
        file.seek(SeekFrom::Start(0)).map_err(io)?;
        file.set_len(0).map_err(io)?;
        file.write_all(json.as_bytes()).map_err(io)?;
        file.flush().map_err(io)
    })();

    FileExt::unlock(&file).map_err(|e| ScoreError::io(path, e))?;
    result
}
