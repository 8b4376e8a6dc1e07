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

use crate::corpus::timestamp::parse_timestamp;
use crate::corpus::Corpus;
use crate::error::{Result, ScoreError};
use crate::sweep::window::{resolve_windows, Window};
use std::collections::BTreeMap;
use std::path::Path;

/// Ground-truth windows for every file of a corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusLabels {
    windows: BTreeMap<String, Vec<Window>>,
}

impl CorpusLabels {
    /// Load combined windows: `{"<relative data path>": [[start, end], ...]}`
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ScoreError::io(path, e))?;
        let labels = Self::from_json(&contents)?;
        tracing::info!(
            "Loaded {} windows for {} files from {}",
            labels.total_windows(),
            labels.windows.len(),
            path.display()
        );
        Ok(labels)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<[String; 2]>> = serde_json::from_str(contents)?;

        let mut windows = BTreeMap::new();
        for (file, limits) in raw {
            let parsed = limits
                .iter()
                .map(|[start, end]| -> Result<Window> {
                    Ok(Window::new(parse_timestamp(start)?, parse_timestamp(end)?))
                })
                .collect::<Result<Vec<_>>>()
                .map_err(|e| ScoreError::data(format!("labels for {file}: {e}")))?;
            windows.insert(file, parsed);
        }
        Ok(Self { windows })
    }

    /// Windows of one file; unlabeled files have none
    #[must_use]
    pub fn windows_for(&self, relative_path: &str) -> &[Window] {
        self.windows
            .get(relative_path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.windows.contains_key(relative_path)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    #[must_use]
    pub fn total_windows(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    /// Check that every labeled file exists in `corpus` and that its windows
    /// resolve against the file's timestamps
    pub fn validate_against(&self, corpus: &Corpus) -> Result<()> {
        let problems: Vec<String> = self
            .windows
            .iter()
            .filter_map(|(file, windows)| {
                let Some(data_set) = corpus.get(file) else {
                    return Some(format!("{file}: labeled file is not in the corpus"));
                };
                data_set
                    .timestamps()
                    .and_then(|timestamps| resolve_windows(file, &timestamps, windows))
                    .err()
                    .map(|e| e.to_string())
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            for problem in &problems {
                tracing::error!("Invalid labels: {problem}");
            }
            Err(ScoreError::data(format!(
                "{} labeled files failed validation: {}",
                problems.len(),
                problems.join("; ")
            )))
        }
    }
}

impl FromIterator<(String, Vec<Window>)> for CorpusLabels {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Window>)>>(iter: I) -> Self {
        Self {
            windows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: &str = r#"{
        "realKnownCause/nyc_taxi.csv": [
            ["2014-04-01 00:05:00.000000", "2014-04-01 00:10:00.000000"],
            ["2014-04-01 00:20:00.000000", "2014-04-01 00:25:00.000000"]
        ],
        "artificialNoAnomaly/art_flatline.csv": []
    }"#;

    fn write_series(dir: &Path, relative: &str, rows: usize) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
        let mut contents = String::from("timestamp,value\n");
        for i in 0..rows {
            contents.push_str(&format!("2014-04-01 00:{:02}:00,{i}\n", i * 5));
        }
        std::fs::write(path, contents).expect("write series");
    }

    #[test]
    fn test_parse_labels() {
        let labels = CorpusLabels::from_json(LABELS).expect("labels parse");
        assert_eq!(labels.total_windows(), 2);
        assert_eq!(labels.windows_for("realKnownCause/nyc_taxi.csv").len(), 2);
        assert!(labels.windows_for("artificialNoAnomaly/art_flatline.csv").is_empty());
        assert!(labels.windows_for("unknown.csv").is_empty());
        assert!(labels.contains("artificialNoAnomaly/art_flatline.csv"));
    }

    #[test]
    fn test_bad_timestamp_names_file() {
        let json = r#"{"a.csv": [["not a time", "2014-04-01 00:00:00"]]}"#;
        let err = CorpusLabels::from_json(json).expect_err("bad boundary");
        assert!(err.to_string().contains("a.csv"));
    }

    #[test]
    fn test_validate_against_corpus() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_series(dir.path(), "realKnownCause/nyc_taxi.csv", 8);
        write_series(dir.path(), "artificialNoAnomaly/art_flatline.csv", 4);
        let corpus = Corpus::load(dir.path()).expect("corpus");

        let labels = CorpusLabels::from_json(LABELS).expect("labels parse");
        labels.validate_against(&corpus).expect("labels match the data");

        // 00:40 is past the last record
        let shifted = r#"{"realKnownCause/nyc_taxi.csv": [["2014-04-01 00:30:00", "2014-04-01 00:40:00"]]}"#;
        let err = CorpusLabels::from_json(shifted)
            .expect("labels parse")
            .validate_against(&corpus)
            .expect_err("boundary missing from the data");
        assert!(err.to_string().contains("does not exist"));

        let orphan = r#"{"elsewhere/gone.csv": []}"#;
        let err = CorpusLabels::from_json(orphan)
            .expect("labels parse")
            .validate_against(&corpus)
            .expect_err("file missing from the corpus");
        assert!(err.to_string().contains("not in the corpus"));
    }
}
