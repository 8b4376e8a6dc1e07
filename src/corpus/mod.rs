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

//! CSV tables of a benchmark corpus.
//!
//! A corpus is a directory tree of `*.csv` files, each keyed by its path
//! relative to the corpus root with `/` separators, e.g.
//! `realKnownCause/nyc_taxi.csv`. Data tables carry `timestamp` and `value`;
//! results tables written by a detector add `anomaly_score` and any number of
//! extra columns, which are preserved when a table is rewritten.

pub mod labels;
pub mod timestamp;

use crate::error::{Result, ScoreError};
use chrono::NaiveDateTime;
use csv::StringRecord;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use timestamp::parse_timestamp;
use walkdir::WalkDir;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const ANOMALY_SCORE_COLUMN: &str = "anomaly_score";

/// One CSV table held in memory as strings
#[derive(Debug, Clone)]
pub struct DataSet {
    path: PathBuf,
    relative_path: String,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl DataSet {
    /// Read the table at `path`
    pub fn load(path: &Path, relative_path: impl Into<String>) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ScoreError::io(path, e))?;
        Self::from_reader(file, path.to_path_buf(), relative_path)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        path: PathBuf,
        relative_path: impl Into<String>,
    ) -> Result<Self> {
        let relative_path = relative_path.into();
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()
            .map_err(|e| ScoreError::data(format!("{relative_path}: {e}")))?;

        Ok(Self {
            path,
            relative_path,
            headers,
            records,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Corpus key of this table
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    #[must_use]
    pub const fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Number of records, excluding the header
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Raw values of one column
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let index = self.column_index(name).ok_or_else(|| {
            ScoreError::data(format!("{}: missing column '{name}'", self.relative_path))
        })?;
        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                record.get(index).ok_or_else(|| {
                    ScoreError::data(format!(
                        "{}: row {} has no '{name}' value",
                        self.relative_path,
                        row + 1
                    ))
                })
            })
            .collect()
    }

    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        self.column(TIMESTAMP_COLUMN)?
            .into_iter()
            .map(|raw| {
                parse_timestamp(raw)
                    .map_err(|e| ScoreError::data(format!("{}: {e}", self.relative_path)))
            })
            .collect()
    }

    /// Detector output; values are not clamped
    pub fn anomaly_scores(&self) -> Result<Vec<f64>> {
        self.float_column(ANOMALY_SCORE_COLUMN)
    }

    pub fn float_column(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)?
            .into_iter()
            .enumerate()
            .map(|(row, raw)| {
                raw.trim().parse::<f64>().map_err(|e| {
                    ScoreError::data(format!(
                        "{}: row {} has invalid '{name}' value '{raw}': {e}",
                        self.relative_path,
                        row + 1
                    ))
                })
            })
            .collect()
    }

    /// Set `name` to `values`, replacing the column if it already exists
    pub fn add_column(&mut self, name: &str, values: &[f64]) -> Result<()> {
        if values.len() != self.records.len() {
            return Err(ScoreError::data(format!(
                "{}: column '{name}' has {} values for {} records",
                self.relative_path,
                values.len(),
                self.records.len()
            )));
        }

        match self.column_index(name) {
            Some(index) => {
                for (record, value) in self.records.iter_mut().zip(values) {
                    *record = record
                        .iter()
                        .enumerate()
                        .map(|(i, field)| {
                            if i == index {
                                value.to_string()
                            } else {
                                field.to_string()
                            }
                        })
                        .collect();
                }
            }
            None => {
                self.headers.push_field(name);
                for (record, value) in self.records.iter_mut().zip(values) {
                    record.push_field(&value.to_string());
                }
            }
        }
        Ok(())
    }

    /// Write the table back to where it was loaded from
    pub fn write(&self) -> Result<()> {
        self.write_to(&self.path)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer.flush().map_err(|e| ScoreError::io(path, e))?;
        Ok(())
    }
}

/// Every CSV table below a root directory
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    data_files: BTreeMap<String, DataSet>,
    rejected: Vec<(String, String)>,
}

impl Corpus {
    /// Load every `*.csv` below `root`.
    ///
    /// Tables that fail to parse are logged and listed in
    /// [`Corpus::rejected`]; they do not fail the whole corpus.
    pub fn load(root: &Path) -> Result<Self> {
        profiling::scope!("Corpus::load");

        if !root.is_dir() {
            return Err(ScoreError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "corpus directory not found"),
            ));
        }

        let mut corpus = Self::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                ScoreError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file()
                || entry.path().extension().is_none_or(|ext| ext != "csv")
            {
                continue;
            }

            let relative = relative_key(root, entry.path());
            match DataSet::load(entry.path(), relative.clone()) {
                Ok(data_set) => {
                    corpus.data_files.insert(relative, data_set);
                }
                Err(e) => {
                    tracing::error!("Skipping {relative}: {e}");
                    corpus.rejected.push((relative, e.to_string()));
                }
            }
        }

        tracing::info!(
            "Loaded {} tables from {} ({} rejected)",
            corpus.data_files.len(),
            root.display(),
            corpus.rejected.len()
        );
        Ok(corpus)
    }

    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&DataSet> {
        self.data_files.get(relative_path)
    }

    pub fn get_mut(&mut self, relative_path: &str) -> Option<&mut DataSet> {
        self.data_files.get_mut(relative_path)
    }

    /// Tables in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataSet)> {
        self.data_files.iter().map(|(key, data)| (key.as_str(), data))
    }

    pub fn data_sets_mut(&mut self) -> impl Iterator<Item = &mut DataSet> {
        self.data_files.values_mut()
    }

    /// Files that could not be parsed, with the reason
    #[must_use]
    pub fn rejected(&self) -> &[(String, String)] {
        &self.rejected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data_files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_files.is_empty()
    }
}

fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a results table key to the data table it was produced from.
///
/// `realKnownCause/numenta_nyc_taxi.csv` for detector `numenta` becomes
/// `realKnownCause/nyc_taxi.csv`. A leading `<detector>/` directory is
/// dropped as well.
#[must_use]
pub fn data_path_for_result(relative_path: &str, detector: &str) -> String {
    let prefix = format!("{detector}/");
    let path = relative_path.strip_prefix(&prefix).unwrap_or(relative_path);

    let (dir, file) = path.rsplit_once('/').unwrap_or(("", path));
    let file_prefix = format!("{detector}_");
    let file = file.strip_prefix(&file_prefix).unwrap_or(file);

    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}
