//! Minimal per-recipe feature table keyed by recipe id.
//!
//! Every analyser emits one of these, the persist stage round-trips them
//! through CSV, and the merge stage inner-joins them. Rows live in a
//! `BTreeMap` so iteration (and therefore every persisted artifact) is
//! ordered by ascending recipe id regardless of input order.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Candidate names for the id column when reading a CSV table.
const ID_HEADERS: [&str; 2] = ["id", "recipe_id"];

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: no 'id' or 'recipe_id' column in header")]
    MissingIdColumn { path: String },
    #[error("{path}: unparseable recipe id {value:?}")]
    BadId { path: String, value: String },
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },
    #[error("non-numeric value {value:?} in column '{column}'")]
    NonNumeric { column: String, value: String },
    #[error("row for id {id} has {got} cells, expected {expected}")]
    ShapeMismatch {
        id: i64,
        expected: usize,
        got: usize,
    },
}

/// Id-keyed table of string cells (empty cell = NaN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: BTreeMap<i64, Vec<String>>,
}

impl FeatureFrame {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    #[must_use]
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    #[must_use]
    pub fn rows(&self) -> impl Iterator<Item = (i64, &[String])> + '_ {
        self.rows.iter().map(|(id, cells)| (*id, cells.as_slice()))
    }

    /// Insert a row; a duplicate id replaces the previous row.
    pub fn push_row(&mut self, id: i64, cells: Vec<String>) -> Result<(), FrameError> {
        if cells.len() != self.columns.len() {
            return Err(FrameError::ShapeMismatch {
                id,
                expected: self.columns.len(),
                got: cells.len(),
            });
        }
        self.rows.insert(id, cells);
        Ok(())
    }

    /// Raw cell text, `None` when the id or column is absent.
    #[must_use]
    pub fn cell(&self, id: i64, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(&id).map(|cells| cells[index].as_str())
    }

    /// Parse a column as floats in row (ascending id) order.
    ///
    /// Empty cells and the literal `NaN` become `f64::NAN`; anything else
    /// that fails to parse is an error naming the column and value.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, FrameError> {
        let index =
            self.columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| FrameError::MissingColumn {
                    column: name.to_string(),
                })?;

        self.rows
            .values()
            .map(|cells| parse_cell(&cells[index], name))
            .collect()
    }

    /// Strict intersection join on recipe id.
    ///
    /// Keeps all left columns and appends the right-hand columns whose names
    /// are not already present; ids missing from either side are dropped.
    #[must_use]
    pub fn inner_join(&self, other: &FeatureFrame) -> FeatureFrame {
        let appended: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.has_column(name))
            .map(|(i, _)| i)
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(appended.iter().map(|&i| other.columns[i].clone()));

        let mut joined = FeatureFrame::new(columns);
        for (id, cells) in &self.rows {
            if let Some(other_cells) = other.rows.get(id) {
                let mut row = cells.clone();
                row.extend(appended.iter().map(|&i| other_cells[i].clone()));
                joined.rows.insert(*id, row);
            }
        }
        joined
    }

    /// Read a frame from CSV; the id column may be `id` or `recipe_id` and
    /// may sit at any position.
    pub fn from_csv(path: &Path) -> Result<Self, FrameError> {
        let display = path.display().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|source| FrameError::Read {
            path: display.clone(),
            source,
        })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| FrameError::Read {
                path: display.clone(),
                source,
            })?
            .iter()
            .map(ToString::to_string)
            .collect();

        let id_index = headers
            .iter()
            .position(|h| ID_HEADERS.contains(&h.as_str()))
            .ok_or_else(|| FrameError::MissingIdColumn {
                path: display.clone(),
            })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_index)
            .map(|(_, h)| h.clone())
            .collect();

        let mut frame = FeatureFrame::new(columns);
        for record in reader.records() {
            let record = record.map_err(|source| FrameError::Read {
                path: display.clone(),
                source,
            })?;
            let raw_id = record.get(id_index).unwrap_or_default();
            let id = parse_id(raw_id).ok_or_else(|| FrameError::BadId {
                path: display.clone(),
                value: raw_id.to_string(),
            })?;
            let cells: Vec<String> = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != id_index)
                .map(|(_, v)| v.to_string())
                .collect();
            frame.push_row(id, cells)?;
        }
        Ok(frame)
    }

    /// Write the frame as CSV with the given id header as first column.
    pub fn to_csv(&self, path: &Path, id_header: &str) -> Result<(), FrameError> {
        let display = path.display().to_string();
        let mut writer = csv::Writer::from_path(path).map_err(|source| FrameError::Write {
            path: display.clone(),
            source,
        })?;

        let mut header = vec![id_header.to_string()];
        header.extend(self.columns.iter().cloned());
        write_record(&mut writer, &header, &display)?;

        for (id, cells) in &self.rows {
            let mut record = vec![id.to_string()];
            record.extend(cells.iter().cloned());
            write_record(&mut writer, &record, &display)?;
        }
        writer.flush().map_err(|source| FrameError::Write {
            path: display,
            source: csv::Error::from(source),
        })
    }
}

fn write_record(
    writer: &mut csv::Writer<std::fs::File>,
    record: &[String],
    path: &str,
) -> Result<(), FrameError> {
    writer.write_record(record).map_err(|source| FrameError::Write {
        path: path.to_string(),
        source,
    })
}

fn parse_cell(raw: &str, column: &str) -> Result<f64, FrameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| FrameError::NonNumeric {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Cell text for a float: empty string for NaN, shortest round-trip
/// formatting otherwise.
#[must_use]
pub fn fmt_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
