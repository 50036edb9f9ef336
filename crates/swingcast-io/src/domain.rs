//! Domain types for swingcast-io.

use std::path::{Path, PathBuf};

use crate::IoError;

/// Raw columns every season file must carry.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "release_speed",
    "plate_x",
    "plate_z",
    "stand",
    "p_throws",
    "pfx_x",
    "pfx_z",
    "balls",
    "strikes",
    "pitch_type",
    "sz_top",
    "sz_bot",
    "description",
];

/// Cell spellings read as a missing value, in addition to the empty cell.
pub const MISSING_TOKENS: [&str; 12] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
];

/// Whether a raw cell counts as missing.
#[must_use]
pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || MISSING_TOKENS.contains(&cell)
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One season of pitches as read from disk.
///
/// Cells are kept as raw strings so that every original column can be
/// written back unchanged; typed access goes through [`SeasonTable::number`]
/// and [`SeasonTable::text`].
#[derive(Debug, Clone)]
pub struct SeasonTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SeasonTable {
    pub(crate) fn new(path: PathBuf, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            path,
            headers,
            rows,
        }
    }

    /// File the table was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Position of `name` in the header.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of `name` in the header, as an error when absent.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingColumn`] when the column does not exist.
    pub fn require_column(&self, name: &str) -> Result<usize, IoError> {
        self.column_index(name).ok_or_else(|| IoError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })
    }

    /// Whether no cell of row `row` is missing.
    #[must_use]
    pub fn row_is_complete(&self, row: usize) -> bool {
        self.rows[row].iter().all(|cell| !is_missing(cell))
    }

    /// Indices of rows with no missing cell, in file order.
    #[must_use]
    pub fn complete_rows(&self) -> Vec<usize> {
        (0..self.rows.len())
            .filter(|&row| self.row_is_complete(row))
            .collect()
    }

    /// Trimmed text of cell (`row`, `column`).
    #[must_use]
    pub fn text(&self, row: usize, column: usize) -> &str {
        self.rows[row][column].trim()
    }

    /// Cell (`row`, `column`) parsed as a float.
    ///
    /// Callers only ask for cells of complete rows, so a missing token here
    /// is reported like any other unparseable value.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidNumber`] when the cell is not a number.
    pub fn number(&self, row: usize, column: usize) -> Result<f64, IoError> {
        let raw = self.text(row, column);
        raw.parse::<f64>().map_err(|_| IoError::InvalidNumber {
            path: self.path.clone(),
            row_index: row,
            column: self.headers[column].clone(),
            raw: raw.to_string(),
        })
    }
}
