//! Season CSV reader with schema validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::domain::{REQUIRED_COLUMNS, SeasonTable};
use crate::IoError;

/// Reads one season of pitch data from a CSV file.
///
/// Expected CSV format:
/// - Header row required; column order is free
/// - Every column in the required set must be present by name
/// - All rows must have the same number of columns as the header
///
/// Missing cells are kept as-is; dropping incomplete rows is the caller's
/// decision.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent from the header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct SeasonReader {
    path: PathBuf,
    required: Vec<String>,
}

impl SeasonReader {
    /// Create a reader for `path` requiring the standard pitch columns.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            required: REQUIRED_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Replace the set of columns that must be present.
    #[must_use]
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Read and validate the CSV file, returning a [`SeasonTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<SeasonTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that our own InconsistentRowLength check fires
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| self.parse_error(e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        debug!(n_columns = headers.len(), "read CSV header");

        for column in &self.required {
            if !headers.iter().any(|h| h == column) {
                return Err(IoError::MissingColumn {
                    path: self.path.clone(),
                    column: column.clone(),
                });
            }
        }

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != headers.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: headers.len(),
                    got: record.len(),
                });
            }
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let table = SeasonTable::new(self.path.clone(), headers, rows);
        let n_complete = table.complete_rows().len();
        if n_complete < table.n_rows() {
            warn!(
                n_incomplete = table.n_rows() - n_complete,
                "rows with missing values present"
            );
        }
        info!(
            n_rows = table.n_rows(),
            n_columns = table.headers().len(),
            n_complete,
            "season loaded"
        );

        Ok(table)
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
