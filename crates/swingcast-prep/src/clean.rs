//! Dropping incomplete rows, and the default-score bookkeeping for the
//! scoring season.

use swingcast_io::SeasonTable;
use tracing::{info, instrument, warn};

use crate::error::PrepError;

/// Rows of a training season with no missing cell.
///
/// Nothing is imputed: a row with any missing cell, in any column, is
/// dropped.
#[instrument(skip_all, fields(path = %table.path().display()))]
pub fn clean_training(table: &SeasonTable) -> Vec<usize> {
    let rows = table.complete_rows();
    let dropped = table.n_rows() - rows.len();
    if dropped > 0 {
        warn!(dropped, kept = rows.len(), "dropped incomplete training rows");
    } else {
        info!(kept = rows.len(), "training season complete");
    }
    rows
}

/// The scoring season with a default score on every row and the subset of
/// complete rows that go through the model.
#[derive(Debug)]
pub struct ScoringFrame<'a> {
    table: &'a SeasonTable,
    default_score: f64,
    complete_rows: Vec<usize>,
}

impl<'a> ScoringFrame<'a> {
    /// Assign `default_score` to every row of `table` and pick out the
    /// complete rows.
    #[instrument(skip_all, fields(path = %table.path().display(), default_score = default_score))]
    pub fn new(table: &'a SeasonTable, default_score: f64) -> Self {
        let complete_rows = table.complete_rows();
        let excluded = table.n_rows() - complete_rows.len();
        if excluded > 0 {
            warn!(
                excluded,
                scored = complete_rows.len(),
                "incomplete scoring rows keep the default score"
            );
        }
        Self {
            table,
            default_score,
            complete_rows,
        }
    }

    #[must_use]
    pub fn table(&self) -> &'a SeasonTable {
        self.table
    }

    #[must_use]
    pub fn default_score(&self) -> f64 {
        self.default_score
    }

    /// Table rows eligible for model scoring, in file order.
    #[must_use]
    pub fn complete_rows(&self) -> &[usize] {
        &self.complete_rows
    }

    /// One score per table row: `probabilities[i]` at `rows[i]`, the
    /// default score everywhere else.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::ScoreCountMismatch`] | `rows` and `probabilities` differ in length |
    /// | [`PrepError::RowOutOfRange`] | a row index is outside the table |
    pub fn merge(&self, rows: &[usize], probabilities: &[f64]) -> Result<Vec<f64>, PrepError> {
        if rows.len() != probabilities.len() {
            return Err(PrepError::ScoreCountMismatch {
                rows: rows.len(),
                scores: probabilities.len(),
            });
        }
        let n_rows = self.table.n_rows();
        let mut scores = vec![self.default_score; n_rows];
        for (&row, &p) in rows.iter().zip(probabilities) {
            let slot = scores
                .get_mut(row)
                .ok_or(PrepError::RowOutOfRange { row, n_rows })?;
            *slot = p;
        }
        Ok(scores)
    }
}
