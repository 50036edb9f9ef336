//! Error types for swingcast-prep.

use swingcast_io::IoError;

/// Errors from cleaning, feature extraction, encoding and diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// A column lookup or numeric parse in the underlying table failed.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Returned when a training row has a NaN or infinite feature after
    /// encoding, typically `relative_pitch_height` with `sz_top == sz_bot`.
    #[error("non-finite value in training row {row}, column \"{column}\"")]
    DegenerateFeature {
        /// Zero-based row index into the training matrix.
        row: usize,
        /// Name of the offending feature column.
        column: String,
    },

    /// Returned when no training row survives cleaning.
    #[error("no complete rows left after dropping missing values")]
    NoCompleteRows,

    /// Returned when feature frames with different layouts are combined.
    #[error("cannot combine feature frames: columns {expected:?} vs {got:?}")]
    LayoutMismatch {
        /// Columns of the first frame.
        expected: Vec<String>,
        /// Columns of the frame that differs.
        got: Vec<String>,
    },

    /// Returned when merged probabilities do not line up with their rows.
    #[error("got {scores} scores for {rows} scored rows")]
    ScoreCountMismatch {
        /// Number of row indices supplied.
        rows: usize,
        /// Number of probabilities supplied.
        scores: usize,
    },

    /// Returned when a row index passed to a merge is outside the table.
    #[error("row {row} is outside a table of {n_rows} rows")]
    RowOutOfRange {
        /// The offending index.
        row: usize,
        /// Rows in the table.
        n_rows: usize,
    },

    /// Returned when a diagnostic is asked of a matrix with no rows.
    #[error("feature matrix has no rows")]
    EmptyMatrix,
}
