//! One-hot encoding and alignment of scoring columns to training
//! columns.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, instrument};

use crate::error::PrepError;
use crate::features::FeatureFrame;

/// A dense numeric matrix with named columns, ready for the forest.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    source_rows: Vec<usize>,
}

/// One-hot encode the categorical block of `frame`.
///
/// Each categorical column expands to one indicator per level except the
/// first in sorted order, named `{column}_{level}`. Numeric columns come
/// first, then the indicators of each categorical column in turn. A column
/// with a single level contributes no indicators.
#[instrument(skip_all, fields(n_rows = frame.n_rows()))]
pub fn one_hot(frame: &FeatureFrame) -> EncodedFrame {
    encode(frame, 1)
}

/// One indicator for every level present in `frame`, reference included.
///
/// Used for rows scored against an existing column layout: after
/// [`EncodedFrame::reindex`] each known level sets its own indicator and
/// only the training reference level and unseen levels are all-zero.
#[instrument(skip_all, fields(n_rows = frame.n_rows()))]
pub fn one_hot_all_levels(frame: &FeatureFrame) -> EncodedFrame {
    encode(frame, 0)
}

fn encode(frame: &FeatureFrame, skip_levels: usize) -> EncodedFrame {
    let levels: Vec<Vec<&str>> = (0..frame.categorical_names.len())
        .map(|c| {
            frame
                .categorical
                .iter()
                .map(|row| row[c].as_str())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .skip(skip_levels)
                .collect()
        })
        .collect();

    let mut columns = frame.numeric_names.clone();
    for (name, kept) in frame.categorical_names.iter().zip(&levels) {
        columns.extend(kept.iter().map(|level| format!("{name}_{level}")));
    }

    let rows = frame
        .numeric
        .iter()
        .zip(&frame.categorical)
        .map(|(numeric, categorical)| {
            let mut row = Vec::with_capacity(columns.len());
            row.extend_from_slice(numeric);
            for (value, kept) in categorical.iter().zip(&levels) {
                row.extend(
                    kept.iter()
                        .map(|level| if *level == value.as_str() { 1.0 } else { 0.0 }),
                );
            }
            row
        })
        .collect();

    debug!(
        n_columns = columns.len(),
        n_indicators = columns.len() - frame.numeric_names.len(),
        "one-hot encoded"
    );
    EncodedFrame {
        columns,
        rows,
        source_rows: frame.source_rows.clone(),
    }
}

impl EncodedFrame {
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values, `rows()[row][column]`.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Table row each matrix row was extracted from.
    #[must_use]
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// Rearrange to exactly `columns`, in that order.
    ///
    /// Columns absent from this frame are filled with 0.0; columns not in
    /// `columns` are dropped.
    #[must_use]
    pub fn reindex(&self, columns: &[String]) -> EncodedFrame {
        let position: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let mapping: Vec<Option<usize>> = columns
            .iter()
            .map(|c| position.get(c.as_str()).copied())
            .collect();

        let added = mapping.iter().filter(|m| m.is_none()).count();
        let dropped = self.columns.len() - (columns.len() - added);
        if added > 0 || dropped > 0 {
            debug!(added, dropped, "reindexed to training columns");
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|m| m.map_or(0.0, |i| row[i]))
                    .collect()
            })
            .collect();
        EncodedFrame {
            columns: columns.to_vec(),
            rows,
            source_rows: self.source_rows.clone(),
        }
    }

    /// First (row, column) holding NaN or an infinity, in row-major order.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(r, row)| {
            row.iter().position(|v| !v.is_finite()).map(|c| (r, c))
        })
    }

    /// Fail on the first non-finite value.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::DegenerateFeature`] naming the row and column.
    pub fn ensure_finite(&self) -> Result<(), PrepError> {
        match self.first_non_finite() {
            Some((row, col)) => Err(PrepError::DegenerateFeature {
                row,
                column: self.columns[col].clone(),
            }),
            None => Ok(()),
        }
    }

    /// Keep only rows whose values are all finite.
    #[must_use]
    pub fn finite_only(&self) -> EncodedFrame {
        let keep: Vec<usize> = (0..self.rows.len())
            .filter(|&r| self.rows[r].iter().all(|v| v.is_finite()))
            .collect();
        EncodedFrame {
            columns: self.columns.clone(),
            rows: keep.iter().map(|&r| self.rows[r].clone()).collect(),
            source_rows: keep.iter().map(|&r| self.source_rows[r]).collect(),
        }
    }
}
