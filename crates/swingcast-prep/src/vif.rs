//! Variance inflation factors for the encoded training matrix.

use std::fmt;

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, info, instrument};

use crate::encode::EncodedFrame;
use crate::error::PrepError;

/// Name of the intercept column added before the regressions.
pub const INTERCEPT: &str = "const";

/// Relative residual below which a column counts as exactly explained.
const PERFECT_FIT_TOLERANCE: f64 = 1e-10;

/// Variance inflation factor of one column.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VifEntry {
    pub feature: String,
    /// `1 / (1 - R²)`; infinite under perfect collinearity.
    pub vif: f64,
}

/// VIF of every column of `frame` plus an intercept, intercept first.
///
/// Each column is regressed by ordinary least squares on all the others.
/// R² is centred when the regressors include the intercept and uncentred
/// for the intercept's own regression. Columns that are exact linear
/// combinations of earlier ones are left out of a regression when they add
/// nothing to its span, so the normal equations stay non-singular.
///
/// # Errors
///
/// Returns [`PrepError::EmptyMatrix`] when `frame` has no rows.
#[instrument(skip_all, fields(n_rows = frame.n_rows(), n_columns = frame.n_columns()))]
pub fn variance_inflation(frame: &EncodedFrame) -> Result<Vec<VifEntry>, PrepError> {
    if frame.n_rows() == 0 {
        return Err(PrepError::EmptyMatrix);
    }
    let x = design_matrix(frame);

    // Greedy basis of the feature columns in the span that includes the
    // intercept; everything else is a dependent column.
    let mut basis = Vec::new();
    let mut dependent = Vec::new();
    for k in 1..x.ncols() {
        if is_explained(&x, &basis, k, true) {
            dependent.push(k);
        } else {
            basis.push(k);
        }
    }
    if !dependent.is_empty() {
        debug!(n_dependent = dependent.len(), "collinear columns found");
    }

    let names = std::iter::once(INTERCEPT).chain(frame.columns().iter().map(String::as_str));
    let entries: Vec<VifEntry> = names
        .enumerate()
        .map(|(j, name)| {
            let intercept = j != 0;
            let mut regressors: Vec<usize> = basis.iter().copied().filter(|&k| k != j).collect();
            for &d in dependent.iter().filter(|&&d| d != j) {
                if !is_explained(&x, &regressors, d, intercept) {
                    regressors.push(d);
                }
            }
            let ssr = residual_sum_of_squares(&x, &regressors, j, intercept).unwrap_or(0.0);
            VifEntry {
                feature: name.to_string(),
                vif: vif_from_residual(ssr, total_sum_of_squares(&x, j, intercept)),
            }
        })
        .collect();

    info!(
        max_vif = entries.iter().skip(1).map(|e| e.vif).fold(0.0f64, f64::max),
        "variance inflation computed"
    );
    Ok(entries)
}

fn vif_from_residual(ssr: f64, total: f64) -> f64 {
    if total <= 0.0 || ssr <= PERFECT_FIT_TOLERANCE * total {
        return f64::INFINITY;
    }
    // 1 / (1 - R²) with R² = 1 - ssr / total.
    total / ssr
}

/// `[1 | rows]` as an `n × (p + 1)` array.
fn design_matrix(frame: &EncodedFrame) -> Array2<f64> {
    let mut x = Array2::ones((frame.n_rows(), frame.n_columns() + 1));
    for (mut out, row) in x.axis_iter_mut(Axis(0)).zip(frame.rows()) {
        for (cell, &value) in out.iter_mut().skip(1).zip(row) {
            *cell = value;
        }
    }
    x
}

/// Centred sum of squares of column `j` when an intercept is fitted,
/// uncentred otherwise.
fn total_sum_of_squares(x: &Array2<f64>, j: usize, intercept: bool) -> f64 {
    let y = x.column(j);
    let offset = if intercept { y.mean().unwrap_or(0.0) } else { 0.0 };
    y.iter().map(|v| (v - offset).powi(2)).sum()
}

fn is_explained(x: &Array2<f64>, regressors: &[usize], k: usize, intercept: bool) -> bool {
    let total = total_sum_of_squares(x, k, intercept);
    match residual_sum_of_squares(x, regressors, k, intercept) {
        Some(ssr) => total <= 0.0 || ssr <= PERFECT_FIT_TOLERANCE * total,
        None => true,
    }
}

/// Residual sum of squares of column `target` regressed on `regressors`,
/// or `None` when the fit fails.
fn residual_sum_of_squares(
    x: &Array2<f64>,
    regressors: &[usize],
    target: usize,
    intercept: bool,
) -> Option<f64> {
    let y: Array1<f64> = x.column(target).to_owned();
    if regressors.is_empty() {
        return Some(total_sum_of_squares(x, target, intercept));
    }
    let dataset = Dataset::new(x.select(Axis(1), regressors), y.clone());
    let model = LinearRegression::new()
        .with_intercept(intercept)
        .fit(&dataset)
        .ok()?;
    let predicted: Array1<f64> = model.predict(dataset.records());
    let residual = y - predicted;
    let ssr = residual.dot(&residual);
    ssr.is_finite().then_some(ssr)
}

/// Aligned text table of VIF entries.
pub struct VifTable<'a>(pub &'a [VifEntry]);

impl fmt::Display for VifTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.0.iter().map(|e| e.feature.len()).max().unwrap_or(0).max(7);
        writeln!(f, "{:<width$} {:>12}", "feature", "VIF")?;
        for entry in self.0 {
            writeln!(f, "{:<width$} {:>12.4}", entry.feature, entry.vif)?;
        }
        Ok(())
    }
}
