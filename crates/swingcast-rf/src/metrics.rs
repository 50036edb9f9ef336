//! Threshold-free and threshold-based scores for swing probabilities.

use crate::error::RfError;

/// One operating point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RocPoint {
    /// False-positive rate at this threshold.
    pub fpr: f64,
    /// True-positive rate at this threshold.
    pub tpr: f64,
    /// Scores `>= threshold` are predicted swing. The first point uses
    /// `+inf` so nothing is predicted positive.
    pub threshold: f64,
}

/// ROC curve with one point per distinct score, from (0, 0) to (1, 1).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Area under the curve by the trapezoidal rule.
    #[must_use]
    pub fn auc(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum()
    }
}

fn check_lengths(truth: &[bool], scores_len: usize) -> Result<(), RfError> {
    if truth.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if truth.len() != scores_len {
        return Err(RfError::MetricLengthMismatch {
            truth: truth.len(),
            scores: scores_len,
        });
    }
    Ok(())
}

/// Build the ROC curve of `scores` against `truth`.
///
/// Tied scores collapse into a single point, so the curve is independent of
/// input order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::EmptyDataset`] | zero labels |
/// | [`RfError::MetricLengthMismatch`] | slices differ in length |
/// | [`RfError::DegenerateLabels`] | only one class present |
pub fn roc_curve(truth: &[bool], scores: &[f64]) -> Result<RocCurve, RfError> {
    check_lengths(truth, scores.len())?;
    let n_pos = truth.iter().filter(|&&t| t).count();
    let n_neg = truth.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(RfError::DegenerateLabels {
            class: n_pos > 0,
            n_samples: truth.len(),
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = Vec::with_capacity(order.len() + 1);
    points.push(RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    });

    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &i) in order.iter().enumerate() {
        if truth[i] {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_tie = order
            .get(pos + 1)
            .is_none_or(|&next| scores[next] != scores[i]);
        if last_of_tie {
            points.push(RocPoint {
                fpr: fp as f64 / n_neg as f64,
                tpr: tp as f64 / n_pos as f64,
                threshold: scores[i],
            });
        }
    }

    Ok(RocCurve { points })
}

/// Area under the ROC curve.
///
/// # Errors
///
/// Same as [`roc_curve`].
pub fn roc_auc(truth: &[bool], scores: &[f64]) -> Result<f64, RfError> {
    Ok(roc_curve(truth, scores)?.auc())
}

/// Fraction of predictions equal to the true label.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::EmptyDataset`] | zero labels |
/// | [`RfError::MetricLengthMismatch`] | slices differ in length |
pub fn accuracy(truth: &[bool], predicted: &[bool]) -> Result<f64, RfError> {
    check_lengths(truth, predicted.len())?;
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let truth = [false, false, true, true];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&truth, &scores).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_ranking_has_zero_auc() {
        let truth = [true, true, false, false];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert!(roc_auc(&truth, &scores).unwrap().abs() < 1e-12);
    }

    #[test]
    fn hand_computed_auc() {
        // Pairs (pos, neg): (0.35 vs 0.1) win, (0.35 vs 0.4) lose,
        // (0.8 vs both) win -> 3 / 4.
        let truth = [false, false, true, true];
        let scores = [0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&truth, &scores).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn ties_count_half() {
        let truth = [false, true];
        let scores = [0.5, 0.5];
        let curve = roc_curve(&truth, &scores).unwrap();
        assert_eq!(curve.points.len(), 2);
        assert!((curve.auc() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn curve_endpoints() {
        let truth = [false, true, false, true, true];
        let scores = [0.3, 0.7, 0.6, 0.2, 0.9];
        let curve = roc_curve(&truth, &scores).unwrap();
        let first = curve.points[0];
        let last = curve.points[curve.points.len() - 1];
        assert_eq!((first.fpr, first.tpr), (0.0, 0.0));
        assert!(first.threshold.is_infinite());
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
        assert!(
            curve
                .points
                .windows(2)
                .all(|w| w[1].fpr >= w[0].fpr && w[1].tpr >= w[0].tpr)
        );
    }

    #[test]
    fn single_class_is_degenerate() {
        let err = roc_auc(&[true, true, true], &[0.1, 0.5, 0.9]).unwrap_err();
        assert!(matches!(
            err,
            RfError::DegenerateLabels { class: true, n_samples: 3 }
        ));
    }

    #[test]
    fn accuracy_counts_matches() {
        let acc = accuracy(&[true, false, true, false], &[true, true, true, false]).unwrap();
        assert!((acc - 0.75).abs() < 1e-12);
        assert!(matches!(
            accuracy(&[true], &[]),
            Err(RfError::MetricLengthMismatch { truth: 1, scores: 0 })
        ));
    }
}
