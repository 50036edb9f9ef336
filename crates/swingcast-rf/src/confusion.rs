//! Confusion matrix and per-class classification report for swing prediction.

use std::fmt;

use crate::error::RfError;

/// 2×2 confusion matrix. Rows are the true class, columns the prediction,
/// class order no-swing then swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

/// Precision, recall, F1 and support for one class (or an average).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassMetrics {
    pub label: String,
    /// TP / (TP + FP); 0.0 when the class is never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 when the class has no true samples.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and macro / support-weighted averages.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn class_metrics(label: &str, tp: usize, fp: usize, fn_: usize) -> ClassMetrics {
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassMetrics {
        label: label.to_string(),
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

fn weighted_average(
    label: &str,
    classes: &[&ClassMetrics; 2],
    weights: [f64; 2],
    support: usize,
) -> ClassMetrics {
    let w_sum: f64 = weights.iter().sum();
    let avg = |field: fn(&ClassMetrics) -> f64| {
        if w_sum == 0.0 {
            0.0
        } else {
            classes
                .iter()
                .zip(weights)
                .map(|(c, w)| w * field(c))
                .sum::<f64>()
                / w_sum
        }
    };
    ClassMetrics {
        label: label.to_string(),
        precision: avg(|c| c.precision),
        recall: avg(|c| c.recall),
        f1: avg(|c| c.f1),
        support,
    }
}

impl ConfusionMatrix {
    /// Tally true labels against predictions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | zero labels |
    /// | [`RfError::MetricLengthMismatch`] | slices differ in length |
    pub fn from_labels(truth: &[bool], predicted: &[bool]) -> Result<Self, RfError> {
        if truth.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if truth.len() != predicted.len() {
            return Err(RfError::MetricLengthMismatch {
                truth: truth.len(),
                scores: predicted.len(),
            });
        }
        let mut cm = Self {
            true_negative: 0,
            false_positive: 0,
            false_negative: 0,
            true_positive: 0,
        };
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (false, false) => cm.true_negative += 1,
                (false, true) => cm.false_positive += 1,
                (true, false) => cm.false_negative += 1,
                (true, true) => cm.true_positive += 1,
            }
        }
        Ok(cm)
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Fraction of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negative + self.true_positive, self.total())
    }

    /// Matrix as rows `[[tn, fp], [fn, tp]]`.
    #[must_use]
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }

    /// Per-class precision/recall/F1 with macro and weighted averages.
    #[must_use]
    pub fn report(&self) -> ClassificationReport {
        let no_swing = class_metrics(
            "no_swing",
            self.true_negative,
            self.false_negative,
            self.false_positive,
        );
        let swing = class_metrics(
            "swing",
            self.true_positive,
            self.false_positive,
            self.false_negative,
        );
        let total = self.total();
        let classes = [&no_swing, &swing];
        let macro_avg = weighted_average("macro avg", &classes, [1.0, 1.0], total);
        let weighted_avg = weighted_average(
            "weighted avg",
            &classes,
            [no_swing.support as f64, swing.support as f64],
            total,
        );

        ClassificationReport {
            classes: vec![no_swing, swing],
            accuracy: self.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>10} {:>10}", "", "pred_no", "pred_swing")?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10}",
            "true_no", self.true_negative, self.false_positive
        )?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10}",
            "true_swing", self.false_negative, self.true_positive
        )
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.label, m.precision, m.recall, m.f1, m.support
            )
        };
        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_cell() {
        let truth = [false, false, false, true, true, true, true];
        let pred = [false, false, true, true, true, true, false];
        let cm = ConfusionMatrix::from_labels(&truth, &pred).unwrap();
        assert_eq!(cm.as_rows(), [[2, 1], [1, 3]]);
        assert!((cm.accuracy() - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn report_matches_hand_computation() {
        let truth = [false, false, false, true, true, true, true];
        let pred = [false, false, true, true, true, true, false];
        let report = ConfusionMatrix::from_labels(&truth, &pred).unwrap().report();

        let no = &report.classes[0];
        assert!((no.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((no.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(no.support, 3);

        let swing = &report.classes[1];
        assert!((swing.precision - 0.75).abs() < 1e-12);
        assert!((swing.recall - 0.75).abs() < 1e-12);
        assert_eq!(swing.support, 4);

        assert!((report.macro_avg.f1 - (2.0 / 3.0 + 0.75) / 2.0).abs() < 1e-12);
        let weighted = (3.0 * (2.0 / 3.0) + 4.0 * 0.75) / 7.0;
        assert!((report.weighted_avg.recall - weighted).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 7);
    }

    #[test]
    fn never_predicted_class_scores_zero() {
        let truth = [false, true, true];
        let pred = [false, false, false];
        let report = ConfusionMatrix::from_labels(&truth, &pred).unwrap().report();
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
    }

    #[test]
    fn empty_and_mismatched_inputs() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[]),
            Err(RfError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[true], &[true, false]),
            Err(RfError::MetricLengthMismatch { truth: 1, scores: 2 })
        ));
    }

    #[test]
    fn display_has_labels() {
        let cm = ConfusionMatrix::from_labels(&[false, true], &[false, true]).unwrap();
        let text = format!("{cm}\n{}", cm.report());
        assert!(text.contains("true_swing"));
        assert!(text.contains("weighted avg"));
    }
}
