use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Per-node label tally for the binary swing / no-swing problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    /// Samples labelled no-swing.
    pub negative: usize,
    /// Samples labelled swing.
    pub positive: usize,
}

impl ClassCounts {
    /// Tally the labels of the given sample indices.
    pub(crate) fn tally(labels: &[bool], sample_indices: &[usize]) -> Self {
        let positive = sample_indices.iter().filter(|&&si| labels[si]).count();
        Self {
            negative: sample_indices.len() - positive,
            positive,
        }
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(self) -> usize {
        self.negative + self.positive
    }

    /// Fraction of samples labelled swing; 0.0 for an empty tally.
    #[must_use]
    pub fn positive_fraction(self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.positive as f64 / n as f64,
        }
    }

    fn add(&mut self, label: bool) {
        if label {
            self.positive += 1;
        } else {
            self.negative += 1;
        }
    }

    fn remove(&mut self, label: bool) {
        if label {
            self.positive -= 1;
        } else {
            self.negative -= 1;
        }
    }
}

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: `1 - p² - (1 - p)²`.
    Gini,
    /// Information entropy in nats.
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node with the given label tally. Empty nodes are pure.
    #[must_use]
    pub fn impurity(&self, counts: ClassCounts) -> Impurity {
        let n = counts.total();
        if n == 0 {
            return Impurity::new(0.0);
        }
        let p = counts.positive_fraction();
        let q = 1.0 - p;
        let value = match self {
            SplitCriterion::Gini => 1.0 - p * p - q * q,
            SplitCriterion::Entropy => [p, q]
                .into_iter()
                .filter(|&x| x > 0.0)
                .map(|x| -x * x.ln())
                .sum(),
        };
        Impurity::new(value)
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n·I(parent) - n_l·I(left) - n_r·I(right)`, the unnormalised MDI term.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best threshold split among `max_features` randomly drawn features.
///
/// `features` is column-major (`features[feature][sample]`). For each drawn
/// feature the node's samples are sorted by value and scanned once, moving
/// one sample at a time from the right tally to the left tally. Thresholds
/// sit halfway between consecutive distinct values.
///
/// Returns `None` when every drawn feature is constant over the node or
/// every boundary violates `min_samples_leaf`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[bool],
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent = ClassCounts::tally(labels, sample_indices);
    let parent_weighted = n_samples as f64 * criterion.impurity(parent).value();

    // Partial Fisher-Yates over feature indices.
    let take = max_features.min(n_features);
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(usize, f64)> = None;
    let mut sorted: Vec<(f64, bool)> = Vec::with_capacity(n_samples);

    for &feat_idx in &feature_order[..take] {
        let column = &features[feat_idx];
        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (column[si], labels[si])));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = ClassCounts::default();
        let mut right = parent;

        for i in 0..n_samples - 1 {
            let (value, label) = sorted[i];
            left.add(label);
            right.remove(label);

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }
            if left.total() < min_samples_leaf || right.total() < min_samples_leaf {
                continue;
            }

            let decrease = parent_weighted
                - left.total() as f64 * criterion.impurity(left).value()
                - right.total() as f64 * criterion.impurity(right).value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((feat_idx, value + (next - value) / 2.0));
            }
        }
    }

    let (feat_idx, threshold) = best?;
    let column = &features[feat_idx];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| column[si] <= threshold);

    Some(SplitResult {
        feature: FeatureIndex::new(feat_idx),
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn counts(negative: usize, positive: usize) -> ClassCounts {
        ClassCounts { negative, positive }
    }

    #[test]
    fn gini_values() {
        assert!(SplitCriterion::Gini.impurity(counts(10, 0)).is_pure());
        let balanced = SplitCriterion::Gini.impurity(counts(5, 5));
        assert!((balanced.value() - 0.5).abs() < 1e-12);
        let skewed = SplitCriterion::Gini.impurity(counts(1, 3));
        assert!((skewed.value() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn entropy_values() {
        assert!(SplitCriterion::Entropy.impurity(counts(0, 7)).is_pure());
        let balanced = SplitCriterion::Entropy.impurity(counts(4, 4));
        assert!((balanced.value() - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn tally_counts_selected_samples() {
        let labels = [true, false, true, true];
        let c = ClassCounts::tally(&labels, &[0, 1, 3]);
        assert_eq!(c, counts(1, 2));
        assert!((c.positive_fraction() - 2.0 / 3.0).abs() < 1e-12);
        assert!(ClassCounts::default().positive_fraction().abs() < f64::EPSILON);
    }

    #[test]
    fn separable_feature_is_chosen() {
        // Feature 0 separates the classes, feature 1 is constant.
        let features = vec![
            vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0],
            vec![0.5; 6],
        ];
        let labels = [false, false, false, true, true, true];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&features, &labels, &indices, SplitCriterion::Gini, 2, 1, &mut rng)
            .expect("a split exists");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        // Parent gini 0.5 over 6 samples, both children pure.
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0; 4]];
        let labels = [false, false, true, true];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(
            find_best_split(&features, &labels, &indices, SplitCriterion::Gini, 1, 1, &mut rng)
                .is_none()
        );
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        let labels = [false, true];
        let indices = [0, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(
            find_best_split(&features, &labels, &indices, SplitCriterion::Gini, 1, 2, &mut rng)
                .is_none()
        );
    }
}
