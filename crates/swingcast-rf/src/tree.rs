use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Node, NodeIndex},
    split::{ClassCounts, SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` grows until
    /// leaves are pure or too small to split.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features drawn at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the structural parameters against a feature count and
    /// resolve `max_features`.
    pub(crate) fn validate(&self, n_features: usize) -> Result<usize, RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }

    /// Train a decision tree on a row-major dataset.
    ///
    /// `features[sample][feature]`, `labels[sample]` is `true` for a swing.
    ///
    /// # Errors
    ///
    /// Input errors from [`validate_training_data`] and configuration errors
    /// ([`RfError::InvalidMaxDepth`], [`RfError::InvalidMinSamplesSplit`],
    /// [`RfError::InvalidMinSamplesLeaf`], [`RfError::InvalidMaxFeatures`]).
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[bool]) -> Result<DecisionTree, RfError> {
        let n_features = validate_training_data(features, labels)?;
        let max_features = self.validate(n_features)?;
        Ok(self.fit_validated(features, labels, n_features, max_features))
    }

    /// Grow the tree on data that has already passed validation.
    pub(crate) fn fit_validated(
        &self,
        features: &[Vec<f64>],
        labels: &[bool],
        n_features: usize,
        max_features: usize,
    ) -> DecisionTree {
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let mut builder = TreeBuilder {
            columns: &columns,
            labels,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.grow(&sample_indices, 0);

        debug!(n_nodes = builder.arena.len(), "decision tree built");

        DecisionTree {
            nodes: builder.arena,
            n_features,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a row-major training matrix and its labels. Returns the column count.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`RfError::EmptyDataset`] | `features` is empty |
/// | [`RfError::LabelCountMismatch`] | `labels.len() != features.len()` |
/// | [`RfError::ZeroFeatures`] | rows have zero columns |
/// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths |
/// | [`RfError::NonFiniteValue`] | any value is NaN or infinite |
pub fn validate_training_data(features: &[Vec<f64>], labels: &[bool]) -> Result<usize, RfError> {
    let first = features.first().ok_or(RfError::EmptyDataset)?;
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            samples: features.len(),
            labels: labels.len(),
        });
    }
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Recursive arena builder for one tree.
struct TreeBuilder<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [bool],
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let counts = ClassCounts::tally(self.labels, sample_indices);
        let impurity = self.config.criterion.impurity(counts);
        let n_samples = counts.total();

        let at_max_depth = self.config.max_depth.is_some_and(|d| depth >= d);
        let stop = at_max_depth || impurity.is_pure() || n_samples < self.config.min_samples_split;

        let split = if stop {
            None
        } else {
            find_best_split(
                self.columns,
                self.labels,
                sample_indices,
                self.config.criterion,
                self.max_features,
                self.config.min_samples_leaf,
                &mut self.rng,
            )
        };

        let Some(split) = split else {
            self.arena.push(Node::Leaf {
                swing_probability: counts.positive_fraction(),
                impurity,
                n_samples,
            });
            return NodeIndex::new(self.arena.len() - 1);
        };

        // Reserve this node's slot so children get later indices.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            swing_probability: counts.positive_fraction(),
            impurity,
            n_samples,
        });

        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };
        NodeIndex::new(node_idx)
    }
}

/// A fitted CART decision tree over binary labels.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Return the swing probability of the leaf this sample falls into.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.leaf_probability(sample))
    }

    /// Predict swing (`true`) when the leaf probability exceeds one half.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<bool, RfError> {
        Ok(self.predict_proba(sample)? > 0.5)
    }

    /// Mean Decrease in Impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn leaf_probability(&self, sample: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    swing_probability, ..
                } => return *swing_probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
