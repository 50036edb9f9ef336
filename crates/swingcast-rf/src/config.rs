//! Configuration builder for Random Forest training.

use std::fmt;

use crate::error::RfError;
use crate::result::TrainingResult;
use crate::split::SplitCriterion;

/// Strategy for determining the number of features drawn at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features (rounded up).
    Sqrt,
    /// Log base 2 of total features (rounded up, at least 1).
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete feature count for a dataset width.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] if the result is outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// The two hyperparameters tuned by grid search and stored with a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Hyperparameters {
    /// Number of trees in the ensemble.
    pub n_estimators: usize,
    /// Maximum tree depth; `None` is unlimited.
    pub max_depth: Option<usize>,
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_depth {
            Some(d) => write!(f, "n_estimators={}, max_depth={d}", self.n_estimators),
            None => write!(f, "n_estimators={}, max_depth=none", self.n_estimators),
        }
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default  |
/// |---------------------|----------|
/// | `max_features`      | `Sqrt`   |
/// | `max_depth`         | `None`   |
/// | `min_samples_split` | 2        |
/// | `min_samples_leaf`  | 1        |
/// | `criterion`         | `Gini`   |
/// | `bootstrap`         | `true`   |
/// | `seed`              | 42       |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) bootstrap: bool,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            bootstrap: true,
            seed: 42,
        })
    }

    /// Copy this config with the tree count and depth replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn with_hyperparameters(&self, params: Hyperparameters) -> Result<Self, RfError> {
        if params.n_estimators == 0 {
            return Err(RfError::InvalidTreeCount { n_trees: 0 });
        }
        Ok(Self {
            n_trees: params.n_estimators,
            max_depth: params.max_depth,
            ..self.clone()
        })
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
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

    /// Set the minimum number of samples required in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Draw a bootstrap sample per tree (`true`) or train every tree on all rows.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the tuned hyperparameters of this config.
    #[must_use]
    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            n_estimators: self.n_trees,
            max_depth: self.max_depth,
        }
    }

    /// Train a Random Forest.
    ///
    /// `features[sample][feature]` is row-major, `labels[sample]` is `true`
    /// for a swing, `feature_names` names each column.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                             |
    /// |-----------------------------------|--------------------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `features` is empty                              |
    /// | [`RfError::LabelCountMismatch`]   | label count differs from row count               |
    /// | [`RfError::ZeroFeatures`]         | rows have zero feature columns                   |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths                   |
    /// | [`RfError::FeatureNameMismatch`]  | name count differs from column count             |
    /// | [`RfError::NonFiniteValue`]       | any value is NaN or infinite                     |
    /// | [`RfError::InvalidMaxFeatures`]   | resolved max_features is outside [1, n_features] |
    /// | [`RfError::InvalidMaxDepth`]      | `max_depth` is `Some(0)`                         |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[bool],
        feature_names: &[String],
    ) -> Result<TrainingResult, RfError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_max_features() {
        assert_eq!(MaxFeatures::Sqrt.resolve(17).unwrap(), 5);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(9).unwrap(), 5);
        assert_eq!(MaxFeatures::All.resolve(4).unwrap(), 4);
        assert!(matches!(
            MaxFeatures::Fixed(6).resolve(4),
            Err(RfError::InvalidMaxFeatures { max_features: 6, n_features: 4 })
        ));
    }

    #[test]
    fn with_hyperparameters_keeps_other_settings() {
        let base = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(9)
            .with_min_samples_leaf(3);
        let tuned = base
            .with_hyperparameters(Hyperparameters {
                n_estimators: 200,
                max_depth: Some(15),
            })
            .unwrap();
        assert_eq!(tuned.n_trees(), 200);
        assert_eq!(tuned.max_depth(), Some(15));
        assert_eq!(tuned.seed(), 9);
        assert_eq!(tuned.min_samples_leaf, 3);
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn hyperparameters_display() {
        let p = Hyperparameters {
            n_estimators: 100,
            max_depth: Some(20),
        };
        assert_eq!(p.to_string(), "n_estimators=100, max_depth=20");
    }
}
