//! Training result types for Random Forest.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// Metadata about a training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    pub n_trees: usize,
    pub n_features: usize,
    pub n_samples: usize,
    /// Number of training rows labelled swing.
    pub n_swings: usize,
    pub max_features_resolved: usize,
}

/// Result of Random Forest training: the fitted forest, its ranked
/// impurity importances, and run metadata.
#[derive(Debug)]
pub struct TrainingResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
}

impl TrainingResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Ranked feature importances, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
