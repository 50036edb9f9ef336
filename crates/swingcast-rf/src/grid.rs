//! Grid-search model selection with stratified k-fold cross-validation,
//! scored by ROC-AUC.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::{Hyperparameters, RandomForestConfig};
use crate::error::RfError;
use crate::metrics::roc_auc;
use crate::result::TrainingResult;

/// Candidate values for the two tuned hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    n_estimators: Vec<usize>,
    max_depth: Vec<Option<usize>>,
}

impl ParamGrid {
    /// Build a grid from candidate tree counts and depths.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyGrid`] | either list is empty |
    /// | [`RfError::InvalidTreeCount`] | a tree count is zero |
    /// | [`RfError::InvalidMaxDepth`] | a depth is `Some(0)` |
    pub fn new(n_estimators: Vec<usize>, max_depth: Vec<Option<usize>>) -> Result<Self, RfError> {
        if n_estimators.is_empty() || max_depth.is_empty() {
            return Err(RfError::EmptyGrid);
        }
        if n_estimators.contains(&0) {
            return Err(RfError::InvalidTreeCount { n_trees: 0 });
        }
        if max_depth.contains(&Some(0)) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        Ok(Self {
            n_estimators,
            max_depth,
        })
    }

    /// Every combination, `max_depth` outer and `n_estimators` inner.
    #[must_use]
    pub fn combinations(&self) -> Vec<Hyperparameters> {
        self.max_depth
            .iter()
            .flat_map(|&max_depth| {
                self.n_estimators.iter().map(move |&n_estimators| Hyperparameters {
                    n_estimators,
                    max_depth,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParamGrid {
    /// Tree counts 50, 100, 200, 300 crossed with depths 10 to 30 by 5.
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200, 300],
            max_depth: vec![Some(10), Some(15), Some(20), Some(25), Some(30)],
        }
    }
}

/// Cross-validated score of one grid combination.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CandidateScore {
    pub params: Hyperparameters,
    /// ROC-AUC of each validation fold, in fold order.
    pub fold_aucs: Vec<f64>,
    pub mean_auc: f64,
    /// Population standard deviation of the fold AUCs.
    pub std_auc: f64,
}

/// Scores for every candidate plus the winner refit on all rows.
#[derive(Debug)]
pub struct GridSearchResult {
    candidates: Vec<CandidateScore>,
    best_index: usize,
    best: TrainingResult,
}

impl GridSearchResult {
    /// All candidates in grid iteration order.
    #[must_use]
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    #[must_use]
    pub fn best_candidate(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }

    #[must_use]
    pub fn best_params(&self) -> Hyperparameters {
        self.best_candidate().params
    }

    /// The winning combination refit on every training row.
    #[must_use]
    pub fn best(&self) -> &TrainingResult {
        &self.best
    }

    #[must_use]
    pub fn into_best(self) -> TrainingResult {
        self.best
    }
}

/// Stratified k-fold grid search.
///
/// Construct via [`GridSearchCv::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct GridSearchCv {
    n_folds: usize,
    seed: u64,
}

impl GridSearchCv {
    /// Create a grid search with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Score every grid combination by mean fold ROC-AUC and refit the best.
    ///
    /// All candidates share the same folds. The best candidate is the first
    /// one, in [`ParamGrid::combinations`] order, with the highest mean AUC.
    /// Settings of `base` other than tree count and depth apply to every
    /// candidate.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | zero samples |
    /// | [`RfError::LabelCountMismatch`] | label count differs from row count |
    /// | [`RfError::DegenerateLabels`] | only one class present |
    /// | [`RfError::TooFewSamplesForFolds`] | a class has fewer samples than folds |
    /// | Other RF errors | from underlying training |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_candidates = grid.len(), n_samples = features.len()))]
    pub fn fit(
        &self,
        base: &RandomForestConfig,
        grid: &ParamGrid,
        features: &[Vec<f64>],
        labels: &[bool],
        feature_names: &[String],
    ) -> Result<GridSearchResult, RfError> {
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if features.len() != labels.len() {
            return Err(RfError::LabelCountMismatch {
                samples: features.len(),
                labels: labels.len(),
            });
        }

        let fold_assignments = stratified_folds(labels, self.n_folds, self.seed)?;
        let folds: Vec<Fold> = (0..self.n_folds)
            .map(|fold| Fold::gather(fold, &fold_assignments, features, labels))
            .collect();

        let mut candidates = Vec::with_capacity(grid.len());
        for params in grid.combinations() {
            let config = base.with_hyperparameters(params)?;
            let mut fold_aucs = Vec::with_capacity(self.n_folds);
            for fold in &folds {
                let fold_config = config
                    .clone()
                    .with_seed(base.seed.wrapping_add(fold.index as u64));
                let result =
                    fold_config.fit(&fold.train_features, &fold.train_labels, feature_names)?;
                let scores = result.forest().predict_proba_batch(&fold.test_features)?;
                let auc = roc_auc(&fold.test_labels, &scores)?;
                debug!(%params, fold = fold.index, auc, "fold scored");
                fold_aucs.push(auc);
            }

            let mean_auc = fold_aucs.iter().sum::<f64>() / fold_aucs.len() as f64;
            let std_auc = (fold_aucs
                .iter()
                .map(|&a| (a - mean_auc).powi(2))
                .sum::<f64>()
                / fold_aucs.len() as f64)
                .sqrt();
            info!(%params, mean_auc, std_auc, "candidate scored");
            candidates.push(CandidateScore {
                params,
                fold_aucs,
                mean_auc,
                std_auc,
            });
        }

        let mut best_index = 0;
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.mean_auc > candidates[best_index].mean_auc {
                best_index = i;
            }
        }
        let best_params = candidates[best_index].params;
        info!(
            params = %best_params,
            mean_auc = candidates[best_index].mean_auc,
            "best candidate selected, refitting on all rows"
        );

        let best = base
            .with_hyperparameters(best_params)?
            .fit(features, labels, feature_names)?;

        Ok(GridSearchResult {
            candidates,
            best_index,
            best,
        })
    }
}

/// Train/test rows of one fold.
struct Fold {
    index: usize,
    train_features: Vec<Vec<f64>>,
    train_labels: Vec<bool>,
    test_features: Vec<Vec<f64>>,
    test_labels: Vec<bool>,
}

impl Fold {
    fn gather(index: usize, assignments: &[usize], features: &[Vec<f64>], labels: &[bool]) -> Self {
        let mut fold = Self {
            index,
            train_features: Vec::new(),
            train_labels: Vec::new(),
            test_features: Vec::new(),
            test_labels: Vec::new(),
        };
        for (i, &assigned) in assignments.iter().enumerate() {
            if assigned == index {
                fold.test_features.push(features[i].clone());
                fold.test_labels.push(labels[i]);
            } else {
                fold.train_features.push(features[i].clone());
                fold.train_labels.push(labels[i]);
            }
        }
        fold
    }
}

/// Assign each sample a fold in `0..n_folds`.
///
/// Groups samples by class, shuffles within each class, then round-robins
/// across folds so each fold gets roughly the class balance of the whole.
pub(crate) fn stratified_folds(
    labels: &[bool],
    n_folds: usize,
    seed: u64,
) -> Result<Vec<usize>, RfError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut class_indices: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &label) in labels.iter().enumerate() {
        class_indices[usize::from(label)].push(i);
    }

    for (class, indices) in [false, true].into_iter().zip(&class_indices) {
        if indices.is_empty() {
            return Err(RfError::DegenerateLabels {
                class: !class,
                n_samples: labels.len(),
            });
        }
    }
    for (class, indices) in [false, true].into_iter().zip(&class_indices) {
        if indices.len() < n_folds {
            return Err(RfError::TooFewSamplesForFolds {
                class,
                count: indices.len(),
                n_folds,
            });
        }
    }

    let mut fold_assignments = vec![0usize; labels.len()];
    for indices in &mut class_indices {
        indices.shuffle(&mut rng);
        for (j, &idx) in indices.iter().enumerate() {
            fold_assignments[idx] = j % n_folds;
        }
    }
    Ok(fold_assignments)
}
