//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{Hyperparameters, RandomForestConfig};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{TrainingMetadata, TrainingResult};
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_training_data};

/// A fitted Random Forest swing classifier.
///
/// Carries the hyperparameters it was trained with and the names of its
/// feature columns, so a saved model fully describes its expected input.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) hyperparameters: Hyperparameters,
}

/// Draw `n_samples` row indices with replacement.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[bool],
    feature_names: &[String],
) -> Result<TrainingResult, RfError> {
    let n_features = validate_training_data(features, labels)?;
    if feature_names.len() != n_features {
        return Err(RfError::FeatureNameMismatch {
            n_features,
            names: feature_names.len(),
        });
    }
    let n_samples = features.len();
    let max_features = config.max_features.resolve(n_features)?;

    let tree_template = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features));
    tree_template.validate(n_features)?;

    let n_swings = labels.iter().filter(|&&l| l).count();
    debug!(
        n_samples,
        n_features,
        n_swings,
        max_features,
        bootstrap = config.bootstrap,
        "training random forest"
    );

    // Per-tree seeds come from one master stream so results do not depend
    // on rayon's scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();
    let bootstrap = config.bootstrap;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tree_config = tree_template.clone().with_seed(rng.r#gen());
            if bootstrap {
                let indices = bootstrap_sample(n_samples, &mut rng);
                let boot_features: Vec<Vec<f64>> =
                    indices.iter().map(|&i| features[i].clone()).collect();
                let boot_labels: Vec<bool> = indices.iter().map(|&i| labels[i]).collect();
                tree_config.fit_validated(&boot_features, &boot_labels, n_features, max_features)
            } else {
                tree_config.fit_validated(features, labels, n_features, max_features)
            }
        })
        .collect();

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);

    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
        hyperparameters: config.hyperparameters(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_samples,
        n_swings,
        max_features_resolved: max_features,
    };

    info!(
        n_trees = config.n_trees,
        max_depth = ?config.max_depth,
        n_samples,
        "random forest trained"
    );

    Ok(TrainingResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};

    /// Two noisy clusters along feature 0; feature 1 is noise.
    fn make_data() -> (Vec<Vec<f64>>, Vec<bool>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.1;
            features.push(vec![jitter, (i % 5) as f64]);
            labels.push(false);
            features.push(vec![5.0 + jitter, (i % 3) as f64]);
            labels.push(true);
        }
        (features, labels, vec!["x".into(), "noise".into()])
    }

    #[test]
    fn separable_training_accuracy() {
        let (features, labels, names) = make_data();
        let result = RandomForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let predictions = result.forest().predict_batch(&features).unwrap();
        let correct = predictions.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert_eq!(correct, labels.len());
    }

    #[test]
    fn importances_sum_to_one_and_rank_signal_first() {
        let (features, labels, names) = make_data();
        let result = RandomForestConfig::new(20)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(result.importances()[0].name, "x");
        assert_eq!(result.importances()[0].rank, 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_data();
        let fit = || {
            RandomForestConfig::new(10)
                .unwrap()
                .with_seed(99)
                .fit(&features, &labels, &names)
                .unwrap()
                .into_forest()
        };
        let (a, b) = (fit(), fit());
        assert_eq!(
            a.predict_proba_batch(&features).unwrap(),
            b.predict_proba_batch(&features).unwrap()
        );
    }

    #[test]
    fn stores_hyperparameters() {
        let (features, labels, names) = make_data();
        let forest = RandomForestConfig::new(3)
            .unwrap()
            .with_max_depth(Some(2))
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest();
        assert_eq!(forest.hyperparameters().n_estimators, 3);
        assert_eq!(forest.hyperparameters().max_depth, Some(2));
        assert_eq!(forest.n_trees(), 3);
        assert!(forest.trees.iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn feature_name_mismatch_error() {
        let (features, labels, _) = make_data();
        let err = RandomForestConfig::new(2)
            .unwrap()
            .fit(&features, &labels, &["x".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::RfError::FeatureNameMismatch { n_features: 2, names: 1 }
        ));
    }

    #[test]
    fn without_bootstrap_all_trees_see_all_rows() {
        let (features, labels, names) = make_data();
        let forest = RandomForestConfig::new(4)
            .unwrap()
            .with_bootstrap(false)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest();
        for tree in &forest.trees {
            assert_eq!(tree.nodes[0].n_samples(), features.len());
        }
    }
}
