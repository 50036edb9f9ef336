//! Accuracy regression tests for swingcast-rf.
//!
//! These tests guard against algorithmic changes that degrade swing
//! classification on a deterministic synthetic pitch dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use swingcast_rf::{
    ConfusionMatrix, GridSearchCv, HoldoutSplit, ParamGrid, RandomForestConfig, roc_auc,
    select_rows,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic pitch dataset
// ---------------------------------------------------------------------------

/// Generate `n` pitches with columns `plate_x, plate_z, strikes, noise`.
///
/// Batters swing at 95% of pitches inside the zone (|plate_x| < 0.83,
/// 1.5 < plate_z < 3.5) and 3% outside it, plus a two-strike bump.
fn make_pitches(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<bool>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let plate_x = rng.gen_range(-1.5..1.5);
        let plate_z = rng.gen_range(0.5..4.5);
        let strikes = f64::from(rng.gen_range(0u8..3));
        let noise = rng.r#gen::<f64>();
        let in_zone = f64::abs(plate_x) < 0.83 && plate_z > 1.5 && plate_z < 3.5;
        let mut p: f64 = if in_zone { 0.95 } else { 0.03 };
        if strikes == 2.0 {
            p = (p + 0.1).min(1.0);
        }
        labels.push(rng.r#gen::<f64>() < p);
        features.push(vec![plate_x, plate_z, strikes, noise]);
    }
    let names = ["plate_x", "plate_z", "strikes", "noise"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    (features, labels, names)
}

// ---------------------------------------------------------------------------
// a) holdout_auc_above_threshold
// ---------------------------------------------------------------------------

/// Validation ROC-AUC of a 100-tree forest must exceed 0.8.
#[test]
fn holdout_auc_above_threshold() {
    let (features, labels, names) = make_pitches(1000, 42);
    let split = HoldoutSplit::new(features.len(), 0.2, 42).unwrap();
    let train_x = select_rows(&features, &split.train_indices);
    let train_y = select_rows(&labels, &split.train_indices);
    let test_x = select_rows(&features, &split.test_indices);
    let test_y = select_rows(&labels, &split.test_indices);

    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_max_depth(Some(10))
        .with_seed(42)
        .fit(&train_x, &train_y, &names)
        .unwrap()
        .into_forest();

    let scores = forest.predict_proba_batch(&test_x).unwrap();
    let auc = roc_auc(&test_y, &scores).unwrap();
    assert!(auc > 0.8, "validation auc {auc} <= 0.8");

    let predicted = forest.predict_batch(&test_x).unwrap();
    let cm = ConfusionMatrix::from_labels(&test_y, &predicted).unwrap();
    assert_eq!(cm.total(), 200);
    assert!(cm.accuracy() > 0.7, "accuracy {}", cm.accuracy());
}

// ---------------------------------------------------------------------------
// b) location_features_dominate_importance
// ---------------------------------------------------------------------------

/// The two location features must outrank pure noise.
#[test]
fn location_features_dominate_importance() {
    let (features, labels, names) = make_pitches(800, 7);
    let result = RandomForestConfig::new(50)
        .unwrap()
        .with_max_depth(Some(8))
        .with_seed(42)
        .fit(&features, &labels, &names)
        .unwrap();

    let rank_of = |name: &str| {
        result
            .importances()
            .iter()
            .find(|f| f.name == name)
            .unwrap()
            .rank
    };
    assert!(rank_of("plate_x") < rank_of("noise"));
    assert!(rank_of("plate_z") < rank_of("noise"));
}

// ---------------------------------------------------------------------------
// c) grid_search_beats_chance
// ---------------------------------------------------------------------------

/// Every grid candidate beats chance and the refit winner generalizes.
#[test]
fn grid_search_beats_chance() {
    let (features, labels, names) = make_pitches(600, 3);
    let split = HoldoutSplit::new(features.len(), 0.2, 3).unwrap();
    let train_x = select_rows(&features, &split.train_indices);
    let train_y = select_rows(&labels, &split.train_indices);

    let grid = ParamGrid::new(vec![10, 30], vec![Some(3), Some(8)]).unwrap();
    let base = RandomForestConfig::new(10).unwrap().with_seed(42);
    let result = GridSearchCv::new(5)
        .unwrap()
        .with_seed(42)
        .fit(&base, &grid, &train_x, &train_y, &names)
        .unwrap();

    assert!(result.candidates().iter().all(|c| c.mean_auc > 0.6));
    let test_x = select_rows(&features, &split.test_indices);
    let test_y = select_rows(&labels, &split.test_indices);
    let scores = result.best().forest().predict_proba_batch(&test_x).unwrap();
    assert!(roc_auc(&test_y, &scores).unwrap() > 0.7);
}

// ---------------------------------------------------------------------------
// d) seeded_runs_are_reproducible
// ---------------------------------------------------------------------------

#[test]
fn seeded_runs_are_reproducible() {
    let (features, labels, names) = make_pitches(300, 11);
    let fit = || {
        RandomForestConfig::new(20)
            .unwrap()
            .with_seed(5)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest()
            .predict_proba_batch(&features)
            .unwrap()
    };
    assert_eq!(fit(), fit());
}
