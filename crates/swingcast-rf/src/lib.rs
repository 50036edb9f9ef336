//! Binary Random Forest for swing / no-swing classification.
//!
//! CART trees with Gini or entropy splits, trained in parallel via rayon on
//! bootstrap samples. Around the forest: grid-search model selection by
//! stratified k-fold ROC-AUC, a seeded holdout split, ROC and
//! confusion-matrix metrics, impurity feature importances, and a versioned
//! bincode model file.

mod config;
mod confusion;
mod error;
mod forest;
mod grid;
mod holdout;
mod importance;
mod metrics;
mod node;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{Hyperparameters, MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use grid::{CandidateScore, GridSearchCv, GridSearchResult, ParamGrid};
pub use holdout::{HoldoutSplit, select_rows};
pub use importance::{ImportanceChart, RankedFeature};
pub use metrics::{RocCurve, RocPoint, accuracy, roc_auc, roc_curve};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use result::{TrainingMetadata, TrainingResult};
pub use split::{ClassCounts, SplitCriterion};
pub use tree::{DecisionTree, DecisionTreeConfig, validate_training_data};
