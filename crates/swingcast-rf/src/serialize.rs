//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::Hyperparameters;
use crate::error::RfError;
use crate::forest::RandomForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the forest.
    n_trees: usize,
    /// Number of features the model was trained on.
    n_features: usize,
    /// Hyperparameters selected for this forest.
    hyperparameters: Hyperparameters,
    /// Training feature columns, in the order `predict_proba` expects.
    feature_names: Vec<String>,
    /// The serialized forest.
    forest: RandomForest,
}

impl ModelEnvelope {
    fn check_consistency(&self, path: &Path) -> Result<(), RfError> {
        let forest = &self.forest;
        let reason = if forest.trees.is_empty() {
            Some("forest has no trees".to_string())
        } else if self.n_trees != forest.trees.len() {
            Some(format!(
                "header lists {} trees, forest has {}",
                self.n_trees,
                forest.trees.len()
            ))
        } else if self.n_features != forest.n_features
            || forest.feature_names.len() != forest.n_features
        {
            Some(format!(
                "header lists {} features, forest has {} with {} names",
                self.n_features,
                forest.n_features,
                forest.feature_names.len()
            ))
        } else if self.feature_names != forest.feature_names {
            Some("feature names differ between header and forest".to_string())
        } else if self.hyperparameters != forest.hyperparameters {
            Some(format!(
                "header hyperparameters {} differ from forest {}",
                self.hyperparameters, forest.hyperparameters
            ))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(RfError::InconsistentModel {
                path: path.to_path_buf(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl RandomForest {
    /// Write the model to `path` as bincode inside a versioned envelope.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            hyperparameters: self.hyperparameters,
            feature_names: self.feature_names.clone(),
            forest: self.clone(),
        };

        let bytes = bincode::serialize(&envelope).map_err(|e| RfError::SerializeModel {
            source: e,
        })?;

        std::fs::write(path, &bytes).map_err(|e| RfError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            params = %self.hyperparameters,
            "model saved"
        );

        Ok(())
    }

    /// Read a model written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`RfError::InconsistentModel`] | empty forest, or header fields disagree with the forest |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| RfError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope = bincode::deserialize(&bytes).map_err(|e| {
            RfError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        envelope.check_consistency(path)?;

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            params = %envelope.hyperparameters,
            "model loaded"
        );

        Ok(envelope.forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{FORMAT_VERSION, ModelEnvelope};
    use crate::config::RandomForestConfig;
    use crate::forest::RandomForest;

    fn train_simple_model() -> RandomForest {
        let features = vec![
            vec![88.0, -0.4],
            vec![90.0, 0.1],
            vec![91.0, -0.2],
            vec![95.0, 0.3],
            vec![96.0, 0.0],
            vec![97.0, 0.2],
        ];
        let labels = vec![false, false, false, true, true, true];
        let names = vec!["release_speed".to_string(), "plate_x".to_string()];
        RandomForestConfig::new(5)
            .unwrap()
            .with_max_depth(Some(3))
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn round_trip_keeps_predictions_and_metadata() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("swing_model.bin");

        let forest = train_simple_model();
        forest.save(&model_path).unwrap();
        let loaded = RandomForest::load(&model_path).unwrap();

        for sample in [vec![89.0, 0.0], vec![96.5, 0.1], vec![93.0, -0.1]] {
            assert_eq!(forest.predict(&sample).unwrap(), loaded.predict(&sample).unwrap());
            assert_eq!(
                forest.predict_proba(&sample).unwrap(),
                loaded.predict_proba(&sample).unwrap()
            );
        }
        assert_eq!(loaded.feature_names(), forest.feature_names());
        assert_eq!(loaded.hyperparameters(), forest.hyperparameters());
        assert_eq!(loaded.n_trees(), 5);
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, crate::RfError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, crate::RfError::DeserializeModel { .. }));
    }

    #[test]
    fn version_mismatch_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let forest = train_simple_model();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_trees: forest.n_trees(),
            n_features: forest.n_features(),
            hyperparameters: forest.hyperparameters(),
            feature_names: forest.feature_names().to_vec(),
            forest,
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::RfError::IncompatibleModelVersion { found, .. } if found == FORMAT_VERSION + 1
        ));
    }

    fn write_envelope(path: &std::path::Path, envelope: &ModelEnvelope) {
        std::fs::write(path, bincode::serialize(envelope).unwrap()).unwrap();
    }

    fn envelope_for(forest: RandomForest) -> ModelEnvelope {
        ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: forest.n_trees(),
            n_features: forest.n_features(),
            hyperparameters: forest.hyperparameters(),
            feature_names: forest.feature_names().to_vec(),
            forest,
        }
    }

    #[test]
    fn empty_forest_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        let mut forest = train_simple_model();
        forest.trees.clear();
        write_envelope(&path, &envelope_for(forest));

        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::RfError::InconsistentModel { ref reason, .. } if reason.contains("no trees")
        ));
    }

    #[test]
    fn header_mismatch_rejected() {
        let dir = TempDir::new().unwrap();

        let path = dir.path().join("features.bin");
        let mut envelope = envelope_for(train_simple_model());
        envelope.n_features += 1;
        write_envelope(&path, &envelope);
        assert!(matches!(
            RandomForest::load(&path).unwrap_err(),
            crate::RfError::InconsistentModel { .. }
        ));

        let path = dir.path().join("names.bin");
        let mut envelope = envelope_for(train_simple_model());
        envelope.feature_names.reverse();
        write_envelope(&path, &envelope);
        assert!(matches!(
            RandomForest::load(&path).unwrap_err(),
            crate::RfError::InconsistentModel { ref reason, .. } if reason.contains("names")
        ));

        let path = dir.path().join("trees.bin");
        let mut envelope = envelope_for(train_simple_model());
        envelope.n_trees = 3;
        write_envelope(&path, &envelope);
        assert!(matches!(
            RandomForest::load(&path).unwrap_err(),
            crate::RfError::InconsistentModel { .. }
        ));
    }
}
