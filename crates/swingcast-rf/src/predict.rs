//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::Hyperparameters;
use crate::error::RfError;
use crate::forest::RandomForest;

impl RandomForest {
    /// Swing probability for one sample: the mean of the trees' leaf
    /// probabilities.
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
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict_proba(sample)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    /// Predict swing (`true`) or no-swing for one sample.
    ///
    /// A probability of exactly one half resolves to no-swing.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<bool, RfError> {
        Ok(self.predict_proba(sample)? > 0.5)
    }

    /// Swing probabilities for a batch of samples, computed in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Class predictions for a batch of samples, computed in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<bool>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the training feature-column names, in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the hyperparameters this forest was trained with.
    #[must_use]
    pub fn hyperparameters(&self) -> Hyperparameters {
        self.hyperparameters
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RandomForestConfig;
    use crate::error::RfError;

    fn forest() -> crate::RandomForest {
        let features = vec![
            vec![0.0],
            vec![0.2],
            vec![0.4],
            vec![3.0],
            vec![3.2],
            vec![3.4],
        ];
        let labels = vec![false, false, false, true, true, true];
        RandomForestConfig::new(15)
            .unwrap()
            .fit(&features, &labels, &["x".to_string()])
            .unwrap()
            .into_forest()
    }

    #[test]
    fn probabilities_are_in_unit_interval() {
        let forest = forest();
        for x in [-1.0, 0.1, 1.7, 3.3, 10.0] {
            let p = forest.predict_proba(&[x]).unwrap();
            assert!((0.0..=1.0).contains(&p), "p = {p}");
        }
    }

    #[test]
    fn batch_matches_single() {
        let forest = forest();
        let rows = vec![vec![0.1], vec![3.1], vec![1.5]];
        let batch = forest.predict_proba_batch(&rows).unwrap();
        for (row, p) in rows.iter().zip(batch) {
            assert_eq!(forest.predict_proba(row).unwrap(), p);
        }
        let classes = forest.predict_batch(&rows).unwrap();
        assert_eq!(classes.len(), 3);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let err = forest().predict_proba(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 1, got: 2 }
        ));
    }
}
