//! Seeded train/validation split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::RfError;

/// Row indices of a train/validation partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl HoldoutSplit {
    /// Shuffle `0..n_samples` with `seed` and hold out
    /// `ceil(test_fraction * n_samples)` rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `n_samples` is zero |
    /// | [`RfError::InvalidValidationFraction`] | fraction outside (0, 1), or either side would be empty |
    pub fn new(n_samples: usize, test_fraction: f64, seed: u64) -> Result<Self, RfError> {
        if n_samples == 0 {
            return Err(RfError::EmptyDataset);
        }
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(RfError::InvalidValidationFraction {
                fraction: test_fraction,
            });
        }
        let n_test = (test_fraction * n_samples as f64).ceil() as usize;
        if n_test >= n_samples {
            return Err(RfError::InvalidValidationFraction {
                fraction: test_fraction,
            });
        }

        let mut order: Vec<usize> = (0..n_samples).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
        let train_indices = order.split_off(n_test);
        Ok(Self {
            train_indices,
            test_indices: order,
        })
    }
}

/// Gather `rows[i]` for each index, in index order.
pub fn select_rows<T: Clone>(rows: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| rows[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_every_row_once() {
        let split = HoldoutSplit::new(101, 0.2, 7).unwrap();
        assert_eq!(split.test_indices.len(), 21);
        assert_eq!(split.train_indices.len(), 80);
        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(&split.test_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn seed_controls_the_shuffle() {
        let a = HoldoutSplit::new(50, 0.2, 1).unwrap();
        let b = HoldoutSplit::new(50, 0.2, 1).unwrap();
        let c = HoldoutSplit::new(50, 0.2, 2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn rejects_bad_fractions() {
        for fraction in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(matches!(
                HoldoutSplit::new(10, fraction, 0),
                Err(RfError::InvalidValidationFraction { .. })
            ));
        }
        assert!(matches!(
            HoldoutSplit::new(1, 0.2, 0),
            Err(RfError::InvalidValidationFraction { .. })
        ));
        assert!(matches!(HoldoutSplit::new(0, 0.2, 0), Err(RfError::EmptyDataset)));
    }

    #[test]
    fn select_rows_follows_indices() {
        let rows = vec!["a", "b", "c", "d"];
        assert_eq!(select_rows(&rows, &[3, 0]), vec!["d", "a"]);
    }
}
