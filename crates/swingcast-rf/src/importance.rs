//! Feature importance aggregation across trees.

use std::fmt;

/// A feature with its normalized importance and 1-based rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedFeature {
    pub name: String,
    /// Mean decrease in impurity, normalized to sum to 1.0 over all features.
    pub importance: f64,
    /// 1 = most important.
    pub rank: usize,
}

/// Sum per-tree MDI vectors, normalize, and rank descending.
///
/// Ties keep column order (stable sort).
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], names: &[String]) -> Vec<RankedFeature> {
    let mut totals = vec![0.0f64; names.len()];
    for tree in per_tree {
        for (total, value) in totals.iter_mut().zip(tree) {
            *total += value;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in ranked.iter_mut().enumerate() {
        feature.rank = i + 1;
    }
    ranked
}

/// Horizontal text bar chart of ranked importances.
pub struct ImportanceChart<'a> {
    features: &'a [RankedFeature],
    width: usize,
}

impl<'a> ImportanceChart<'a> {
    /// Chart the given features with bars up to `width` characters long.
    #[must_use]
    pub fn new(features: &'a [RankedFeature], width: usize) -> Self {
        Self { features, width }
    }
}

impl fmt::Display for ImportanceChart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self.features.iter().map(|r| r.name.len()).max().unwrap_or(0);
        let top = self
            .features
            .iter()
            .map(|r| r.importance)
            .fold(0.0f64, f64::max);
        for feature in self.features {
            let bar = if top > 0.0 {
                ((feature.importance / top) * self.width as f64).round() as usize
            } else {
                0
            };
            writeln!(
                f,
                "{:>3} {:<label_width$} {:<width$} {:.4}",
                feature.rank,
                feature.name,
                "#".repeat(bar),
                feature.importance,
                width = self.width,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn aggregates_and_ranks() {
        let per_tree = vec![vec![0.5, 0.5, 0.0], vec![1.0, 0.0, 0.0]];
        let ranked = aggregate_importances(&per_tree, &names(&["a", "b", "c"]));
        assert_eq!(ranked[0].name, "a");
        assert!((ranked[0].importance - 0.75).abs() < 1e-12);
        assert_eq!(ranked[1].name, "b");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn all_zero_importances_stay_zero() {
        let ranked = aggregate_importances(&[vec![0.0, 0.0]], &names(&["a", "b"]));
        assert!(ranked.iter().all(|r| r.importance == 0.0));
        assert_eq!(ranked[0].name, "a");
    }

    #[test]
    fn chart_scales_to_top_feature() {
        let ranked = aggregate_importances(&[vec![0.9, 0.1]], &names(&["speed", "balls"]));
        let chart = ImportanceChart::new(&ranked, 10).to_string();
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(&"#".repeat(10)));
        assert!(lines[1].contains("balls"));
        assert!(!lines[1].contains("##"));
    }
}
