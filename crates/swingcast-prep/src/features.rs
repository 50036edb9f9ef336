//! Swing labels, the relative pitch height, and feature extraction.

use std::collections::BTreeSet;

use swingcast_io::SeasonTable;
use tracing::{debug, instrument};

use crate::error::PrepError;

/// Name of the derived vertical-location feature.
pub const RELATIVE_PITCH_HEIGHT: &str = "relative_pitch_height";

/// Outcomes in which the batter offers at the pitch.
pub const SWING_EVENTS: [&str; 9] = [
    "foul",
    "foul_tip",
    "foul_bunt",
    "missed_bunt",
    "swinging_strike",
    "swinging_strike_blocked",
    "hit_into_play",
    "hit_into_play_no_out",
    "hit_into_play_score",
];

/// `(plate_z - sz_bot) / (sz_top - sz_bot)`: 0 at the bottom of the zone,
/// 1 at the top.
///
/// No guarding: a collapsed zone (`sz_top == sz_bot`) yields `±inf`, or
/// NaN when `plate_z` also equals `sz_bot`.
#[must_use]
pub fn relative_pitch_height(plate_z: f64, sz_top: f64, sz_bot: f64) -> f64 {
    (plate_z - sz_bot) / (sz_top - sz_bot)
}

/// Which columns become features and which outcomes count as swings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureConfig {
    /// Numeric features in output order. [`RELATIVE_PITCH_HEIGHT`] is
    /// derived, every other name is read from the table.
    pub numeric: Vec<String>,
    /// Categorical features, one-hot encoded after the numeric block.
    pub categorical: Vec<String>,
    /// Column holding the pitch outcome.
    pub description_column: String,
    pub plate_z_column: String,
    pub sz_top_column: String,
    pub sz_bot_column: String,
    /// Exact outcome strings labelled as a swing.
    pub swing_events: BTreeSet<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect::<Vec<_>>();
        Self {
            numeric: owned(&[
                "release_speed",
                "plate_x",
                "plate_z",
                "pfx_x",
                "pfx_z",
                "balls",
                "strikes",
                RELATIVE_PITCH_HEIGHT,
            ]),
            categorical: owned(&["stand", "p_throws", "pitch_type"]),
            description_column: "description".to_string(),
            plate_z_column: "plate_z".to_string(),
            sz_top_column: "sz_top".to_string(),
            sz_bot_column: "sz_bot".to_string(),
            swing_events: SWING_EVENTS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl FeatureConfig {
    /// Whether `description` is one of the swing outcomes.
    #[must_use]
    pub fn is_swing(&self, description: &str) -> bool {
        self.swing_events.contains(description)
    }

    /// Raw columns a season must carry for this configuration, deduplicated,
    /// in first-use order.
    #[must_use]
    pub fn required_columns(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.numeric
            .iter()
            .filter(|n| n.as_str() != RELATIVE_PITCH_HEIGHT)
            .chain(&self.categorical)
            .chain([
                &self.plate_z_column,
                &self.sz_top_column,
                &self.sz_bot_column,
                &self.description_column,
            ])
            .filter(|&c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }

    /// Swing labels for `rows` of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Io`] when the description column is absent.
    pub fn labels(&self, table: &SeasonTable, rows: &[usize]) -> Result<Vec<bool>, PrepError> {
        let col = table.require_column(&self.description_column)?;
        Ok(rows
            .iter()
            .map(|&row| self.is_swing(table.text(row, col)))
            .collect())
    }

    /// Select the configured features for `rows` of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Io`] when a column is absent or a numeric cell
    /// does not parse.
    #[instrument(skip_all, fields(path = %table.path().display(), n_rows = rows.len()))]
    pub fn extract(&self, table: &SeasonTable, rows: &[usize]) -> Result<FeatureFrame, PrepError> {
        let numeric_sources: Vec<NumericSource> = self
            .numeric
            .iter()
            .map(|name| -> Result<NumericSource, PrepError> {
                if name == RELATIVE_PITCH_HEIGHT {
                    Ok(NumericSource::RelativeHeight {
                        plate_z: table.require_column(&self.plate_z_column)?,
                        sz_top: table.require_column(&self.sz_top_column)?,
                        sz_bot: table.require_column(&self.sz_bot_column)?,
                    })
                } else {
                    Ok(NumericSource::Column(table.require_column(name)?))
                }
            })
            .collect::<Result<_, _>>()?;
        let categorical_cols: Vec<usize> = self
            .categorical
            .iter()
            .map(|name| table.require_column(name))
            .collect::<Result<_, _>>()?;

        let mut numeric = Vec::with_capacity(rows.len());
        let mut categorical = Vec::with_capacity(rows.len());
        for &row in rows {
            let values = numeric_sources
                .iter()
                .map(|source| source.value(table, row))
                .collect::<Result<Vec<f64>, PrepError>>()?;
            numeric.push(values);
            categorical.push(
                categorical_cols
                    .iter()
                    .map(|&col| table.text(row, col).to_string())
                    .collect(),
            );
        }
        debug!(
            n_numeric = self.numeric.len(),
            n_categorical = self.categorical.len(),
            "features extracted"
        );

        Ok(FeatureFrame {
            numeric_names: self.numeric.clone(),
            categorical_names: self.categorical.clone(),
            numeric,
            categorical,
            source_rows: rows.to_vec(),
        })
    }
}

enum NumericSource {
    Column(usize),
    RelativeHeight {
        plate_z: usize,
        sz_top: usize,
        sz_bot: usize,
    },
}

impl NumericSource {
    fn value(&self, table: &SeasonTable, row: usize) -> Result<f64, PrepError> {
        Ok(match *self {
            NumericSource::Column(col) => table.number(row, col)?,
            NumericSource::RelativeHeight {
                plate_z,
                sz_top,
                sz_bot,
            } => relative_pitch_height(
                table.number(row, plate_z)?,
                table.number(row, sz_top)?,
                table.number(row, sz_bot)?,
            ),
        })
    }
}

/// Selected features before encoding: a numeric block and a categorical
/// block, row-aligned, with the table row each came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub(crate) numeric_names: Vec<String>,
    pub(crate) categorical_names: Vec<String>,
    pub(crate) numeric: Vec<Vec<f64>>,
    pub(crate) categorical: Vec<Vec<String>>,
    pub(crate) source_rows: Vec<usize>,
}

impl FeatureFrame {
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.numeric.len()
    }

    #[must_use]
    pub fn numeric_names(&self) -> &[String] {
        &self.numeric_names
    }

    #[must_use]
    pub fn categorical_names(&self) -> &[String] {
        &self.categorical_names
    }

    /// Numeric values, `numeric()[row][feature]`.
    #[must_use]
    pub fn numeric(&self) -> &[Vec<f64>] {
        &self.numeric
    }

    #[must_use]
    pub fn categorical(&self) -> &[Vec<String>] {
        &self.categorical
    }

    /// Table row each frame row was extracted from.
    #[must_use]
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    /// Stack frames with identical layouts, in order.
    ///
    /// Source rows are kept as-is, so they only identify a row together
    /// with the frame it came from.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::NoCompleteRows`] | `frames` is empty |
    /// | [`PrepError::LayoutMismatch`] | column names differ between frames |
    pub fn concat(frames: Vec<FeatureFrame>) -> Result<FeatureFrame, PrepError> {
        let mut frames = frames.into_iter();
        let mut combined = frames.next().ok_or(PrepError::NoCompleteRows)?;
        for frame in frames {
            if frame.numeric_names != combined.numeric_names
                || frame.categorical_names != combined.categorical_names
            {
                return Err(PrepError::LayoutMismatch {
                    expected: combined.column_names(),
                    got: frame.column_names(),
                });
            }
            combined.numeric.extend(frame.numeric);
            combined.categorical.extend(frame.categorical);
            combined.source_rows.extend(frame.source_rows);
        }
        Ok(combined)
    }

    fn column_names(&self) -> Vec<String> {
        self.numeric_names
            .iter()
            .chain(&self.categorical_names)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use swingcast_io::SeasonReader;
    use tempfile::NamedTempFile;

    use super::*;

    fn season(body: &str) -> (NamedTempFile, SeasonTable) {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            "release_speed,plate_x,plate_z,stand,p_throws,pfx_x,pfx_z,balls,strikes,pitch_type,sz_top,sz_bot,description\n{body}"
        )
        .unwrap();
        f.flush().unwrap();
        let table = SeasonReader::new(f.path()).read().unwrap();
        (f, table)
    }

    #[test]
    fn relative_height_formula() {
        assert_eq!(relative_pitch_height(2.5, 3.5, 1.5), 0.5);
        assert_eq!(relative_pitch_height(1.5, 3.5, 1.5), 0.0);
        assert_eq!(relative_pitch_height(4.5, 3.5, 1.5), 1.5);
        assert_eq!(relative_pitch_height(0.5, 3.5, 1.5), -0.5);
    }

    #[test]
    fn relative_height_collapsed_zone() {
        assert_eq!(relative_pitch_height(2.0, 1.5, 1.5), f64::INFINITY);
        assert_eq!(relative_pitch_height(1.0, 1.5, 1.5), f64::NEG_INFINITY);
        assert!(relative_pitch_height(1.5, 1.5, 1.5).is_nan());
    }

    #[test]
    fn swing_label_is_exact_membership() {
        let config = FeatureConfig::default();
        for event in SWING_EVENTS {
            assert!(config.is_swing(event), "{event}");
        }
        for other in ["ball", "called_strike", "blocked_ball", "hit_by_pitch", "Foul", "foul "] {
            assert!(!config.is_swing(other), "{other}");
        }
    }

    #[test]
    fn required_columns_cover_raw_inputs_once() {
        let required = FeatureConfig::default().required_columns();
        assert_eq!(required.len(), 13);
        assert!(!required.iter().any(|c| c == RELATIVE_PITCH_HEIGHT));
        assert_eq!(required.iter().filter(|c| *c == "plate_z").count(), 1);
        assert!(required.iter().any(|c| c == "description"));
    }

    #[test]
    fn extract_derives_height_and_keeps_order() {
        let (_f, table) = season(
            "95.0,0.1,2.5,R,L,-0.5,1.3,0,1,FF,3.5,1.5,foul\n\
             84.0,-0.9,1.0,L,R,0.3,0.2,2,2,SL,3.4,1.4,ball\n",
        );
        let config = FeatureConfig::default();
        let frame = config.extract(&table, &[1, 0]).unwrap();
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.source_rows(), &[1, 0]);
        assert_eq!(frame.numeric()[1], vec![95.0, 0.1, 2.5, -0.5, 1.3, 0.0, 1.0, 0.5]);
        assert_eq!(frame.categorical()[0], vec!["L", "R", "SL"]);
        assert_eq!(config.labels(&table, &[0, 1]).unwrap(), vec![true, false]);
    }

    #[test]
    fn concat_requires_same_layout() {
        let (_f, table) = season("95.0,0.1,2.5,R,L,-0.5,1.3,0,1,FF,3.5,1.5,foul\n");
        let config = FeatureConfig::default();
        let a = config.extract(&table, &[0]).unwrap();
        let b = config.extract(&table, &[0]).unwrap();
        assert_eq!(FeatureFrame::concat(vec![a.clone(), b]).unwrap().n_rows(), 2);

        let narrow = FeatureConfig {
            categorical: vec!["stand".into()],
            ..FeatureConfig::default()
        };
        let c = narrow.extract(&table, &[0]).unwrap();
        assert!(matches!(
            FeatureFrame::concat(vec![a, c]),
            Err(PrepError::LayoutMismatch { .. })
        ));
        assert!(matches!(FeatureFrame::concat(vec![]), Err(PrepError::NoCompleteRows)));
    }
}
