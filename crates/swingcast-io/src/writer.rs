//! Writers for the scored season CSV and JSON result artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{ExperimentName, SeasonTable};
use crate::IoError;

/// Name of the probability column appended to the scored season.
pub const SCORE_COLUMN: &str = "SwingProbability";

/// Writes run outputs into one directory, named after the experiment.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are `{experiment}_model.bin`, `{experiment}_scored.csv`
/// and `{experiment}_evaluate.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    /// Path where the model binary should be saved.
    ///
    /// Does not write anything.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_path("model.bin")
    }

    #[must_use]
    pub fn scored_path(&self) -> PathBuf {
        self.artifact_path("scored.csv")
    }

    #[must_use]
    pub fn evaluation_path(&self) -> PathBuf {
        self.artifact_path("evaluate.json")
    }

    /// Write every row of `table` with its score appended as
    /// `SwingProbability`, to `{experiment}_scored.csv`.
    ///
    /// Original cells are written back verbatim, in the original column
    /// order. Returns the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ScoreCountMismatch`] | `scores.len()` differs from the row count |
    /// | [`IoError::WriteCsv`] | the file cannot be created or written |
    #[instrument(skip_all, fields(n_rows = table.n_rows()))]
    pub fn write_scored(&self, table: &SeasonTable, scores: &[f64]) -> Result<PathBuf, IoError> {
        if scores.len() != table.n_rows() {
            return Err(IoError::ScoreCountMismatch {
                rows: table.n_rows(),
                scores: scores.len(),
            });
        }
        let path = self.scored_path();
        let csv_error = |e: csv::Error| IoError::WriteCsv {
            path: path.clone(),
            source: e,
        };

        let mut wtr = csv::Writer::from_path(&path).map_err(csv_error)?;
        wtr.write_record(
            table
                .headers()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(SCORE_COLUMN)),
        )
        .map_err(csv_error)?;
        for (row, score) in table.rows().iter().zip(scores) {
            let score = score.to_string();
            wtr.write_record(row.iter().map(String::as_str).chain(std::iter::once(score.as_str())))
                .map_err(csv_error)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "scored season written");
        Ok(path)
    }

    /// Write an evaluation artifact to `{experiment}_evaluate.json`.
    ///
    /// The writer has no dependency on the model crate: any serializable
    /// value is wrapped with the experiment name and written pretty-printed.
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | the value cannot be encoded |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all)]
    pub fn write_evaluation<T: Serialize>(&self, evaluation: &T) -> Result<PathBuf, IoError> {
        let path = self.evaluation_path();
        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            evaluation,
        };
        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::SerializeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "evaluation result written");
        Ok(path)
    }
}

#[derive(Serialize)]
struct EvaluateArtifact<'a, T: Serialize> {
    experiment: &'a str,
    #[serde(flatten)]
    evaluation: &'a T,
}
