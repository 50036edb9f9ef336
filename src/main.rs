use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use swingcast_io::{ExperimentName, ResultWriter, SeasonReader, SeasonTable};
use swingcast_prep::{
    FeatureConfig, FeatureFrame, PrepError, ScoringFrame, VifEntry, VifTable, clean_training,
    one_hot, one_hot_all_levels, variance_inflation,
};
use swingcast_rf::{
    CandidateScore, ClassificationReport, ConfusionMatrix, GridSearchCv, HoldoutSplit,
    Hyperparameters, ImportanceChart, ParamGrid, RandomForest, RandomForestConfig, RankedFeature,
    RocPoint, accuracy, roc_curve, select_rows,
};

#[derive(Parser)]
#[command(name = "swingcast")]
#[command(about = "Swing / no-swing classification from pitch-tracking data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Train, tune and evaluate a swing model, then score a held-out season
    Train {
        /// Training season CSV (repeat for each season)
        #[arg(long = "train", required = true)]
        train: Vec<PathBuf>,

        /// Season CSV to score with the selected model
        #[arg(long)]
        score: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Candidate tree counts for the grid search
        #[arg(long, value_delimiter = ',', default_values_t = [50, 100, 200, 300])]
        n_estimators: Vec<usize>,

        /// Candidate maximum tree depths for the grid search
        #[arg(long, value_delimiter = ',', default_values_t = [10, 15, 20, 25, 30])]
        max_depth: Vec<usize>,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        cv_folds: usize,

        /// Fraction of training rows held out for validation
        #[arg(long, default_value_t = 0.2)]
        validation_fraction: f64,

        /// Swing probability given to rows the model cannot score
        #[arg(long, default_value_t = 0.5, value_parser = parse_probability)]
        default_score: f64,
    },

    /// Score a season with a saved model
    Score {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Season CSV to score
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Swing probability given to rows the model cannot score
        #[arg(long, default_value_t = 0.5, value_parser = parse_probability)]
        default_score: f64,
    },
}

/// Parse a probability in `[0, 1]`.
fn parse_probability(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside [0, 1]"))
    }
}

// --- JSON output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_cleaned_rows: usize,
    n_features: usize,
    best_params: Hyperparameters,
    cv_mean_auc: f64,
    validation_roc_auc: f64,
    validation_accuracy: f64,
    n_scored_rows: usize,
    n_model_scored: usize,
    model_path: PathBuf,
    scored_path: PathBuf,
    evaluation_path: PathBuf,
}

#[derive(Serialize)]
struct ScoreOutput {
    experiment: String,
    model_params: Hyperparameters,
    model_n_features: usize,
    n_scored_rows: usize,
    n_model_scored: usize,
    scored_path: PathBuf,
}

#[derive(Serialize)]
struct Evaluation<'a> {
    n_training_rows: usize,
    n_validation_rows: usize,
    feature_columns: &'a [String],
    best_params: Hyperparameters,
    grid: &'a [CandidateScore],
    roc_auc: f64,
    accuracy: f64,
    confusion_matrix: [[usize; 2]; 2],
    classification_report: &'a ClassificationReport,
    roc_curve: &'a [RocPoint],
    feature_importances: &'a [RankedFeature],
    vif: &'a [VifEntry],
}

/// Training seasons cleaned, labelled and stacked.
struct TrainingData {
    frame: FeatureFrame,
    labels: Vec<bool>,
}

/// A season with one score per row.
struct ScoredSeason {
    table: SeasonTable,
    scores: Vec<f64>,
    n_model_scored: usize,
}

fn read_season(path: &Path, features: &FeatureConfig) -> Result<SeasonTable> {
    SeasonReader::new(path)
        .with_required_columns(features.required_columns())
        .read()
        .with_context(|| format!("failed to read season CSV {}", path.display()))
}

fn load_training(paths: &[PathBuf], features: &FeatureConfig) -> Result<TrainingData> {
    let mut frames = Vec::with_capacity(paths.len());
    let mut labels = Vec::new();
    for path in paths {
        let table = read_season(path, features)?;
        let rows = clean_training(&table);
        labels.extend(features.labels(&table, &rows)?);
        frames.push(features.extract(&table, &rows)?);
    }
    let frame = FeatureFrame::concat(frames)?;
    if frame.n_rows() == 0 {
        return Err(PrepError::NoCompleteRows.into());
    }
    info!(
        n_rows = frame.n_rows(),
        n_swings = labels.iter().filter(|&&l| l).count(),
        "training seasons prepared"
    );
    Ok(TrainingData { frame, labels })
}

/// Run the scoring half of the pipeline: every row starts at
/// `default_score`, complete rows with finite features get the model's
/// probability.
fn score_season(
    forest: &RandomForest,
    path: &Path,
    features: &FeatureConfig,
    default_score: f64,
) -> Result<ScoredSeason> {
    let table = read_season(path, features)?;
    let (scores, n_model_scored) = {
        let frame = ScoringFrame::new(&table, default_score);
        let extracted = features.extract(&table, frame.complete_rows())?;
        let aligned = one_hot_all_levels(&extracted).reindex(forest.feature_names());
        let finite = aligned.finite_only();
        let degenerate = aligned.n_rows() - finite.n_rows();
        if degenerate > 0 {
            warn!(degenerate, "rows with non-finite features keep the default score");
        }
        let probabilities = forest
            .predict_proba_batch(finite.rows())
            .context("prediction failed")?;
        let scores = frame.merge(finite.source_rows(), &probabilities)?;
        (scores, finite.n_rows())
    };
    info!(n_rows = table.n_rows(), n_model_scored, "season scored");
    Ok(ScoredSeason {
        table,
        scores,
        n_model_scored,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let features = FeatureConfig::default();

    match cli.command {
        Command::Train {
            train,
            score,
            experiment,
            output_dir,
            n_estimators,
            max_depth,
            cv_folds,
            validation_fraction,
            default_score,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let grid = ParamGrid::new(n_estimators, max_depth.into_iter().map(Some).collect())?;
            let cv = GridSearchCv::new(cv_folds)?.with_seed(cli.seed);
            let writer = ResultWriter::new(&output_dir, experiment_name)?;

            // 1. Load, clean, label and encode the training seasons
            let training = load_training(&train, &features)?;
            let encoded = one_hot(&training.frame);
            encoded
                .ensure_finite()
                .context("training features must be finite")?;
            let feature_columns = encoded.columns().to_vec();
            info!(n_features = feature_columns.len(), "training matrix encoded");

            // 2. Multicollinearity diagnostic
            let vif = variance_inflation(&encoded)?;
            if !cli.quiet {
                eprint!("{}", VifTable(&vif));
            }

            // 3. Hold out a validation split
            let split = HoldoutSplit::new(encoded.n_rows(), validation_fraction, cli.seed)?;
            let rows = encoded.into_rows();
            let train_x = select_rows(&rows, &split.train_indices);
            let train_y = select_rows(&training.labels, &split.train_indices);
            let valid_x = select_rows(&rows, &split.test_indices);
            let valid_y = select_rows(&training.labels, &split.test_indices);
            info!(
                n_train = train_x.len(),
                n_validation = valid_x.len(),
                "holdout split"
            );

            // 4. Grid search, refit best on the training split
            let base = RandomForestConfig::new(1)?.with_seed(cli.seed);
            let search = cv
                .fit(&base, &grid, &train_x, &train_y, &feature_columns)
                .context("grid search failed")?;
            let best = search.best_candidate().clone();
            info!(
                params = %best.params,
                cv_mean_auc = best.mean_auc,
                "model selected"
            );

            // 5. Evaluate on the validation split
            let forest = search.best().forest();
            let valid_scores = forest
                .predict_proba_batch(&valid_x)
                .context("validation prediction failed")?;
            let valid_pred = forest
                .predict_batch(&valid_x)
                .context("validation prediction failed")?;
            let roc = roc_curve(&valid_y, &valid_scores).context("validation ROC failed")?;
            let roc_auc = roc.auc();
            let valid_accuracy = accuracy(&valid_y, &valid_pred)?;
            let confusion = ConfusionMatrix::from_labels(&valid_y, &valid_pred)?;
            let report = confusion.report();
            info!(roc_auc, accuracy = valid_accuracy, "validation complete");
            if !cli.quiet {
                eprintln!("{confusion}\n{report}");
                eprint!("{}", ImportanceChart::new(search.best().importances(), 40));
            }

            // 6. Save the model
            let model_path = writer.model_path();
            forest.save(&model_path).context("failed to save model")?;

            // 7. Score the held-out season
            let scored = score_season(forest, &score, &features, default_score)?;
            let scored_path = writer.write_scored(&scored.table, &scored.scores)?;

            // 8. Write evaluation JSON
            let evaluation_path = writer.write_evaluation(&Evaluation {
                n_training_rows: train_x.len(),
                n_validation_rows: valid_x.len(),
                feature_columns: &feature_columns,
                best_params: best.params,
                grid: search.candidates(),
                roc_auc,
                accuracy: valid_accuracy,
                confusion_matrix: confusion.as_rows(),
                classification_report: &report,
                roc_curve: &roc.points,
                feature_importances: search.best().importances(),
                vif: &vif,
            })?;

            // 9. Print summary
            let output = TrainOutput {
                experiment,
                n_cleaned_rows: rows.len(),
                n_features: feature_columns.len(),
                best_params: best.params,
                cv_mean_auc: best.mean_auc,
                validation_roc_auc: roc_auc,
                validation_accuracy: valid_accuracy,
                n_scored_rows: scored.table.n_rows(),
                n_model_scored: scored.n_model_scored,
                model_path,
                scored_path,
                evaluation_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Score {
            model,
            data,
            experiment,
            output_dir,
            default_score,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let forest = RandomForest::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trees(),
                n_features = forest.n_features(),
                params = %forest.hyperparameters(),
                "model loaded"
            );

            // 2. Score and write
            let scored = score_season(&forest, &data, &features, default_score)?;
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let scored_path = writer.write_scored(&scored.table, &scored.scores)?;

            // 3. Print summary
            let output = ScoreOutput {
                experiment,
                model_params: forest.hyperparameters(),
                model_n_features: forest.n_features(),
                n_scored_rows: scored.table.n_rows(),
                n_model_scored: scored.n_model_scored,
                scored_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
