//! File I/O for the swingcast pipeline: season CSV loading with schema
//! validation, and writing of scored seasons and evaluation artifacts.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, MISSING_TOKENS, REQUIRED_COLUMNS, SeasonTable, is_missing};
pub use error::IoError;
pub use reader::SeasonReader;
pub use writer::{ResultWriter, SCORE_COLUMN};
