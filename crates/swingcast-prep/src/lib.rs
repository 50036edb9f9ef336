//! Data preparation for swing modelling: dropping incomplete rows, swing
//! labels and derived features, k-1 one-hot encoding with alignment to the
//! training columns, and variance inflation diagnostics.

mod clean;
mod encode;
mod error;
mod features;
mod vif;

pub use clean::{ScoringFrame, clean_training};
pub use encode::{EncodedFrame, one_hot, one_hot_all_levels};
pub use error::PrepError;
pub use features::{
    FeatureConfig, FeatureFrame, RELATIVE_PITCH_HEIGHT, SWING_EVENTS, relative_pitch_height,
};
pub use vif::{INTERCEPT, VifEntry, VifTable, variance_inflation};
