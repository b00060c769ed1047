//! Fitted model pieces and their on-disk form.
//!
//! - [`scaler`]: per-feature standardization
//! - [`booster`]: gradient-boosted regression trees with a logistic link
//! - [`artifacts`]: the validated scaler + classifier pair shared by every scoring call

pub mod artifacts;
pub mod booster;
pub mod scaler;

pub use artifacts::{ArtifactPaths, Artifacts, CLASSIFIER_FILE, SCALER_FILE};
pub use booster::{BoosterParams, GradientBoostedClassifier, Node, Tree};
pub use scaler::StandardScaler;
