//! Chronic kidney disease (CKD) risk scoring.
//!
//! The crate is split into a training side and a scoring side that only meet
//! through the two artifacts written to the models directory:
//!
//! ```text
//!   patient table ──► data::loader ──► training::train ──► model::Artifacts::save
//!                                                                 │
//!                                                     scaler.json + classifier.json
//!                                                                 │
//!   RawPatientInput ──► scoring::predict(&Artifacts, ..) ◄── model::Artifacts::load
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod scoring;
pub mod training;

pub use data::features::{build_feature_vector, check_ranges, FeatureVector, RawPatientInput, RawValue};
pub use data::schema::{Feature, FeatureKind, Sex, FEATURE_COUNT};
pub use error::{ArtifactError, ArtifactKind, ScoringError};
pub use model::{ArtifactPaths, Artifacts};
pub use scoring::{predict, score, PredictionResult, Recommendation, ScoredPatient, DECISION_THRESHOLD};
