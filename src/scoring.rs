use serde::Serialize;

use crate::data::features::{build_feature_vector, check_ranges, FeatureVector, RawPatientInput};
use crate::data::schema::FEATURE_COUNT;
use crate::error::ScoringError;
use crate::model::Artifacts;

/// Probability at or above which a patient is labeled high risk.
pub const DECISION_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// `label` is derived from `probability`, never computed separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: u8,
    pub probability: f64,
}

impl PredictionResult {
    pub fn from_probability(probability: f64) -> Self {
        let label = if probability >= DECISION_THRESHOLD { 1 } else { 0 };
        Self { label, probability }
    }

    pub fn is_high_risk(&self) -> bool {
        self.label == 1
    }

    /// Probability of the predicted class, as displayed to the clinician.
    pub fn confidence(&self) -> f64 {
        if self.is_high_risk() {
            self.probability
        } else {
            1.0 - self.probability
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        if self.is_high_risk() {
            Recommendation {
                headline: format!("High CKD risk ({:.1}% probability)", self.confidence() * 100.0),
                actions: &[
                    "Urgent nephrology consultation",
                    "Complete renal work-up",
                    "Close blood-pressure monitoring",
                ],
            }
        } else {
            Recommendation {
                headline: format!("Low CKD risk ({:.1}% probability)", self.confidence() * 100.0),
                actions: &[
                    "Annual monitoring of renal function",
                    "Maintain adequate hydration",
                    "Avoid NSAID self-medication",
                ],
            }
        }
    }
}

/// Human-readable advice keyed by the predicted label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub headline: String,
    pub actions: &'static [&'static str],
}

/// A prediction together with the intermediate vectors that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPatient {
    pub features: FeatureVector,
    pub standardized: [f64; FEATURE_COUNT],
    pub result: PredictionResult,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score one patient. Pure: depends only on `raw` and `artifacts`.
pub fn predict(artifacts: &Artifacts, raw: &RawPatientInput) -> Result<PredictionResult, ScoringError> {
    score(artifacts, raw).map(|scored| scored.result)
}

/// Like [`predict`], keeping the encoded and standardized features.
pub fn score(artifacts: &Artifacts, raw: &RawPatientInput) -> Result<ScoredPatient, ScoringError> {
    let features = build_feature_vector(raw)?;
    check_ranges(&features)?;

    let standardized = artifacts.scaler().transform(&features);
    let probability = artifacts.classifier().predict_proba(&standardized);
    let result = PredictionResult::from_probability(probability);
    log::debug!(
        "scored patient: label={} probability={:.4}",
        result.label,
        result.probability
    );

    Ok(ScoredPatient {
        features,
        standardized,
        result,
    })
}
