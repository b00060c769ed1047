#![allow(dead_code)]

use ckd_risk::model::{BoosterParams, GradientBoostedClassifier, Node, StandardScaler, Tree};
use ckd_risk::{Artifacts, RawPatientInput, FEATURE_COUNT};

/// Fixed statistics in schema order:
/// GFR, creatinine, ACR, hypertension, diabetes, BMI, age, sex, NSAIDs, edema.
pub const MEAN: [f64; FEATURE_COUNT] = [90.0, 1.0, 30.0, 0.5, 0.5, 25.0, 50.0, 0.5, 2.0, 0.5];
pub const STD: [f64; FEATURE_COUNT] = [30.0, 1.0, 100.0, 0.5, 0.5, 5.0, 15.0, 0.5, 2.0, 0.5];

pub fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
    Tree::new(vec![
        Node::Split {
            feature,
            threshold,
            left: 1,
            right: 2,
        },
        Node::Leaf { value: left },
        Node::Leaf { value: right },
    ])
}

/// Two hand-built trees:
/// 1. standardized GFR < -1 → +0.8, otherwise standardized creatinine < 1.5 → -0.6 else +0.3
/// 2. standardized sex < 0 (male) → -0.2, otherwise (female) → +0.4
pub fn fixture_classifier() -> GradientBoostedClassifier {
    let first = Tree::new(vec![
        Node::Split {
            feature: 0,
            threshold: -1.0,
            left: 1,
            right: 2,
        },
        Node::Leaf { value: 0.8 },
        Node::Split {
            feature: 1,
            threshold: 1.5,
            left: 3,
            right: 4,
        },
        Node::Leaf { value: -0.6 },
        Node::Leaf { value: 0.3 },
    ]);
    let second = stump(7, 0.0, -0.2, 0.4);
    GradientBoostedClassifier::from_trees(BoosterParams::default(), vec![first, second])
}

pub fn fixture_artifacts() -> Artifacts {
    Artifacts::new(StandardScaler::new(MEAN, STD), fixture_classifier()).expect("valid fixture")
}

/// The reference patient used for regression checks.
pub fn reference_patient() -> RawPatientInput {
    RawPatientInput::new()
        .with("gfr", 45.7)
        .with("creatinine", 4.96)
        .with("acr", 123.8)
        .with("hypertension", 0.0)
        .with("diabetes", 1.0)
        .with("bmi", 31.1)
        .with("age", 71u32)
        .with("sex", "Male")
        .with("nsaid_score", 4.56)
        .with("edema", 0.0)
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
