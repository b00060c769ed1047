use anyhow::{bail, Context, Result};

use crate::data::loader::TrainingTable;
use crate::model::booster::{BoosterParams, GradientBoostedClassifier, Row};
use crate::model::{Artifacts, StandardScaler};
use crate::scoring::DECISION_THRESHOLD;

/// Summary of a training run, measured on the training rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub samples: usize,
    pub positives: usize,
    pub accuracy: f64,
    pub log_loss: f64,
}

/// Fit the scaler, standardize every row, then fit the classifier.
///
/// No balancing, cross-validation or tuning: `params` is used as given.
pub fn train(table: &TrainingTable, params: &BoosterParams) -> Result<(Artifacts, TrainingReport)> {
    if table.is_empty() {
        bail!("training table has no rows");
    }
    if table.labels.len() != table.rows.len() {
        bail!(
            "training table has {} rows but {} labels",
            table.rows.len(),
            table.labels.len()
        );
    }

    let scaler = StandardScaler::fit(&table.rows).context("fitting scaler")?;
    let scaled: Vec<Row> = table.rows.iter().map(|r| scaler.transform(r)).collect();

    log::info!(
        "Fitting {} trees (max depth {}, learning rate {}) on {} patients",
        params.n_estimators,
        params.max_depth,
        params.learning_rate,
        table.len()
    );
    let classifier =
        GradientBoostedClassifier::fit(&scaled, &table.labels, params).context("fitting classifier")?;

    let report = evaluate(&classifier, &scaled, &table.labels);
    let artifacts = Artifacts::new(scaler, classifier).context("validating fitted artifacts")?;
    Ok((artifacts, report))
}

fn evaluate(classifier: &GradientBoostedClassifier, x: &[Row], y: &[f64]) -> TrainingReport {
    const EPS: f64 = 1e-15;

    let mut correct = 0usize;
    let mut loss = 0.0;
    for (row, &label) in x.iter().zip(y) {
        let p = classifier.predict_proba(row);
        let predicted = if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 };
        if predicted == label {
            correct += 1;
        }
        let p = p.clamp(EPS, 1.0 - EPS);
        loss -= label * p.ln() + (1.0 - label) * (1.0 - p).ln();
    }

    let n = x.len() as f64;
    TrainingReport {
        samples: x.len(),
        positives: y.iter().filter(|&&v| v == 1.0).count(),
        accuracy: correct as f64 / n,
        log_loss: loss / n,
    }
}
