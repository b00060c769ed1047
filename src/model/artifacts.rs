use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::booster::GradientBoostedClassifier;
use super::scaler::StandardScaler;
use crate::error::{ArtifactError, ArtifactKind};

pub const SCALER_FILE: &str = "scaler.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";

/// Where the two artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    /// Conventional file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            scaler: dir.join(SCALER_FILE),
            classifier: dir.join(CLASSIFIER_FILE),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts – immutable scaler + classifier handle
// ---------------------------------------------------------------------------

/// A scaler and a classifier that were checked against the feature schema.
///
/// Only constructed through [`Artifacts::new`] or [`Artifacts::load`], so every
/// instance satisfies the validation rules and scoring never has to re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    scaler: StandardScaler,
    classifier: GradientBoostedClassifier,
}

impl Artifacts {
    /// Validate an in-memory pair.
    pub fn new(
        scaler: StandardScaler,
        classifier: GradientBoostedClassifier,
    ) -> Result<Self, ArtifactError> {
        Self::checked(scaler, classifier, "in-memory", "in-memory")
    }

    /// Read and validate both files. Called once at startup.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let scaler: StandardScaler = read_json(ArtifactKind::Scaler, &paths.scaler)?;
        let classifier: GradientBoostedClassifier =
            read_json(ArtifactKind::Classifier, &paths.classifier)?;

        let artifacts = Self::checked(
            scaler,
            classifier,
            &paths.scaler.display().to_string(),
            &paths.classifier.display().to_string(),
        )?;
        log::info!(
            "Loaded scaler from {} and classifier ({} trees) from {}",
            paths.scaler.display(),
            artifacts.classifier.trees().len(),
            paths.classifier.display()
        );
        Ok(artifacts)
    }

    fn checked(
        scaler: StandardScaler,
        classifier: GradientBoostedClassifier,
        scaler_location: &str,
        classifier_location: &str,
    ) -> Result<Self, ArtifactError> {
        scaler.validate().map_err(|reason| ArtifactError::Corrupt {
            kind: ArtifactKind::Scaler,
            location: scaler_location.to_string(),
            reason,
        })?;
        classifier.validate().map_err(|reason| ArtifactError::Corrupt {
            kind: ArtifactKind::Classifier,
            location: classifier_location.to_string(),
            reason,
        })?;
        Ok(Self { scaler, classifier })
    }

    /// Write both artifacts as pretty JSON, creating the directory if needed.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        write_json(&paths.scaler, &self.scaler)?;
        write_json(&paths.classifier, &self.classifier)?;
        log::info!(
            "Saved artifacts to {} and {}",
            paths.scaler.display(),
            paths.classifier.display()
        );
        Ok(())
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &GradientBoostedClassifier {
        &self.classifier
    }
}

fn read_json<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T, ArtifactError> {
    let text = std::fs::read_to_string(path).map_err(|source| ArtifactError::Load {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| ArtifactError::Corrupt {
        kind,
        location: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }
    let text = serde_json::to_string_pretty(value).context("serializing artifact")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
