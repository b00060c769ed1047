use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{ArtifactPaths, CLASSIFIER_FILE, SCALER_FILE};

/// Config file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "ckd-risk.toml";

pub const ENV_CONFIG: &str = "CKD_RISK_CONFIG";
pub const ENV_MODELS_DIR: &str = "CKD_RISK_MODELS_DIR";
pub const ENV_DATASET: &str = "CKD_RISK_DATASET";

/// Locations shared by the training job and the scoring front ends.
///
/// Precedence, lowest first: defaults, TOML file, environment, CLI flags
/// (applied by the binaries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub models_dir: PathBuf,
    pub dataset: PathBuf,
    pub scaler_file: String,
    pub classifier_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            dataset: PathBuf::from("data/ckd_dataset.parquet"),
            scaler_file: SCALER_FILE.to_string(),
            classifier_file: CLASSIFIER_FILE.to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings from an explicit file, `$CKD_RISK_CONFIG`, or
    /// `ckd-risk.toml` if present, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env_non_empty(ENV_CONFIG).map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            });

        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed reading config file {}", path.display()))?;
                let settings = Self::from_toml_str(&raw)
                    .with_context(|| format!("failed parsing TOML config {}", path.display()))?;
                log::info!("Using config file {}", path.display());
                settings
            }
            None => Self::default(),
        };
        settings.apply_env_overrides(env_non_empty);
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `CKD_RISK_*` variables, read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_MODELS_DIR) {
            self.models_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DATASET) {
            self.dataset = PathBuf::from(v);
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            scaler: self.models_dir.join(&self.scaler_file),
            classifier: self.models_dir.join(&self.classifier_file),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
