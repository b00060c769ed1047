use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Artifact errors (fatal at startup)
// ---------------------------------------------------------------------------

/// Which of the two persisted artifacts an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Scaler,
    Classifier,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Scaler => write!(f, "scaler"),
            ArtifactKind::Classifier => write!(f, "classifier"),
        }
    }
}

/// Failure to obtain a usable artifact pair. The service must not start.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The file is absent or could not be read.
    #[error("cannot read {kind} artifact at {}: {source}", path.display())]
    Load {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its content is unusable.
    #[error("{kind} artifact at {location} is corrupt: {reason}")]
    Corrupt {
        kind: ArtifactKind,
        location: String,
        reason: String,
    },
}

impl ArtifactError {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactError::Load { kind, .. } | ArtifactError::Corrupt { kind, .. } => *kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring errors (recoverable, per request)
// ---------------------------------------------------------------------------

/// A rejected scoring request. The loaded artifacts stay usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("{}", schema_mismatch_message(missing, unexpected, duplicate))]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
        /// Fields supplied more than once, after key normalization.
        duplicate: Vec<String>,
    },

    #[error("{field}: '{value}' is not a valid {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{field}: {value} is outside the accepted range {min} to {max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ScoringError {
    /// Names of the input fields the caller has to fix.
    pub fn fields(&self) -> Vec<String> {
        match self {
            ScoringError::SchemaMismatch {
                missing,
                unexpected,
                duplicate,
            } => missing
                .iter()
                .chain(unexpected)
                .chain(duplicate)
                .cloned()
                .collect(),
            ScoringError::InvalidValue { field, .. } | ScoringError::OutOfRange { field, .. } => {
                vec![field.to_string()]
            }
        }
    }
}

fn schema_mismatch_message(missing: &[String], unexpected: &[String], duplicate: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required fields: {}", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        parts.push(format!("unknown fields: {}", unexpected.join(", ")));
    }
    if !duplicate.is_empty() {
        parts.push(format!("fields given more than once: {}", duplicate.join(", ")));
    }
    if parts.is_empty() {
        return "input does not match the feature schema".to_string();
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_lists_every_field() {
        let err = ScoringError::SchemaMismatch {
            missing: vec!["gfr".into(), "sex".into()],
            unexpected: vec!["weight".into()],
            duplicate: vec![],
        };
        assert_eq!(
            err.to_string(),
            "missing required fields: gfr, sex; unknown fields: weight"
        );
        assert_eq!(err.fields(), vec!["gfr", "sex", "weight"]);

        let err = ScoringError::SchemaMismatch {
            missing: vec![],
            unexpected: vec![],
            duplicate: vec!["gfr".into()],
        };
        assert_eq!(err.to_string(), "fields given more than once: gfr");
    }

    #[test]
    fn load_error_names_the_path() {
        let err = ArtifactError::Load {
            kind: ArtifactKind::Scaler,
            path: PathBuf::from("models/scaler.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("scaler"));
        assert!(msg.contains("models/scaler.json"));
        assert_eq!(err.kind(), ArtifactKind::Scaler);
    }
}
