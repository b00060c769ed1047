use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of features the scaler and classifier are trained on.
pub const FEATURE_COUNT: usize = 10;

/// Identifier column of the training table; never a feature.
pub const ID_COLUMN: &str = "PatientID";

/// Binary target column of the training table.
pub const LABEL_COLUMN: &str = "Diagnosis (0/1)";

// ---------------------------------------------------------------------------
// Feature – one column of the frozen feature schema
// ---------------------------------------------------------------------------

/// How a raw value is turned into the number the model sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Passed through unchanged.
    Numeric,
    /// "Yes" → 1, "No" → 0.
    YesNo,
    /// See [`Sex::code`].
    Sex,
}

/// The 10 model inputs. Declaration order is the training column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Gfr,
    Creatinine,
    Acr,
    Hypertension,
    Diabetes,
    Bmi,
    Age,
    Sex,
    NsaidScore,
    Edema,
}

impl Feature {
    /// Every feature, in schema order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Gfr,
        Feature::Creatinine,
        Feature::Acr,
        Feature::Hypertension,
        Feature::Diabetes,
        Feature::Bmi,
        Feature::Age,
        Feature::Sex,
        Feature::NsaidScore,
        Feature::Edema,
    ];

    /// Position in the feature vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name in the training table and in the stored artifacts.
    pub fn column_name(self) -> &'static str {
        match self {
            Feature::Gfr => "GFR (mL/min)",
            Feature::Creatinine => "Creatinine (mg/dL)",
            Feature::Acr => "ACR (mg/g)",
            Feature::Hypertension => "Hypertension (0/1)",
            Feature::Diabetes => "Diabetes (0/1)",
            Feature::Bmi => "BMI (kg/m2)",
            Feature::Age => "Age",
            Feature::Sex => "Sex (0=M, 1=F)",
            Feature::NsaidScore => "NSAIDs (score)",
            Feature::Edema => "Edema (0/1)",
        }
    }

    /// Key of this field in a [`RawPatientInput`](super::features::RawPatientInput).
    pub fn input_key(self) -> &'static str {
        match self {
            Feature::Gfr => "gfr",
            Feature::Creatinine => "creatinine",
            Feature::Acr => "acr",
            Feature::Hypertension => "hypertension",
            Feature::Diabetes => "diabetes",
            Feature::Bmi => "bmi",
            Feature::Age => "age",
            Feature::Sex => "sex",
            Feature::NsaidScore => "nsaid_score",
            Feature::Edema => "edema",
        }
    }

    /// Label shown next to the form widget.
    pub fn display_label(self) -> &'static str {
        match self {
            Feature::Gfr => "GFR (mL/min/1.73m²)",
            Feature::Creatinine => "Creatinine (mg/dL)",
            Feature::Acr => "ACR (mg/g)",
            Feature::Hypertension => "Hypertension",
            Feature::Diabetes => "Diabetes",
            Feature::Bmi => "BMI (kg/m²)",
            Feature::Age => "Age",
            Feature::Sex => "Sex",
            Feature::NsaidScore => "NSAID usage score (0-9.9)",
            Feature::Edema => "Visible edema",
        }
    }

    pub fn kind(self) -> FeatureKind {
        match self {
            Feature::Hypertension | Feature::Diabetes | Feature::Edema => FeatureKind::YesNo,
            Feature::Sex => FeatureKind::Sex,
            _ => FeatureKind::Numeric,
        }
    }

    /// Inclusive range of accepted encoded values.
    pub fn accepted_range(self) -> RangeInclusive<f64> {
        match self {
            Feature::Gfr => 0.0..=200.0,
            Feature::Creatinine => 0.1..=20.0,
            Feature::Acr => 0.0..=5000.0,
            Feature::Bmi => 10.0..=50.0,
            Feature::Age => 18.0..=120.0,
            Feature::NsaidScore => 0.0..=9.9,
            Feature::Hypertension
            | Feature::Diabetes
            | Feature::Sex
            | Feature::Edema => 0.0..=1.0,
        }
    }

    /// Look up a feature by its raw input key (trimmed, case-insensitive).
    pub fn from_input_key(key: &str) -> Option<Feature> {
        let key = normalize_key(key);
        Feature::ALL.into_iter().find(|f| f.input_key() == key)
    }

    /// Look up a feature by its training column name (exact match).
    pub fn from_column_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.column_name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input_key())
    }
}

/// Column names in schema order, as stored in both artifacts.
pub fn feature_names() -> Vec<String> {
    Feature::ALL
        .iter()
        .map(|f| f.column_name().to_string())
        .collect()
}

/// Canonical form of a raw input key.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Sex – frozen categorical encoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl Sex {
    /// Model encoding: Female → 1, Male → 0. Part of the trained contract.
    pub fn code(self) -> f64 {
        match self {
            Sex::Male => 0.0,
            Sex::Female => 1.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Sex> {
        if code == 0.0 {
            Some(Sex::Male)
        } else if code == 1.0 {
            Some(Sex::Female)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(()),
        }
    }
}

/// Parse a "Yes"/"No" answer (case-insensitive).
pub fn parse_yes_no(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}
