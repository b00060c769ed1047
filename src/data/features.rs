use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::schema::{normalize_key, parse_yes_no, Feature, FeatureKind, Sex, FEATURE_COUNT};
use crate::error::ScoringError;

// ---------------------------------------------------------------------------
// RawValue – one field as typed by the user
// ---------------------------------------------------------------------------

/// A raw form or JSON value before encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Number(v) => write!(f, "{v}"),
            RawValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        RawValue::Number(v as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<Sex> for RawValue {
    fn from(s: Sex) -> Self {
        RawValue::Text(s.as_str().to_string())
    }
}

// ---------------------------------------------------------------------------
// RawPatientInput – human-readable keys → raw values
// ---------------------------------------------------------------------------

/// One patient's raw clinical values, keyed by [`Feature::input_key`].
///
/// Keys are normalized (trimmed, lowercased) so `"GFR"` and `"gfr"` address
/// the same field. [`insert`](Self::insert) replaces an existing value, but a
/// key that appears twice in collected or deserialized input is remembered
/// and rejected by [`build_feature_vector`]. JSON `null` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(into = "BTreeMap<String, RawValue>")]
pub struct RawPatientInput {
    fields: BTreeMap<String, RawValue>,
    duplicates: Vec<String>,
}

impl RawPatientInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<RawValue>) {
        self.fields.insert(normalize_key(key), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<RawValue> {
        self.fields.remove(&normalize_key(key))
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Normalized keys that were supplied more than once.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Insert from an external source. `None` marks the key as seen
    /// without giving it a value.
    fn insert_unique(&mut self, seen: &mut BTreeSet<String>, key: &str, value: Option<RawValue>) {
        let key = normalize_key(key);
        if !seen.insert(key.clone()) {
            if !self.duplicates.contains(&key) {
                self.duplicates.push(key);
            }
            return;
        }
        if let Some(value) = value {
            self.fields.insert(key, value);
        }
    }
}

impl From<BTreeMap<String, RawValue>> for RawPatientInput {
    fn from(map: BTreeMap<String, RawValue>) -> Self {
        map.into_iter().collect()
    }
}

impl From<RawPatientInput> for BTreeMap<String, RawValue> {
    fn from(input: RawPatientInput) -> Self {
        input.fields
    }
}

impl FromIterator<(String, RawValue)> for RawPatientInput {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        let mut input = RawPatientInput::new();
        let mut seen = BTreeSet::new();
        for (k, v) in iter {
            input.insert_unique(&mut seen, &k, Some(v));
        }
        input
    }
}

/// Reads the map entry by entry so repeated keys are not collapsed by an
/// intermediate map.
impl<'de> Deserialize<'de> for RawPatientInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InputVisitor;

        impl<'de> Visitor<'de> for InputVisitor {
            type Value = RawPatientInput;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a flat object of patient fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut input = RawPatientInput::new();
                let mut seen = BTreeSet::new();
                while let Some((key, value)) = map.next_entry::<String, Option<RawValue>>()? {
                    input.insert_unique(&mut seen, &key, value);
                }
                Ok(input)
            }
        }

        deserializer.deserialize_map(InputVisitor)
    }
}

// ---------------------------------------------------------------------------
// FeatureVector – encoded model input in schema order
// ---------------------------------------------------------------------------

/// The 10 encoded features, positioned by [`Feature::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Wrap values that are already in schema order (e.g. a training row).
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |&f| (f, self.values[f.index()]))
    }
}

/// Serialized as a map of training column names, in schema order.
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.column_name(), &value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// Encode a raw input into the feature vector the model was trained on.
///
/// All 10 keys must be present exactly once and no other key may appear;
/// nothing is ever defaulted. Encoding rules:
/// * yes/no fields: "Yes" → 1, "No" → 0 (also `true`/`false` and 0/1)
/// * sex: "Female" → 1, "Male" → 0 (also 1/0)
/// * numeric fields: passed through unchanged
pub fn build_feature_vector(raw: &RawPatientInput) -> Result<FeatureVector, ScoringError> {
    let missing: Vec<String> = Feature::ALL
        .iter()
        .filter(|f| raw.get(f.input_key()).is_none())
        .map(|f| f.input_key().to_string())
        .collect();
    let unexpected: Vec<String> = raw
        .iter()
        .filter(|(key, _)| Feature::from_input_key(key).is_none())
        .map(|(key, _)| key.to_string())
        .collect();

    let duplicate = raw.duplicates().to_vec();

    if !missing.is_empty() || !unexpected.is_empty() || !duplicate.is_empty() {
        return Err(ScoringError::SchemaMismatch {
            missing,
            unexpected,
            duplicate,
        });
    }

    let mut values = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        // Presence checked above.
        if let Some(value) = raw.get(feature.input_key()) {
            values[feature.index()] = encode(feature, value)?;
        }
    }
    Ok(FeatureVector { values })
}

/// Reject non-finite values and values outside [`Feature::accepted_range`].
pub fn check_ranges(features: &FeatureVector) -> Result<(), ScoringError> {
    for (feature, value) in features.iter() {
        let range = feature.accepted_range();
        if !value.is_finite() || !range.contains(&value) {
            return Err(ScoringError::OutOfRange {
                field: feature.input_key(),
                value,
                min: *range.start(),
                max: *range.end(),
            });
        }
    }
    Ok(())
}

fn encode(feature: Feature, value: &RawValue) -> Result<f64, ScoringError> {
    let invalid = |expected: &'static str| ScoringError::InvalidValue {
        field: feature.input_key(),
        value: value.to_string(),
        expected,
    };

    match feature.kind() {
        FeatureKind::Numeric => match value {
            RawValue::Number(v) => Ok(*v),
            RawValue::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid("number")),
            RawValue::Bool(_) => Err(invalid("number")),
        },
        FeatureKind::YesNo => match value {
            RawValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            RawValue::Number(v) if *v == 0.0 || *v == 1.0 => Ok(*v),
            RawValue::Text(s) => parse_yes_no(s)
                .map(|b| if b { 1.0 } else { 0.0 })
                .ok_or_else(|| invalid("Yes/No answer")),
            RawValue::Number(_) => Err(invalid("Yes/No answer")),
        },
        FeatureKind::Sex => match value {
            RawValue::Text(s) => s
                .parse::<Sex>()
                .map(Sex::code)
                .map_err(|_| invalid("sex (Male/Female)")),
            RawValue::Number(v) => Sex::from_code(*v)
                .map(Sex::code)
                .ok_or_else(|| invalid("sex (Male/Female)")),
            RawValue::Bool(_) => Err(invalid("sex (Male/Female)")),
        },
    }
}
