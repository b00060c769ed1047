use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::features::FeatureVector;
use crate::data::schema::{feature_names, Feature, FEATURE_COUNT};

/// Per-feature standardization `(x - mean) / scale`, fit on the training set.
///
/// `scale` is the population standard deviation (ddof = 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    n_samples_seen: usize,
}

impl StandardScaler {
    /// Build a scaler over the schema from known statistics.
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Self {
        Self {
            feature_names: feature_names(),
            mean: mean.to_vec(),
            scale: scale.to_vec(),
            n_samples_seen: 0,
        }
    }

    /// Learn mean and standard deviation of every feature.
    ///
    /// Fails on an empty table or on a constant feature, which could not be
    /// standardized at scoring time.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        if rows.is_empty() {
            bail!("cannot fit a scaler on an empty table");
        }
        let n = rows.len() as f64;

        let mut mean = [0.0; FEATURE_COUNT];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.values()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0; FEATURE_COUNT];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row.values()).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        let scale = var.map(|v| (v / n).sqrt());

        let constant: Vec<&str> = Feature::ALL
            .iter()
            .filter(|f| {
                let s = scale[f.index()];
                !s.is_finite() || s <= 0.0
            })
            .map(|f| f.column_name())
            .collect();
        if !constant.is_empty() {
            bail!(
                "features with zero variance in the training data: {}",
                constant.join(", ")
            );
        }

        Ok(Self {
            feature_names: feature_names(),
            mean: mean.to_vec(),
            scale: scale.to_vec(),
            n_samples_seen: rows.len(),
        })
    }

    /// Standardize one feature vector. Positions follow the schema order that
    /// [`validate`](Self::validate) guarantees for `feature_names`.
    pub fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, x) in features.values().iter().enumerate() {
            out[i] = (x - self.mean[i]) / self.scale[i];
        }
        out
    }

    /// Check that the stored statistics describe exactly the feature schema.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_names != feature_names() {
            return Err(format!(
                "feature names {:?} do not match the schema {:?}",
                self.feature_names,
                feature_names()
            ));
        }
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {FEATURE_COUNT} means and scales, found {} and {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        for (i, feature) in Feature::ALL.iter().enumerate() {
            if !self.mean[i].is_finite() {
                return Err(format!("mean of '{}' is not finite", feature.column_name()));
            }
            let s = self.scale[i];
            if !s.is_finite() || s <= 0.0 {
                return Err(format!(
                    "standard deviation of '{}' is {s}, must be positive",
                    feature.column_name()
                ));
            }
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: f64) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        for (i, x) in values.iter_mut().enumerate() {
            *x = v * (i + 1) as f64;
        }
        FeatureVector::from_values(values)
    }

    #[test]
    fn fit_uses_population_std() {
        let scaler = StandardScaler::fit(&[row(1.0), row(3.0)]).unwrap();
        assert_eq!(scaler.mean()[0], 2.0);
        assert_eq!(scaler.scale()[0], 1.0);
        assert_eq!(scaler.mean()[9], 20.0);
        assert_eq!(scaler.scale()[9], 10.0);
        assert_eq!(scaler.n_samples_seen(), 2);
        assert!(scaler.validate().is_ok());

        let z = scaler.transform(&row(3.0));
        assert!(z.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn fit_rejects_constant_feature() {
        let err = StandardScaler::fit(&[row(1.0), row(1.0)]).unwrap_err();
        assert!(err.to_string().contains("GFR (mL/min)"));
        assert!(StandardScaler::fit(&[]).is_err());
    }

    #[test]
    fn validate_rejects_zero_std_and_renamed_features() {
        let mut scale = [1.0; FEATURE_COUNT];
        scale[Feature::Age.index()] = 0.0;
        let err = StandardScaler::new([0.0; FEATURE_COUNT], scale).validate().unwrap_err();
        assert!(err.contains("Age"));

        let mut renamed = StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]);
        renamed.feature_names.swap(0, 1);
        assert!(renamed.validate().is_err());
    }
}
