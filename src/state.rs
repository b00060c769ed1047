use ckd_risk::config::Settings;
use ckd_risk::{score, Artifacts, Feature, RawPatientInput, ScoredPatient, ScoringError, Sex};

// ---------------------------------------------------------------------------
// Form values
// ---------------------------------------------------------------------------

/// Widget-side values of the patient form.
///
/// Converted into a [`RawPatientInput`] on submit so the form goes through the
/// same encoding contract as every other caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientForm {
    pub age: u32,
    pub sex: Sex,
    pub bmi: f64,
    pub hypertension: bool,
    pub diabetes: bool,
    pub edema: bool,
    pub gfr: f64,
    pub creatinine: f64,
    pub acr: f64,
    pub nsaid_score: f64,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            age: 50,
            sex: Sex::Male,
            bmi: 25.0,
            hypertension: false,
            diabetes: false,
            edema: false,
            gfr: 90.0,
            creatinine: 0.9,
            acr: 30.0,
            nsaid_score: 0.0,
        }
    }
}

fn yes_no(answer: bool) -> &'static str {
    if answer {
        "Yes"
    } else {
        "No"
    }
}

impl PatientForm {
    pub fn to_raw_input(&self) -> RawPatientInput {
        RawPatientInput::new()
            .with(Feature::Age.input_key(), self.age)
            .with(Feature::Sex.input_key(), self.sex)
            .with(Feature::Bmi.input_key(), self.bmi)
            .with(Feature::Hypertension.input_key(), yes_no(self.hypertension))
            .with(Feature::Diabetes.input_key(), yes_no(self.diabetes))
            .with(Feature::Edema.input_key(), yes_no(self.edema))
            .with(Feature::Gfr.input_key(), self.gfr)
            .with(Feature::Creatinine.input_key(), self.creatinine)
            .with(Feature::Acr.input_key(), self.acr)
            .with(Feature::NsaidScore.input_key(), self.nsaid_score)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Scaler + classifier, loaded before the window opens.
    pub artifacts: Artifacts,

    /// Where `artifacts` came from.
    pub settings: Settings,

    pub form: PatientForm,

    /// Result of the last submit (None until the form is submitted).
    pub outcome: Option<Result<ScoredPatient, ScoringError>>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(artifacts: Artifacts, settings: Settings) -> Self {
        Self {
            artifacts,
            settings,
            form: PatientForm::default(),
            outcome: None,
            status_message: None,
        }
    }

    /// Score the current form values.
    pub fn submit(&mut self) {
        let outcome = score(&self.artifacts, &self.form.to_raw_input());
        match &outcome {
            Ok(scored) => log::info!(
                "Prediction: label={} probability={:.4}",
                scored.result.label,
                scored.result.probability
            ),
            Err(e) => log::warn!("Rejected scoring request: {e}"),
        }
        self.outcome = Some(outcome);
    }

    pub fn reset_form(&mut self) {
        self.form = PatientForm::default();
        self.outcome = None;
    }

    /// Whether the last submit was rejected because of `feature`.
    pub fn field_error(&self, feature: Feature) -> Option<&ScoringError> {
        match &self.outcome {
            Some(Err(e)) if e.fields().iter().any(|f| f == feature.input_key()) => Some(e),
            _ => None,
        }
    }

    /// Swap in artifacts from another models directory. On failure the
    /// current artifacts stay in place.
    pub fn reload_artifacts(&mut self, settings: Settings) {
        match Artifacts::load(&settings.artifact_paths()) {
            Ok(artifacts) => {
                self.artifacts = artifacts;
                self.settings = settings;
                self.outcome = None;
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to reload artifacts: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckd_risk::build_feature_vector;
    use ckd_risk::model::{BoosterParams, GradientBoostedClassifier, Node, StandardScaler, Tree};
    use ckd_risk::FEATURE_COUNT;

    #[test]
    fn default_form_is_a_complete_valid_input() {
        let fv = build_feature_vector(&PatientForm::default().to_raw_input()).unwrap();
        assert!(ckd_risk::check_ranges(&fv).is_ok());
        assert_eq!(fv.get(Feature::Sex), 0.0);
        assert_eq!(fv.get(Feature::Age), 50.0);
        assert_eq!(fv.get(Feature::Hypertension), 0.0);
    }

    #[test]
    fn form_uses_the_frozen_encodings() {
        let form = PatientForm {
            sex: Sex::Female,
            diabetes: true,
            ..PatientForm::default()
        };
        let fv = build_feature_vector(&form.to_raw_input()).unwrap();
        assert_eq!(fv.get(Feature::Sex), 1.0);
        assert_eq!(fv.get(Feature::Diabetes), 1.0);
        assert_eq!(fv.get(Feature::Edema), 0.0);
    }

    fn constant_artifacts(leaf: f64) -> Artifacts {
        let scaler = StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]);
        let classifier = GradientBoostedClassifier::from_trees(
            BoosterParams::default(),
            vec![Tree::new(vec![Node::Leaf { value: leaf }])],
        );
        Artifacts::new(scaler, classifier).unwrap()
    }

    #[test]
    fn failed_reload_keeps_the_loaded_models() {
        let tmp = tempfile::tempdir().unwrap();
        let original = constant_artifacts(0.5);
        let mut state = AppState::new(original.clone(), Settings::default());
        state.submit();
        assert!(matches!(state.outcome, Some(Ok(_))));

        let mut settings = Settings::default();
        settings.models_dir = tmp.path().to_path_buf();
        state.reload_artifacts(settings);

        assert_eq!(state.artifacts, original);
        assert_eq!(state.settings, Settings::default());
        assert!(matches!(state.outcome, Some(Ok(_))));
        let status = state.status_message.as_deref().unwrap_or_default();
        assert!(status.contains("scaler"), "{status}");
    }

    #[test]
    fn successful_reload_swaps_models_and_clears_status() {
        let tmp = tempfile::tempdir().unwrap();
        let replacement = constant_artifacts(-0.5);
        replacement
            .save(&ckd_risk::ArtifactPaths::in_dir(tmp.path()))
            .unwrap();

        let mut state = AppState::new(constant_artifacts(0.5), Settings::default());
        state.status_message = Some("Error: stale".to_string());
        state.submit();

        let mut settings = Settings::default();
        settings.models_dir = tmp.path().to_path_buf();
        state.reload_artifacts(settings.clone());

        assert_eq!(state.artifacts, replacement);
        assert_eq!(state.settings, settings);
        assert!(state.outcome.is_none());
        assert!(state.status_message.is_none());
    }
}
