//! Command-line scorer: one JSON object of raw patient fields in, one result out.
//!
//! ```text
//! echo '{"gfr": 45.7, "creatinine": 4.96, "acr": 123.8, "hypertension": "No",
//!        "diabetes": "Yes", "bmi": 31.1, "age": 71, "sex": "Male",
//!        "nsaid_score": 4.56, "edema": "No"}' | ckd-score
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use ckd_risk::config::Settings;
use ckd_risk::{predict, Artifacts, PredictionResult, RawPatientInput, Recommendation};
use clap::Parser;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "ckd-score", about = "Score one patient against the saved CKD artifacts")]
struct Cli {
    /// JSON file with the raw patient fields. Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory holding scaler.json and classifier.json.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Output {
    #[serde(flatten)]
    result: PredictionResult,
    recommendation: Recommendation,
}

fn read_input(path: Option<&PathBuf>) -> Result<RawPatientInput> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("input must be a flat JSON object of patient fields")
}

/// Why a run produced no score. Each variant has its own exit status.
#[derive(Debug)]
enum Failure {
    /// Artifacts missing or corrupt: the scorer must not serve anything.
    Artifacts(anyhow::Error),
    /// The request was unreadable or rejected; artifacts are fine.
    Request(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Artifacts(_) => 2,
            Failure::Request(_) => 1,
        }
    }
}

/// Load artifacts, score the input and render the JSON output.
fn run(cli: &Cli) -> Result<String, Failure> {
    let artifacts = load_artifacts(cli).map_err(Failure::Artifacts)?;
    let raw = read_input(cli.input.as_ref()).map_err(Failure::Request)?;
    let result = predict(&artifacts, &raw)
        .context("invalid input")
        .map_err(Failure::Request)?;
    let output = Output {
        result,
        recommendation: result.recommendation(),
    };
    serde_json::to_string_pretty(&output)
        .context("serializing result")
        .map_err(Failure::Request)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            match &failure {
                Failure::Artifacts(e) => log::error!("Refusing to start: {e:#}"),
                Failure::Request(e) => log::error!("{e:#}"),
            }
            ExitCode::from(failure.exit_code())
        }
    }
}

fn load_artifacts(cli: &Cli) -> Result<Artifacts> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.models_dir {
        settings.models_dir = dir.clone();
    }
    Ok(Artifacts::load(&settings.artifact_paths())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckd_risk::model::{BoosterParams, GradientBoostedClassifier, Node, StandardScaler, Tree};
    use ckd_risk::{ArtifactPaths, FEATURE_COUNT};
    use std::path::Path;

    const PATIENT: &str = r#"{"gfr": 45.7, "creatinine": 4.96, "acr": 123.8,
        "hypertension": "No", "diabetes": "Yes", "bmi": 31.1, "age": 71,
        "sex": "Male", "nsaid_score": 4.56, "edema": "No"}"#;

    fn save_artifacts(dir: &Path) {
        let scaler = StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]);
        let classifier = GradientBoostedClassifier::from_trees(
            BoosterParams::default(),
            vec![Tree::new(vec![Node::Leaf { value: 1.0 }])],
        );
        Artifacts::new(scaler, classifier)
            .unwrap()
            .save(&ArtifactPaths::in_dir(dir))
            .unwrap();
    }

    fn cli(models_dir: &Path, input: &Path) -> Cli {
        Cli {
            input: Some(input.to_path_buf()),
            models_dir: Some(models_dir.to_path_buf()),
            config: None,
        }
    }

    #[test]
    fn missing_artifacts_exit_with_2() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("patient.json");
        std::fs::write(&input, PATIENT).unwrap();

        let failure = run(&cli(&tmp.path().join("empty"), &input)).unwrap_err();
        assert!(matches!(failure, Failure::Artifacts(_)));
        assert_eq!(failure.exit_code(), 2);
    }

    #[test]
    fn rejected_request_exits_with_1() {
        let tmp = tempfile::tempdir().unwrap();
        save_artifacts(tmp.path());
        let input = tmp.path().join("patient.json");

        std::fs::write(&input, r#"{"gfr": 45.7}"#).unwrap();
        let failure = run(&cli(tmp.path(), &input)).unwrap_err();
        assert_eq!(failure.exit_code(), 1);
        let Failure::Request(e) = failure else {
            panic!("expected a request failure");
        };
        assert!(format!("{e:#}").contains("missing required fields"));

        std::fs::write(&input, "not json").unwrap();
        assert_eq!(run(&cli(tmp.path(), &input)).unwrap_err().exit_code(), 1);
    }

    #[test]
    fn valid_request_prints_the_result() {
        let tmp = tempfile::tempdir().unwrap();
        save_artifacts(tmp.path());
        let input = tmp.path().join("patient.json");
        std::fs::write(&input, PATIENT).unwrap();

        let json: serde_json::Value = serde_json::from_str(&run(&cli(tmp.path(), &input)).unwrap()).unwrap();
        assert_eq!(json["label"], 1);
        assert!(json["recommendation"]["headline"]
            .as_str()
            .unwrap()
            .starts_with("High CKD risk"));
    }
}
