mod app;
mod color;
mod state;
mod ui;

use anyhow::{anyhow, Context};
use app::CkdRiskApp;
use ckd_risk::config::Settings;
use ckd_risk::Artifacts;
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = Settings::load(None)?;

    // Artifacts are loaded exactly once, before any request can be made.
    let artifacts = load_artifacts(&settings)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "CKD Risk – Scoring Form",
        options,
        Box::new(move |_cc| Ok(Box::new(CkdRiskApp::new(AppState::new(artifacts, settings))))),
    )
    .map_err(|e| anyhow!("UI error: {e}"))
}

/// The error is reported once, by `main`'s return.
fn load_artifacts(settings: &Settings) -> anyhow::Result<Artifacts> {
    Artifacts::load(&settings.artifact_paths()).context("Refusing to start")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_refuse_startup_with_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            models_dir: tmp.path().to_path_buf(),
            ..Settings::default()
        };
        let err = load_artifacts(&settings).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("Refusing to start: cannot read scaler artifact"), "{message}");
        assert!(message.contains(&tmp.path().display().to_string()), "{message}");
    }
}
