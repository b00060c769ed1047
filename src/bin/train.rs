//! Offline training job: patient table in, `scaler.json` + `classifier.json` out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ckd_risk::config::Settings;
use ckd_risk::data::loader::load_training_table;
use ckd_risk::model::BoosterParams;
use ckd_risk::training::train;
use clap::Parser;

#[derive(Parser)]
#[command(name = "ckd-train", about = "Fit the CKD scaler and classifier and save both artifacts")]
struct Cli {
    /// Labeled patient table (.parquet, .csv or .json). Defaults to the configured dataset.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Output directory for the artifacts. Defaults to the configured models directory.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dataset) = cli.dataset {
        settings.dataset = dataset;
    }
    if let Some(dir) = cli.models_dir {
        settings.models_dir = dir;
    }

    let table = load_training_table(&settings.dataset)
        .with_context(|| format!("loading training data from {}", settings.dataset.display()))?;

    let (artifacts, report) = train(&table, &BoosterParams::default())?;
    log::info!(
        "Trained on {} patients ({} positive): accuracy {:.3}, log loss {:.4}",
        report.samples,
        report.positives,
        report.accuracy,
        report.log_loss
    );

    artifacts.save(&settings.artifact_paths())?;
    log::info!("Models saved to {}", settings.models_dir.display());
    Ok(())
}
