//! Writes a deterministic synthetic patient table in the training schema.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ckd_risk::data::schema::{Feature, FeatureKind, FEATURE_COUNT, ID_COLUMN, LABEL_COLUMN};
use clap::Parser;
use parquet::arrow::ArrowWriter;

#[derive(Parser)]
#[command(name = "generate-sample", about = "Write a synthetic CKD training table")]
struct Cli {
    /// Output file (.parquet or .csv).
    #[arg(long, default_value = "data/ckd_dataset.parquet")]
    output: PathBuf,

    /// Number of patients.
    #[arg(long, default_value = "500")]
    rows: usize,

    /// PRNG seed.
    #[arg(long, default_value = "42")]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

/// One synthetic patient, values indexed by [`Feature::index`].
fn generate_patient(rng: &mut SimpleRng) -> ([f64; FEATURE_COUNT], i64) {
    let age = rng.uniform(18.0, 90.0).floor();
    let female = rng.chance(0.5);
    let bmi = rng.gauss(27.0, 5.0).clamp(10.0, 50.0);
    let hypertension = rng.chance(if age > 55.0 { 0.55 } else { 0.2 });
    let diabetes = rng.chance(if bmi > 30.0 { 0.35 } else { 0.12 });
    let nsaid = rng.uniform(0.0, 9.9);

    let mut gfr_mean = 105.0 - 0.7 * (age - 18.0) - 0.8 * nsaid;
    if diabetes {
        gfr_mean -= 20.0;
    }
    if hypertension {
        gfr_mean -= 12.0;
    }
    let gfr = rng.gauss(gfr_mean, 18.0).clamp(3.0, 160.0);

    let sex_factor = if female { 0.8 } else { 1.0 };
    let creatinine = (0.95 * sex_factor * (90.0 / gfr).powf(0.9) * rng.gauss(0.0, 0.1).exp())
        .clamp(0.1, 20.0);

    let acr_log_mean = 15f64.ln() + if diabetes { 1.6 } else { 0.0 } + if gfr < 60.0 { 1.2 } else { 0.0 };
    let acr = rng.gauss(acr_log_mean, 0.9).exp().clamp(0.0, 5000.0);
    let edema = rng.chance(if gfr < 45.0 { 0.4 } else { 0.05 });

    let mut ckd = gfr < 60.0 || acr > 300.0;
    if rng.chance(0.05) {
        ckd = !ckd;
    }

    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let mut values = [0.0; FEATURE_COUNT];
    values[Feature::Gfr.index()] = round_to(gfr, 1);
    values[Feature::Creatinine.index()] = round_to(creatinine, 2);
    values[Feature::Acr.index()] = round_to(acr, 1);
    values[Feature::Hypertension.index()] = flag(hypertension);
    values[Feature::Diabetes.index()] = flag(diabetes);
    values[Feature::Bmi.index()] = round_to(bmi, 1);
    values[Feature::Age.index()] = age;
    values[Feature::Sex.index()] = flag(female);
    values[Feature::NsaidScore.index()] = round_to(nsaid, 2);
    values[Feature::Edema.index()] = flag(edema);
    (values, ckd as i64)
}

/// Categorical and age columns are written as integers, measurements as floats.
fn is_integer_column(feature: Feature) -> bool {
    feature == Feature::Age || feature.kind() != FeatureKind::Numeric
}

fn write_parquet(path: &Path, ids: &[String], rows: &[[f64; FEATURE_COUNT]], labels: &[i64]) -> Result<()> {
    let mut fields = vec![Field::new(ID_COLUMN, DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
        ids.iter().map(String::as_str).collect::<Vec<_>>(),
    ))];

    for feature in Feature::ALL {
        let values = rows.iter().map(|r| r[feature.index()]);
        if is_integer_column(feature) {
            fields.push(Field::new(feature.column_name(), DataType::Int64, false));
            columns.push(Arc::new(Int64Array::from(
                values.map(|v| v as i64).collect::<Vec<_>>(),
            )));
        } else {
            fields.push(Field::new(feature.column_name(), DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from(values.collect::<Vec<_>>())));
        }
    }

    fields.push(Field::new(LABEL_COLUMN, DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from(labels.to_vec())));

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_csv(path: &Path, ids: &[String], rows: &[[f64; FEATURE_COUNT]], labels: &[i64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec![ID_COLUMN.to_string()];
    header.extend(Feature::ALL.iter().map(|f| f.column_name().to_string()));
    header.push(LABEL_COLUMN.to_string());
    writer.write_record(&header)?;

    for ((id, row), label) in ids.iter().zip(rows).zip(labels) {
        let mut record = vec![id.clone()];
        for feature in Feature::ALL {
            let v = row[feature.index()];
            record.push(if is_integer_column(feature) {
                format!("{}", v as i64)
            } else {
                format!("{v}")
            });
        }
        record.push(label.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut rng = SimpleRng::new(cli.seed);
    let mut ids = Vec::with_capacity(cli.rows);
    let mut rows = Vec::with_capacity(cli.rows);
    let mut labels = Vec::with_capacity(cli.rows);
    for i in 0..cli.rows {
        let (values, label) = generate_patient(&mut rng);
        ids.push(format!("P{:05}", i + 1));
        rows.push(values);
        labels.push(label);
    }

    if let Some(dir) = cli.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let ext = cli
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(&cli.output, &ids, &rows, &labels)?,
        "csv" => write_csv(&cli.output, &ids, &rows, &labels)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    let positives = labels.iter().filter(|&&l| l == 1).count();
    log::info!(
        "Wrote {} patients ({positives} with CKD) to {}",
        cli.rows,
        cli.output.display()
    );
    Ok(())
}
