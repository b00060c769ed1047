use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ckd_risk::data::loader::{load_training_table, TrainingTable};
use ckd_risk::data::schema::{ID_COLUMN, LABEL_COLUMN};
use ckd_risk::model::BoosterParams;
use ckd_risk::training::train;
use ckd_risk::{predict, ArtifactPaths, Artifacts, Feature, FeatureVector, RawPatientInput, FEATURE_COUNT};
use parquet::arrow::ArrowWriter;
use pretty_assertions::assert_eq;

/// Deterministic table where CKD is exactly `GFR < 60`; every feature varies.
fn synthetic_rows(n: usize) -> Vec<([f64; FEATURE_COUNT], f64)> {
    (0..n)
        .map(|i| {
            let gfr = 15.0 + ((i * 37) % 130) as f64;
            let values = [
                gfr,
                0.5 + ((i * 13) % 40) as f64 / 10.0,
                ((i * 53) % 500) as f64,
                (i % 2) as f64,
                ((i / 2) % 2) as f64,
                18.0 + ((i * 7) % 25) as f64,
                20.0 + ((i * 11) % 70) as f64,
                ((i / 3) % 2) as f64,
                ((i * 3) % 99) as f64 / 10.0,
                (i % 5 == 0) as u8 as f64,
            ];
            (values, if gfr < 60.0 { 1.0 } else { 0.0 })
        })
        .collect()
}

fn synthetic_table(n: usize) -> TrainingTable {
    let mut table = TrainingTable::default();
    for (i, (values, label)) in synthetic_rows(n).into_iter().enumerate() {
        table.push(format!("P{i}"), FeatureVector::from_values(values), label);
    }
    table
}

/// CSV with the given column order.
fn write_csv(path: &Path, columns: &[&str], n: usize) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(columns).unwrap();
    for (i, (values, label)) in synthetic_rows(n).into_iter().enumerate() {
        let record: Vec<String> = columns
            .iter()
            .map(|&c| match c {
                ID_COLUMN => format!("P{i}"),
                LABEL_COLUMN => format!("{}", label as i64),
                name => {
                    let f = Feature::from_column_name(name).expect("schema column");
                    format!("{}", values[f.index()])
                }
            })
            .collect();
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();
}

fn schema_columns() -> Vec<&'static str> {
    let mut cols = vec![ID_COLUMN];
    cols.extend(Feature::ALL.iter().map(|f| f.column_name()));
    cols.push(LABEL_COLUMN);
    cols
}

fn patient(gfr: f64) -> RawPatientInput {
    RawPatientInput::new()
        .with("gfr", gfr)
        .with("creatinine", 1.0)
        .with("acr", 30.0)
        .with("hypertension", "No")
        .with("diabetes", "No")
        .with("bmi", 25.0)
        .with("age", 50u32)
        .with("sex", "Female")
        .with("nsaid_score", 1.0)
        .with("edema", "No")
}

#[test]
fn csv_column_order_does_not_matter() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let ordered = tmp.path().join("ordered.csv");
    let shuffled = tmp.path().join("shuffled.csv");

    let columns = schema_columns();
    let mut reversed = columns.clone();
    reversed.reverse();
    write_csv(&ordered, &columns, 20);
    write_csv(&shuffled, &reversed, 20);

    let a = load_training_table(&ordered).expect("ordered");
    let b = load_training_table(&shuffled).expect("shuffled");
    assert_eq!(a, b);
    assert_eq!(a, synthetic_table(20));
}

#[test]
fn missing_and_extra_columns_are_rejected() {
    let tmp = tempfile::tempdir().expect("tmpdir");

    let missing = tmp.path().join("missing.csv");
    let columns: Vec<&str> = schema_columns()
        .into_iter()
        .filter(|c| *c != Feature::Acr.column_name())
        .collect();
    write_csv(&missing, &columns, 5);
    let err = load_training_table(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("ACR (mg/g)"), "{err:#}");

    let ok = tmp.path().join("ok.csv");
    write_csv(&ok, &schema_columns(), 1);
    let text = fs::read_to_string(&ok).unwrap();
    let text: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{line},Weight")
            } else {
                format!("{line},80")
            }
        })
        .collect();
    let extra = tmp.path().join("extra.csv");
    fs::write(&extra, text.join("\n")).unwrap();
    let err = load_training_table(&extra).unwrap_err();
    assert!(format!("{err:#}").contains("Weight"), "{err:#}");
}

#[test]
fn repeated_feature_column_is_rejected() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("repeated.csv");
    let mut columns = schema_columns();
    columns.push(Feature::Age.column_name());
    write_csv(&path, &columns, 3);

    let err = load_training_table(&path).unwrap_err();
    assert!(format!("{err:#}").contains("repeats columns: Age"), "{err:#}");
}

#[test]
fn json_records_are_loaded() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("patients.json");

    let records: Vec<serde_json::Value> = synthetic_rows(3)
        .into_iter()
        .enumerate()
        .map(|(i, (values, label))| {
            let mut obj = serde_json::Map::new();
            obj.insert(ID_COLUMN.into(), serde_json::json!(format!("P{i}")));
            for f in Feature::ALL {
                obj.insert(f.column_name().into(), serde_json::json!(values[f.index()]));
            }
            obj.insert(LABEL_COLUMN.into(), serde_json::json!(label as i64));
            serde_json::Value::Object(obj)
        })
        .collect();
    fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

    assert_eq!(load_training_table(&path).unwrap(), synthetic_table(3));
}

#[test]
fn parquet_tables_are_loaded() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("patients.parquet");
    let rows = synthetic_rows(12);

    let mut fields = vec![Field::new(ID_COLUMN, DataType::Utf8, false)];
    let ids: Vec<String> = (0..rows.len()).map(|i| format!("P{i}")).collect();
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
        ids.iter().map(String::as_str).collect::<Vec<_>>(),
    ))];
    for f in Feature::ALL {
        fields.push(Field::new(f.column_name(), DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|(v, _)| v[f.index()]).collect::<Vec<_>>(),
        )));
    }
    fields.push(Field::new(LABEL_COLUMN, DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from(
        rows.iter().map(|(_, y)| *y as i64).collect::<Vec<_>>(),
    )));

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let file = fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    assert_eq!(load_training_table(&path).unwrap(), synthetic_table(12));
}

#[test]
fn unsupported_extension_is_an_error() {
    let err = load_training_table(Path::new("patients.xlsx")).unwrap_err();
    assert!(err.to_string().contains(".xlsx"));
}

#[test]
fn training_learns_the_gfr_rule() {
    let table = synthetic_table(200);
    let (artifacts, report) = train(&table, &BoosterParams::default()).expect("train");

    assert_eq!(report.samples, 200);
    assert_eq!(report.positives, table.positives());
    assert!(report.accuracy >= 0.95, "accuracy {}", report.accuracy);
    assert!(report.log_loss < 0.3, "log loss {}", report.log_loss);
    assert_eq!(artifacts.classifier().trees().len(), 100);
    assert!(artifacts.classifier().trees().iter().all(|t| t.depth() <= 5));

    let sick = predict(&artifacts, &patient(30.0)).unwrap();
    let healthy = predict(&artifacts, &patient(120.0)).unwrap();
    assert_eq!(sick.label, 1);
    assert_eq!(healthy.label, 0);
    assert!(sick.probability > healthy.probability);
}

#[test]
fn training_is_deterministic_and_round_trips() {
    let table = synthetic_table(80);
    let params = BoosterParams {
        n_estimators: 15,
        ..BoosterParams::default()
    };
    let (first, _) = train(&table, &params).unwrap();
    let (second, _) = train(&table, &params).unwrap();
    assert_eq!(first, second);

    let tmp = tempfile::tempdir().expect("tmpdir");
    let paths = ArtifactPaths::in_dir(tmp.path());
    first.save(&paths).unwrap();
    let loaded = Artifacts::load(&paths).unwrap();
    assert_eq!(loaded, first);
    assert_eq!(
        predict(&loaded, &patient(45.0)).unwrap(),
        predict(&first, &patient(45.0)).unwrap()
    );
}

#[test]
fn constant_feature_fails_training() {
    let mut table = TrainingTable::default();
    for (i, (mut values, label)) in synthetic_rows(10).into_iter().enumerate() {
        values[Feature::Edema.index()] = 0.0;
        table.push(format!("P{i}"), FeatureVector::from_values(values), label);
    }
    let err = train(&table, &BoosterParams::default()).unwrap_err();
    assert!(format!("{err:#}").contains("Edema (0/1)"), "{err:#}");
}
