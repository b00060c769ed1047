use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::features::FeatureVector;
use super::schema::{Feature, FEATURE_COUNT, ID_COLUMN, LABEL_COLUMN};

// ---------------------------------------------------------------------------
// Cell – one value of the source table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell, before it is checked against the schema.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

static NULL_CELL: Cell = Cell::Null;

impl Cell {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TrainingTable – the schema-checked dataset
// ---------------------------------------------------------------------------

/// Labeled patients with features already in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingTable {
    pub ids: Vec<String>,
    pub rows: Vec<FeatureVector>,
    /// 0.0 or 1.0 per row.
    pub labels: Vec<f64>,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1.0).count()
    }

    pub fn push(&mut self, id: impl Into<String>, features: FeatureVector, label: f64) {
        self.ids.push(id.into());
        self.rows.push(features);
        self.labels.push(label);
    }

    /// Check headers against the schema and convert every row.
    ///
    /// Columns are matched by name, so the file's column order is irrelevant.
    fn from_cells(headers: &[String], records: Vec<Vec<Cell>>) -> Result<Self> {
        let mut repeated: Vec<&str> = Vec::new();
        for (i, h) in headers.iter().enumerate() {
            if headers[..i].contains(h) && !repeated.contains(&h.as_str()) {
                repeated.push(h);
            }
        }
        if !repeated.is_empty() {
            bail!("table repeats columns: {}", repeated.join(", "));
        }

        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut missing = Vec::new();
        let id_idx = position(ID_COLUMN);
        let label_idx = position(LABEL_COLUMN);
        if id_idx.is_none() {
            missing.push(ID_COLUMN);
        }
        if label_idx.is_none() {
            missing.push(LABEL_COLUMN);
        }
        let mut feature_idx = [0usize; FEATURE_COUNT];
        for feature in Feature::ALL {
            match position(feature.column_name()) {
                Some(i) => feature_idx[feature.index()] = i,
                None => missing.push(feature.column_name()),
            }
        }
        if !missing.is_empty() {
            bail!("table is missing columns: {}", missing.join(", "));
        }

        let extra: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| *h != ID_COLUMN && *h != LABEL_COLUMN && Feature::from_column_name(h).is_none())
            .collect();
        if !extra.is_empty() {
            bail!("table has columns outside the feature schema: {}", extra.join(", "));
        }

        let (Some(id_idx), Some(label_idx)) = (id_idx, label_idx) else {
            bail!("table is missing the identifier or label column");
        };

        let mut table = TrainingTable::default();
        for (row_no, record) in records.into_iter().enumerate() {
            let cell = |idx: usize| record.get(idx).unwrap_or(&NULL_CELL);

            let id = match cell(id_idx) {
                Cell::Text(s) => s.clone(),
                Cell::Number(v) => format!("{v}"),
                Cell::Bool(b) => b.to_string(),
                Cell::Null => bail!("row {row_no}: '{ID_COLUMN}' is empty"),
            };

            let label = cell(label_idx)
                .as_f64()
                .filter(|y| *y == 0.0 || *y == 1.0)
                .with_context(|| {
                    format!("row {row_no}: '{LABEL_COLUMN}' must be 0 or 1, got {:?}", cell(label_idx))
                })?;

            let mut values = [0.0; FEATURE_COUNT];
            for feature in Feature::ALL {
                let raw = cell(feature_idx[feature.index()]);
                let value = raw
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .with_context(|| {
                        format!(
                            "row {row_no}: '{}' is not a finite number ({raw:?})",
                            feature.column_name()
                        )
                    })?;
                values[feature.index()] = value;
            }

            table.push(id, FeatureVector::from_values(values), label);
        }
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a labeled patient table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per field (recommended)
/// * `.json`    – `[{ "PatientID": "P1", "GFR (mL/min)": 45.7, ... }, ...]`
/// * `.csv`     – header row with column names
pub fn load_training_table(path: &Path) -> Result<TrainingTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (headers, records) = match ext.as_str() {
        "parquet" | "pq" => read_parquet(path)?,
        "json" => read_json(path)?,
        "csv" => read_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    let table = TrainingTable::from_cells(&headers, records)
        .with_context(|| format!("validating {}", path.display()))?;
    log::info!(
        "Loaded {} patients ({} positive) from {}",
        table.len(),
        table.positives(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn read_json(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let objects = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<BTreeMap<String, Cell>> = Vec::with_capacity(objects.len());
    for (i, rec) in objects.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    let records = rows
        .into_iter()
        .map(|mut row| {
            headers
                .iter()
                .map(|h| row.remove(h).unwrap_or(Cell::Null))
                .collect()
        })
        .collect();
    Ok((headers, records))
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(record.iter().map(guess_cell_type).collect());
    }
    Ok((headers, records))
}

fn guess_cell_type(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() {
        return Cell::Null;
    }
    if let Ok(f) = s.parse::<f64>() {
        return Cell::Number(f);
    }
    if s == "true" || s == "false" {
        return Cell::Bool(s == "true");
    }
    Cell::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .enumerate()
                .map(|(col_idx, col)| {
                    extract_cell(col, row)
                        .with_context(|| format!("Row {row}, column '{}'", headers[col_idx]))
                })
                .collect::<Result<Vec<_>>>()?;
            records.push(cells);
        }
    }
    Ok((headers, records))
}

/// Extract a single value from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<Cell> {
    if col.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => Cell::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Cell::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Cell::Number(col.as_primitive::<Int32Type>().value(row) as f64),
        DataType::Int64 => Cell::Number(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Float32 => Cell::Number(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Cell::Number(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Cell::Bool(col.as_boolean().value(row)),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        let mut h = vec![ID_COLUMN.to_string()];
        h.extend(Feature::ALL.iter().map(|f| f.column_name().to_string()));
        h.push(LABEL_COLUMN.to_string());
        h
    }

    fn row(id: &str, label: f64) -> Vec<Cell> {
        let mut r = vec![Cell::Text(id.to_string())];
        r.extend((0..FEATURE_COUNT).map(|i| Cell::Number(i as f64)));
        r.push(Cell::Number(label));
        r
    }

    #[test]
    fn builds_rows_in_schema_order() {
        let table = TrainingTable::from_cells(&headers(), vec![row("P1", 1.0), row("P2", 0.0)]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.ids, vec!["P1", "P2"]);
        assert_eq!(table.labels, vec![1.0, 0.0]);
        assert_eq!(table.rows[0].get(Feature::Gfr), 0.0);
        assert_eq!(table.rows[0].get(Feature::Edema), 9.0);
        assert_eq!(table.positives(), 1);
    }

    #[test]
    fn rejects_non_binary_label() {
        let err = TrainingTable::from_cells(&headers(), vec![row("P1", 2.0)]).unwrap_err();
        assert!(err.to_string().contains(LABEL_COLUMN));
    }

    #[test]
    fn rejects_null_feature() {
        let mut r = row("P1", 0.0);
        r[3] = Cell::Null;
        let err = TrainingTable::from_cells(&headers(), vec![r]).unwrap_err();
        assert!(err.to_string().contains("ACR (mg/g)"));
    }

    #[test]
    fn booleans_count_as_flags() {
        let mut r = row("P1", 0.0);
        r[1 + Feature::Diabetes.index()] = Cell::Bool(true);
        let table = TrainingTable::from_cells(&headers(), vec![r]).unwrap();
        assert_eq!(table.rows[0].get(Feature::Diabetes), 1.0);
    }

    #[test]
    fn csv_cells_are_typed() {
        assert_eq!(guess_cell_type(" 4.5 "), Cell::Number(4.5));
        assert_eq!(guess_cell_type("true"), Cell::Bool(true));
        assert_eq!(guess_cell_type(""), Cell::Null);
        assert_eq!(guess_cell_type("P-001"), Cell::Text("P-001".into()));
    }

    #[test]
    fn rejects_repeated_column() {
        let mut h = headers();
        h.push(Feature::Age.column_name().to_string());
        let mut r = row("P1", 0.0);
        r.push(Cell::Number(40.0));
        let err = TrainingTable::from_cells(&h, vec![r]).unwrap_err();
        assert_eq!(err.to_string(), "table repeats columns: Age");
    }
}
