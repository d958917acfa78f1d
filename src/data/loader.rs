use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnKind, Record, Table, Value};
use super::schema::DatasetSchema;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// On-disk layouts the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    Parquet,
}

impl Format {
    /// Pick a format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "parquet" | "pq" => Ok(Format::Parquet),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line (recommended)
/// * `.json`    – `[{ "Platform": "TikTok", "Revenue ($)": 120.5, ... }, ...]`
/// * `.parquet` – flat columns of strings, numbers, booleans or dates
pub fn load_file(path: &Path, schema: &DatasetSchema) -> Result<Table> {
    let format = Format::from_path(path)?;
    let bytes = std::fs::read(path)?;
    load_bytes(&bytes, format, schema)
}

/// Load an uploaded byte buffer of a known format.
pub fn load_bytes(bytes: &[u8], format: Format, schema: &DatasetSchema) -> Result<Table> {
    let table = match format {
        Format::Csv => load_csv(bytes, schema),
        Format::Json => load_json(bytes, schema),
        Format::Parquet => load_parquet(bytes, schema),
    }?;
    log::info!(
        "Loaded {} rows with columns {:?}",
        table.len(),
        table.column_names().collect::<Vec<_>>()
    );
    Ok(table)
}

/// Fetch a CSV dataset from a fixed URL.
#[cfg(feature = "remote")]
pub fn load_url(url: &str, schema: &DatasetSchema) -> Result<Table> {
    log::info!("Fetching dataset from {url}");
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let body = response.bytes()?;
    load_bytes(&body, Format::Csv, schema)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, then one row per record.
/// Cells start out as text and are typed by [`build_table`]. A row with
/// more fields than the header is malformed.
pub fn load_csv<R: Read>(reader: R, schema: &DatasetSchema) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    schema.validate_headers(&headers)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            Error::MalformedInput(format!("CSV row {}: {e}", row_no + 1))
        })?;
        if record.len() > headers.len() {
            return Err(Error::MalformedInput(format!(
                "CSV row {}: expected {} fields, saw {}",
                row_no + 1,
                headers.len(),
                record.len()
            )));
        }
        // Short rows are padded with nulls.
        let mut values: Vec<Value> = record.iter().map(|s| Value::Text(s.to_string())).collect();
        values.resize(headers.len(), Value::Null);
        rows.push(values);
    }

    build_table(headers, rows, schema)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Influencer ID": "INF001", "Platform": "TikTok", "Revenue ($)": 1200.5 },
///   ...
/// ]
/// ```
fn load_json(bytes: &[u8], schema: &DatasetSchema) -> Result<Table> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root
        .as_array()
        .ok_or_else(|| Error::MalformedInput("expected top-level JSON array".into()))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| Error::MalformedInput(format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    schema.validate_headers(&headers)?;

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    build_table(headers, rows, schema)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Parquet with one flat column per field. Nested columns fall back to
/// their display string.
fn load_parquet(data: &[u8], schema: &DatasetSchema) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::copy_from_slice(data))?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    schema.validate_headers(&headers)?;

    let reader = builder.build()?;
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect();
            rows.push(values);
        }
    }

    build_table(headers, rows, schema)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        _ => arrow::util::display::array_value_to_string(col, row)
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

// ---------------------------------------------------------------------------
// Typing
// ---------------------------------------------------------------------------

/// Give every column a kind (declared by the schema, otherwise inferred)
/// and coerce each cell to it. Cells that cannot be coerced become `Null`.
fn build_table(headers: Vec<String>, mut rows: Vec<Vec<Value>>, schema: &DatasetSchema) -> Result<Table> {
    let mut columns = Vec::with_capacity(headers.len());

    for (idx, name) in headers.into_iter().enumerate() {
        let name = name.trim().to_string();
        let kind = match schema.spec(&name) {
            Some(spec) => spec.kind,
            None => ColumnKind::infer(rows.iter().map(|r| &r[idx])),
        };

        let mut nulled = 0usize;
        for row in rows.iter_mut() {
            let cell = std::mem::replace(&mut row[idx], Value::Null);
            row[idx] = match cell.try_coerce(kind) {
                Some(v) => v,
                None => {
                    nulled += 1;
                    Value::Null
                }
            };
        }
        if nulled > 0 {
            log::debug!("column '{name}': {nulled} cell(s) not parseable as {kind}, set to null");
        }

        columns.push(Column { name, kind });
    }

    Table::new(columns, rows.into_iter().map(Record::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray, UInt32Array};
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;

    const CSV: &str = "\
Influencer ID,Platform,Product ID,Revenue ($),Cost ($),Sales Spike,Date,Notes
INF001,Instagram,101,1200.5,300,Yes,2024-01-01,ok
INF002,TikTok,102,n/a,150,No,garbage,
INF003,YouTube,101,800,0,True,01/03/2024,fine
";

    #[test]
    fn csv_columns_take_declared_kinds() {
        let table = load_csv(CSV.as_bytes(), &DatasetSchema::influencer()).unwrap();
        assert_eq!(table.len(), 3);

        let kind = |name: &str| table.columns[table.column_index(name).unwrap()].kind;
        assert_eq!(kind("Product ID"), ColumnKind::Text);
        assert_eq!(kind("Revenue ($)"), ColumnKind::Float);
        assert_eq!(kind("Sales Spike"), ColumnKind::Bool);
        assert_eq!(kind("Date"), ColumnKind::Date);
        assert_eq!(kind("Notes"), ColumnKind::Text);
    }

    #[test]
    fn malformed_cells_become_null() {
        let table = load_csv(CSV.as_bytes(), &DatasetSchema::influencer()).unwrap();
        let revenue = table.numeric("Revenue ($)").unwrap();
        assert_eq!(revenue, vec![Some(1200.5), None, Some(800.0)]);

        let dates: Vec<Value> = table.values("Date").unwrap().cloned().collect();
        assert_eq!(dates[0], Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(dates[1], Value::Null);
        assert_eq!(dates[2], Value::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
    }

    #[test]
    fn missing_required_columns_block_the_load() {
        let csv = "Influencer ID,Platform\nINF001,TikTok\n";
        let err = load_csv(csv.as_bytes(), &DatasetSchema::influencer()).unwrap_err();
        assert!(matches!(err, Error::MissingColumns(ref cols) if cols.len() == 3));
        assert!(err.is_blocking());
    }

    #[test]
    fn short_rows_are_padded_with_null() {
        let csv = "species,island,body_mass_g\nAdelie,Torgersen\n";
        let table = load_csv(csv.as_bytes(), &DatasetSchema::penguins()).unwrap();
        assert_eq!(table.numeric("body_mass_g").unwrap(), vec![None]);
    }

    #[test]
    fn rows_wider_than_the_header_are_malformed() {
        let csv = "Influencer ID,Platform,Product ID,Revenue ($),Cost ($)\nA,TikTok,1,100,10,EXTRA,999\n";
        let err = load_csv(csv.as_bytes(), &DatasetSchema::influencer()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(ref msg) if msg.contains("row 1")));
    }

    #[test]
    fn infinite_cells_are_neither_summed_nor_counted() {
        let csv = "Influencer ID,Platform,Product ID,Revenue ($),Cost ($)\nA,TikTok,1,inf,10\nA,TikTok,1,5,10\n";
        let table = load_csv(csv.as_bytes(), &DatasetSchema::influencer()).unwrap();
        assert_eq!(table.numeric("Revenue ($)").unwrap(), vec![None, Some(5.0)]);

        let spec = crate::analysis::aggregate::GroupSpec {
            key: "Influencer ID".into(),
            aggregations: vec![
                crate::analysis::aggregate::Aggregation::sum("Revenue ($)"),
                crate::analysis::aggregate::Aggregation::count("Revenue ($)"),
            ],
            ratio: None,
        };
        let groups = crate::analysis::aggregate::aggregate(&table, &spec).unwrap();
        assert_eq!(groups[0].values[0].as_f64(), Some(5.0));
        assert_eq!(groups[0].values[1].as_f64(), Some(1.0));
    }

    fn parquet_bytes(columns: Vec<(&str, ArrayRef)>) -> Vec<u8> {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        buf
    }

    #[test]
    fn parquet_columns_keep_kinds_and_nulls() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let epoch_days = |date: NaiveDate| (date - day(1970, 1, 1)).num_days() as i32;
        let bytes = parquet_bytes(vec![
            ("Influencer ID", Arc::new(StringArray::from(vec!["INF001", "INF002"])) as ArrayRef),
            ("Platform", Arc::new(StringArray::from(vec![Some("TikTok"), None])) as ArrayRef),
            ("Product ID", Arc::new(StringArray::from(vec!["101", "102"])) as ArrayRef),
            ("Revenue ($)", Arc::new(Float64Array::from(vec![Some(10.0), None])) as ArrayRef),
            ("Cost ($)", Arc::new(Float64Array::from(vec![2.5, 0.0])) as ArrayRef),
            (
                "Date",
                Arc::new(Date32Array::from(vec![Some(epoch_days(day(2024, 1, 1))), None])) as ArrayRef,
            ),
            // No dedicated branch: read through the display fallback.
            ("Followers", Arc::new(UInt32Array::from(vec![1200, 35])) as ArrayRef),
        ]);

        let table = load_bytes(&bytes, Format::Parquet, &DatasetSchema::influencer()).unwrap();
        assert_eq!(table.len(), 2);

        let kind = |name: &str| table.columns[table.column_index(name).unwrap()].kind;
        assert_eq!(kind("Platform"), ColumnKind::Text);
        assert_eq!(kind("Revenue ($)"), ColumnKind::Float);
        assert_eq!(kind("Date"), ColumnKind::Date);
        assert_eq!(kind("Followers"), ColumnKind::Integer);

        assert_eq!(table.numeric("Revenue ($)").unwrap(), vec![Some(10.0), None]);
        let platforms: Vec<Value> = table.values("Platform").unwrap().cloned().collect();
        assert_eq!(platforms, vec![Value::from("TikTok"), Value::Null]);
        let dates: Vec<Value> = table.values("Date").unwrap().cloned().collect();
        assert_eq!(dates, vec![Value::Date(day(2024, 1, 1)), Value::Null]);
        let followers: Vec<Value> = table.values("Followers").unwrap().cloned().collect();
        assert_eq!(followers, vec![Value::Integer(1200), Value::Integer(35)]);
    }

    #[test]
    fn parquet_missing_required_columns_block_the_load() {
        let bytes = parquet_bytes(vec![
            ("Influencer ID", Arc::new(StringArray::from(vec!["INF001"])) as ArrayRef),
            ("Platform", Arc::new(StringArray::from(vec!["TikTok"])) as ArrayRef),
        ]);
        let err = load_bytes(&bytes, Format::Parquet, &DatasetSchema::influencer()).unwrap_err();
        match err {
            Error::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Product ID", "Revenue ($)", "Cost ($)"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn json_records_load() {
        let json = r#"[
            {"species": "Adelie", "island": "Dream", "body_mass_g": 3700},
            {"species": "Gentoo", "island": "Biscoe", "body_mass_g": null, "sex": "female"}
        ]"#;
        let table = load_bytes(json.as_bytes(), Format::Json, &DatasetSchema::penguins()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.numeric("body_mass_g").unwrap(), vec![Some(3700.0), None]);
        let sex: Vec<Value> = table.values("sex").unwrap().cloned().collect();
        assert_eq!(sex, vec![Value::Null, Value::Text("female".into())]);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.CSV")).unwrap(), Format::Csv);
        assert_eq!(Format::from_path(Path::new("a.pq")).unwrap(), Format::Parquet);
        assert!(matches!(
            Format::from_path(Path::new("a.xlsx")),
            Err(Error::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }
}
