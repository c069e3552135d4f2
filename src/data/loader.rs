use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType,
};
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable};
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read a record file into an untyped [`RawTable`]. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one job per line (primary format)
/// * `.parquet` – one column per field, any scalar Arrow type
/// * `.json`    – `[{ "FACTORY": .., "WORK_SHAPE": .., ... }, ...]`
pub fn load_raw(path: &Path) -> LoadResult<RawTable> {
    if !path.is_file() {
        return Err(LoadError::data_load(path, "file not found"));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => Err(LoadError::data_load(
            path,
            format!("unsupported file extension: .{other}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> LoadResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| LoadError::data_load(path, format!("opening CSV: {e}")))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::data_load(path, format!("reading CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::data_load(path, "CSV has no header row"));
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| LoadError::data_load(path, format!("CSV row {}: {e}", row_no + 1)))?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
/// Keys absent from a record read as null.
fn load_json(path: &Path) -> LoadResult<RawTable> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LoadError::data_load(path, format!("reading JSON file: {e}")))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| LoadError::data_load(path, format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::data_load(path, "expected top-level JSON array"))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::data_load(path, format!("record {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Timestamp columns, naive or zoned,
/// are rendered as UTC wall-clock text; date columns go through Arrow's text
/// cast. Both are parsed later like CSV text.
fn load_parquet(path: &Path) -> LoadResult<RawTable> {
    let file = std::fs::File::open(path)
        .map_err(|e| LoadError::data_load(path, format!("opening parquet file: {e}")))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| LoadError::data_load(path, format!("reading parquet metadata: {e}")))?;

    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let reader = builder
        .build()
        .map_err(|e| LoadError::data_load(path, format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| LoadError::data_load(path, format!("reading record batch: {e}")))?;

        let columns = batch
            .columns()
            .iter()
            .map(|col| as_readable(col).map_err(|e| LoadError::data_load(path, e)))
            .collect::<LoadResult<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| extract_cell(col, row)).collect());
        }
    }

    Ok(RawTable { headers, rows })
}

// -- Parquet / Arrow helpers --

/// Cast columns `extract_cell` has no direct reader for to UTF-8.
fn as_readable(col: &Arc<dyn Array>) -> Result<Arc<dyn Array>, String> {
    match col.data_type() {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Boolean => Ok(Arc::clone(col)),
        DataType::Timestamp(unit, _) => Ok(timestamps_as_text(col, *unit)),
        other => cast(col.as_ref(), &DataType::Utf8)
            .map_err(|e| format!("cannot read {other:?} column as text: {e}")),
    }
}

/// Arrow stores zoned timestamps as UTC ticks, so the zone name never has
/// to be resolved: ticks become UTC wall-clock text directly.
fn timestamps_as_text(col: &Arc<dyn Array>, unit: TimeUnit) -> Arc<dyn Array> {
    let ticks: Vec<Option<i64>> = match unit {
        TimeUnit::Second => col.as_primitive::<TimestampSecondType>().iter().collect(),
        TimeUnit::Millisecond => col.as_primitive::<TimestampMillisecondType>().iter().collect(),
        TimeUnit::Microsecond => col.as_primitive::<TimestampMicrosecondType>().iter().collect(),
        TimeUnit::Nanosecond => col.as_primitive::<TimestampNanosecondType>().iter().collect(),
    };
    let text: StringArray = ticks
        .into_iter()
        .map(|t| {
            t.and_then(|t| utc_from_ticks(t, unit))
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        })
        .collect();
    Arc::new(text)
}

fn utc_from_ticks(ticks: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let utc = match unit {
        TimeUnit::Second => DateTime::from_timestamp(ticks, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(ticks),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(ticks),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(ticks)),
    };
    utc.map(|dt| dt.naive_utc())
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => match any.downcast_ref::<StringArray>() {
            Some(s) => CellValue::Text(s.value(row).to_string()),
            None => CellValue::Null,
        },
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64))
            .unwrap_or(CellValue::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64))
            .unwrap_or(CellValue::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row)))
            .unwrap_or(CellValue::Null),
        _ => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_cells_are_typed_by_inference() {
        let file = temp_with(".csv", "A,B,C\n1,2.5,x\n,3,y\n");
        let raw = load_raw(file.path()).unwrap();
        assert_eq!(raw.headers, ["A", "B", "C"]);
        assert_eq!(
            raw.rows[0],
            [
                CellValue::Integer(1),
                CellValue::Float(2.5),
                CellValue::Text("x".into())
            ]
        );
        assert_eq!(raw.rows[1][0], CellValue::Null);
    }

    #[test]
    fn missing_file_is_a_data_load_error() {
        let err = load_raw(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::DataLoad { .. }));
    }

    #[test]
    fn ragged_csv_is_a_data_load_error() {
        let file = temp_with(".csv", "A,B\n1,2\n3\n");
        let err = load_raw(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::DataLoad { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = temp_with(".xlsx", "whatever");
        let err = load_raw(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported file extension"));
    }

    #[test]
    fn json_records_fill_missing_keys_with_null() {
        let file = temp_with(
            ".json",
            r#"[{"A": 1, "B": "x"}, {"A": 2.5}]"#,
        );
        let raw = load_raw(file.path()).unwrap();
        assert_eq!(raw.headers, ["A", "B"]);
        assert_eq!(raw.rows[1], [CellValue::Float(2.5), CellValue::Null]);
    }

    fn utc(h: u32, m: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// Two jobs; the end stamps carry a named zone, the extra column an
    /// offset zone.
    fn parquet_file() -> NamedTempFile {
        use arrow::array::{ArrayRef, TimestampMillisecondArray, TimestampSecondArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let secs = |dt: NaiveDateTime| dt.and_utc().timestamp();
        let starts = [utc(8, 0), utc(9, 0)];
        let ends = [utc(8, 45), utc(9, 30)];

        fn column(name: &'static str, array: ArrayRef) -> (&'static str, ArrayRef) {
            (name, array)
        }
        let columns = vec![
            column("FACTORY", Arc::new(StringArray::from(vec!["P1", "P2"]))),
            column("WORK_SHAPE", Arc::new(Int64Array::from(vec![1, 2]))),
            column("INPUT_ED", Arc::new(Float64Array::from(vec![Some(120.5), None]))),
            column("INPUT_LENGTH", Arc::new(Float64Array::from(vec![3000.0, 3100.0]))),
            column("INPUT_QTY", Arc::new(Int32Array::from(vec![10, 12]))),
            column("DIRECTION_ED", Arc::new(Float64Array::from(vec![110.0, 115.0]))),
            column("OUTPUT_ED", Arc::new(Float64Array::from(vec![110.2, 115.3]))),
            column("STEEL_CATEGORY", Arc::new(StringArray::from(vec!["CARBON", "STS"]))),
            column(
                "WORK_START_DT",
                Arc::new(TimestampSecondArray::from(starts.map(secs).to_vec())),
            ),
            column(
                "WORK_END_DT",
                Arc::new(TimestampSecondArray::from(ends.map(secs).to_vec()).with_timezone("UTC")),
            ),
            column(
                "END_LOCAL",
                Arc::new(
                    TimestampMillisecondArray::from(ends.map(|e| secs(e) * 1000).to_vec())
                        .with_timezone("+09:00"),
                ),
            ),
        ];

        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, col)| Field::new(*name, col.data_type().clone(), true))
                .collect::<Vec<_>>(),
        ));
        let batch =
            RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, c)| c).collect())
                .unwrap();

        let mut file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.as_file_mut(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        file
    }

    #[test]
    fn parquet_cells_keep_their_arrow_types() {
        let file = parquet_file();
        let raw = load_raw(file.path()).unwrap();
        assert_eq!(raw.headers.len(), 11);
        assert_eq!(raw.headers[0], "FACTORY");
        assert_eq!(raw.headers[10], "END_LOCAL");

        let row = &raw.rows[0];
        assert_eq!(row[0], CellValue::Text("P1".into()));
        assert_eq!(row[1], CellValue::Integer(1));
        assert_eq!(row[2], CellValue::Float(120.5));
        assert_eq!(row[4], CellValue::Integer(10));
        assert_eq!(raw.rows[1][2], CellValue::Null);
    }

    #[test]
    fn parquet_timestamps_read_as_utc_text() {
        let file = parquet_file();
        let raw = load_raw(file.path()).unwrap();
        let row = &raw.rows[0];
        assert_eq!(row[8], CellValue::Text("2023-01-01 08:00:00".into()));
        assert_eq!(row[9], CellValue::Text("2023-01-01 08:45:00".into()));
        assert_eq!(row[10], CellValue::Text("2023-01-01 08:45:00".into()));
    }

    #[test]
    fn zoned_parquet_file_normalizes() {
        use crate::data::normalize::{normalize, NormalizeOptions};

        let file = parquet_file();
        let raw = load_raw(file.path()).unwrap();
        let table = normalize(raw, file.path(), &NormalizeOptions::default()).unwrap();
        let durations: Vec<i64> = table.records.iter().map(|r| r.duration_minutes).collect();
        assert_eq!(durations, [45, 30]);
        assert_eq!(table.records[1].work_end, utc(9, 30));
        assert!(table.records[1].input_ed.is_nan());
    }

    #[test]
    fn json_must_be_an_array() {
        let file = temp_with(".json", r#"{"A": 1}"#);
        assert!(matches!(
            load_raw(file.path()),
            Err(LoadError::DataLoad { .. })
        ));
    }
}
