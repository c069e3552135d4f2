use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::model::{
    self, duration_minutes, CategoryDict, CellValue, NormalizeReport, NormalizedTable, RawTable,
    Record, WorkGroup, REQUIRED_COLUMNS,
};
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do with records whose end timestamp precedes their start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeDurationPolicy {
    /// Pass the negative value through unchanged.
    #[default]
    Keep,
    /// Replace negative durations by zero.
    Clamp,
    /// Remove the record.
    Drop,
    /// Fail the load with a coercion error on the first offending row.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Upper bound on distinct steel categories.
    pub max_categories: usize,
    pub negative_durations: NegativeDurationPolicy,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_categories: 16,
            negative_durations: NegativeDurationPolicy::Keep,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization pipeline
// ---------------------------------------------------------------------------

/// Positions of the required columns in the raw header.
struct ColumnIndex {
    factory: usize,
    work_shape: usize,
    input_ed: usize,
    input_length: usize,
    input_qty: usize,
    direction_ed: usize,
    output_ed: usize,
    steel_category: usize,
    work_start: usize,
    work_end: usize,
}

impl ColumnIndex {
    fn resolve(raw: &RawTable, source: &Path) -> LoadResult<Self> {
        for column in REQUIRED_COLUMNS {
            if raw.column_index(column).is_none() {
                return Err(LoadError::Schema {
                    path: source.to_path_buf(),
                    column: column.to_string(),
                });
            }
        }
        // Every lookup below succeeds after the loop above.
        let at = |name: &str| raw.column_index(name).unwrap_or_default();
        Ok(ColumnIndex {
            factory: at(model::FACTORY),
            work_shape: at(model::WORK_SHAPE),
            input_ed: at(model::INPUT_ED),
            input_length: at(model::INPUT_LENGTH),
            input_qty: at(model::INPUT_QTY),
            direction_ed: at(model::DIRECTION_ED),
            output_ed: at(model::OUTPUT_ED),
            steel_category: at(model::STEEL_CATEGORY),
            work_start: at(model::WORK_START_DT),
            work_end: at(model::WORK_END_DT),
        })
    }
}

/// Turn a raw table into the immutable normalized table.
///
/// Steps run in a fixed order: schema check, per-column numeric widening,
/// steel-category coercion, work-group coercion, exact-duplicate removal,
/// timestamp parsing, numeric coercion, duration derivation,
/// negative-duration policy.
pub fn normalize(
    mut raw: RawTable,
    source: &Path,
    options: &NormalizeOptions,
) -> LoadResult<NormalizedTable> {
    let cols = ColumnIndex::resolve(&raw, source)?;
    raw.widen_numeric_columns();
    let rows_read = raw.rows.len();

    let extra: Vec<&String> = raw
        .headers
        .iter()
        .filter(|h| !REQUIRED_COLUMNS.contains(&h.as_str()))
        .collect();
    if !extra.is_empty() {
        log::debug!("Columns without a record field (dedup only): {extra:?}");
    }

    // ---- Categorical steel category ----
    let mut category_labels = Vec::with_capacity(rows_read);
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    for (i, row) in raw.rows.iter().enumerate() {
        let label = label_of(&row[cols.steel_category], i + 1, model::STEEL_CATEGORY)?;
        if distinct.insert(label.clone()) && distinct.len() > options.max_categories {
            return Err(LoadError::coercion(
                i + 1,
                model::STEEL_CATEGORY,
                &label,
                "a steel category (too many distinct labels)",
            ));
        }
        category_labels.push(label);
    }
    let steel_categories = CategoryDict::from_labels(distinct);

    // ---- Nominal work group ----
    let work_groups: Vec<WorkGroup> = raw
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| work_group_of(&row[cols.work_shape], i + 1))
        .collect::<LoadResult<_>>()?;

    // ---- Exact-duplicate removal, first occurrence wins ----
    let keep = first_occurrences(&raw.rows);
    let duplicates_dropped = rows_read - keep.len();

    // ---- Typed records ----
    let mut records = Vec::with_capacity(keep.len());
    let mut negative_durations = 0;
    let mut negative_adjusted = 0;

    for i in keep {
        let row = &raw.rows[i];
        let row_no = i + 1;

        let work_start = timestamp_of(&row[cols.work_start], row_no, model::WORK_START_DT)?;
        let work_end = timestamp_of(&row[cols.work_end], row_no, model::WORK_END_DT)?;

        let mut minutes = duration_minutes(work_start, work_end);
        if minutes < 0 {
            negative_durations += 1;
            match options.negative_durations {
                NegativeDurationPolicy::Keep => {}
                NegativeDurationPolicy::Clamp => {
                    minutes = 0;
                    negative_adjusted += 1;
                }
                NegativeDurationPolicy::Drop => {
                    negative_adjusted += 1;
                    continue;
                }
                NegativeDurationPolicy::Reject => {
                    return Err(LoadError::coercion(
                        row_no,
                        model::WORK_END_DT,
                        &row[cols.work_end],
                        "a timestamp not before WORK_START_DT",
                    ));
                }
            }
        }

        let steel_category = steel_categories
            .code_of(&category_labels[i])
            .unwrap_or_default();

        records.push(Record {
            factory: label_of(&row[cols.factory], row_no, model::FACTORY)?,
            work_group: work_groups[i].clone(),
            input_ed: number_of(&row[cols.input_ed], row_no, model::INPUT_ED)?,
            input_length: number_of(&row[cols.input_length], row_no, model::INPUT_LENGTH)?,
            input_qty: number_of(&row[cols.input_qty], row_no, model::INPUT_QTY)?,
            direction_ed: number_of(&row[cols.direction_ed], row_no, model::DIRECTION_ED)?,
            output_ed: number_of(&row[cols.output_ed], row_no, model::OUTPUT_ED)?,
            steel_category,
            work_start,
            work_end,
            duration_minutes: minutes,
        });
    }

    if negative_durations > 0 {
        log::warn!(
            "{negative_durations} record(s) end before they start (policy: {:?})",
            options.negative_durations
        );
    }

    let work_groups: BTreeSet<WorkGroup> = records.iter().map(|r| r.work_group.clone()).collect();

    Ok(NormalizedTable {
        source: source.to_path_buf(),
        columns: raw.headers,
        records,
        steel_categories,
        work_groups,
        report: NormalizeReport {
            rows_read,
            duplicates_dropped,
            negative_durations,
            negative_adjusted,
        },
    })
}

/// Indices of the first occurrence of every distinct row, in input order.
pub fn first_occurrences(rows: &[Vec<CellValue>]) -> Vec<usize> {
    let mut seen: HashSet<&[CellValue]> = HashSet::with_capacity(rows.len());
    rows.iter()
        .enumerate()
        .filter(|(_, row)| seen.insert(row.as_slice()))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Cell coercions
// ---------------------------------------------------------------------------

fn label_of(cell: &CellValue, row: usize, column: &str) -> LoadResult<String> {
    match cell {
        CellValue::Null => Err(LoadError::coercion(row, column, cell, "a label")),
        CellValue::Text(s) => Ok(s.trim().to_string()),
        other => Ok(other.to_string()),
    }
}

/// Shift codes arrive as 1/2/3, sometimes as `2.0` when the column went
/// through a float dtype; both read as the label `"2"`.
fn work_group_of(cell: &CellValue, row: usize) -> LoadResult<WorkGroup> {
    match cell {
        CellValue::Integer(i) => Ok(WorkGroup::new(i.to_string())),
        CellValue::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            Ok(WorkGroup::new((*f as i64).to_string()))
        }
        CellValue::Text(s) if !s.trim().is_empty() => Ok(WorkGroup::new(s.trim())),
        other => Err(LoadError::coercion(
            row,
            model::WORK_SHAPE,
            other,
            "a work-group code",
        )),
    }
}

/// Missing measurements read as NaN and are skipped by the statistics.
fn number_of(cell: &CellValue, row: usize, column: &str) -> LoadResult<f64> {
    match cell {
        CellValue::Null => Ok(f64::NAN),
        CellValue::Integer(i) => Ok(*i as f64),
        CellValue::Float(f) => Ok(*f),
        CellValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| LoadError::coercion(row, column, s, "a number")),
        CellValue::Bool(_) => Err(LoadError::coercion(row, column, cell, "a number")),
    }
}

fn timestamp_of(cell: &CellValue, row: usize, column: &str) -> LoadResult<NaiveDateTime> {
    let text = match cell {
        CellValue::Text(s) => s.trim().to_string(),
        // 20230101080000 style stamps read as integers
        CellValue::Integer(i) => i.to_string(),
        _ => return Err(LoadError::coercion(row, column, cell, "a timestamp")),
    };
    parse_timestamp(&text).ok_or_else(|| LoadError::coercion(row, column, &text, "a timestamp"))
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y%m%d%H%M%S",
];

/// Parse the date-time spellings found in factory exports.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CategoryCode, NumericColumn};

    const HEADER: &str = "FACTORY,WORK_SHAPE,INPUT_ED,INPUT_LENGTH,INPUT_QTY,DIRECTION_ED,OUTPUT_ED,STEEL_CATEGORY,WORK_START_DT,WORK_END_DT";

    fn raw_from(csv_text: &str) -> RawTable {
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let headers = reader.headers().unwrap().iter().map(String::from).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(CellValue::infer).collect())
            .collect();
        RawTable { headers, rows }
    }

    fn run(body: &str, options: &NormalizeOptions) -> LoadResult<NormalizedTable> {
        normalize(
            raw_from(&format!("{HEADER}\n{body}")),
            Path::new("test.csv"),
            options,
        )
    }

    fn run_default(body: &str) -> NormalizedTable {
        run(body, &NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn forty_five_minute_job() {
        let table = run_default(
            "F1,1,120.5,3000,10,110,110.2,CARBON,2023-01-01 08:00:00,2023-01-01 08:45:00\n",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].duration_minutes, 45);
    }

    #[test]
    fn duplicates_are_removed_keeping_first_order() {
        let table = run_default(
            "F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,2,130,3000,10,120,120,ALLOY,2023-01-01 09:00:00,2023-01-01 10:00:00\n\
             F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F2,3,140,3000,10,130,130,STS,2023-01-01 11:00:00,2023-01-01 11:10:00\n",
        );
        assert_eq!(table.report.rows_read, 4);
        assert_eq!(table.report.duplicates_dropped, 1);
        let durations: Vec<i64> = table.records.iter().map(|r| r.duration_minutes).collect();
        assert_eq!(durations, [30, 60, 10]);
    }

    #[test]
    fn deduplication_is_idempotent() {
        let raw = raw_from(&format!(
            "{HEADER}\n\
             F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,120,3000,11,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n"
        ));
        let once: Vec<Vec<CellValue>> = first_occurrences(&raw.rows)
            .into_iter()
            .map(|i| raw.rows[i].clone())
            .collect();
        assert_eq!(once.len(), 2);
        assert_eq!(first_occurrences(&once), [0, 1]);
    }

    #[test]
    fn number_spellings_do_not_defeat_deduplication() {
        let table = run_default(
            "F1,1,120,3000,10,110,0.0,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,120.0,3000,10,110,-0.0,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,121.5,3000,10,110,0.0,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
        );
        assert_eq!(table.report.duplicates_dropped, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].input_ed, 120.0);
        assert_eq!(table.records[1].input_ed, 121.5);
    }

    #[test]
    fn rows_differing_in_extra_columns_both_survive() {
        let raw = raw_from(&format!(
            "{HEADER},NOTE\n\
             F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00,a\n\
             F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00,b\n"
        ));
        let table = normalize(raw, Path::new("t.csv"), &NormalizeOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn missing_steel_category_is_a_schema_error() {
        let raw = raw_from(
            "FACTORY,WORK_SHAPE,INPUT_ED,INPUT_LENGTH,INPUT_QTY,DIRECTION_ED,OUTPUT_ED,WORK_START_DT,WORK_END_DT\n\
             F1,1,120,3000,10,110,110,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
        );
        let err = normalize(raw, Path::new("t.csv"), &NormalizeOptions::default()).unwrap_err();
        match err {
            LoadError::Schema { column, .. } => assert_eq!(column, "STEEL_CATEGORY"),
            other => panic!("expected schema error, got {other}"),
        }
    }

    #[test]
    fn unparseable_timestamp_is_a_coercion_error() {
        let err = run(
            "F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,120,3000,10,110,110,CARBON,yesterday,2023-01-01 08:30:00\n",
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        match err {
            LoadError::TypeCoercion { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "WORK_START_DT");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected coercion error, got {other}"),
        }
    }

    #[test]
    fn non_numeric_measurement_is_a_coercion_error() {
        let err = run(
            "F1,1,wide,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::TypeCoercion { ref column, .. } if column == "INPUT_ED"));
    }

    #[test]
    fn empty_measurement_reads_as_nan() {
        let table = run_default(
            "F1,1,,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
        );
        assert!(table.records[0].input_ed.is_nan());
    }

    #[test]
    fn work_group_is_a_label() {
        let table = run_default(
            "F1,2,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,2.0,121,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,122,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
        );
        let labels: Vec<&str> = table.work_groups.iter().map(WorkGroup::as_str).collect();
        assert_eq!(labels, ["1", "2"]);
        assert_eq!(table.records[1].work_group, WorkGroup::new("2"));
        assert!(NumericColumn::from_name("WORK_SHAPE").is_none());
    }

    #[test]
    fn steel_categories_become_codes() {
        let table = run_default(
            "F1,1,120,3000,10,110,110,STS,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,121,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
        );
        assert_eq!(table.steel_categories.labels(), ["CARBON", "STS"]);
        assert_eq!(table.records[0].steel_category, CategoryCode(1));
        assert_eq!(table.category_label(&table.records[1]), "CARBON");
    }

    #[test]
    fn too_many_categories_is_a_coercion_error() {
        let options = NormalizeOptions {
            max_categories: 2,
            ..NormalizeOptions::default()
        };
        let err = run(
            "F1,1,120,3000,10,110,110,A,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,120,3000,10,110,110,B,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
             F1,1,120,3000,10,110,110,C,2023-01-01 08:00:00,2023-01-01 08:30:00\n",
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::TypeCoercion { row: 3, .. }));
    }

    const BACKWARDS: &str =
        "F1,1,120,3000,10,110,110,CARBON,2023-01-01 08:00:00,2023-01-01 08:30:00\n\
         F1,1,121,3000,10,110,110,CARBON,2023-01-01 09:00:00,2023-01-01 08:50:00\n";

    fn with_policy(policy: NegativeDurationPolicy) -> NormalizeOptions {
        NormalizeOptions {
            negative_durations: policy,
            ..NormalizeOptions::default()
        }
    }

    #[test]
    fn negative_durations_kept_by_default() {
        let table = run_default(BACKWARDS);
        assert_eq!(table.records[1].duration_minutes, -10);
        assert_eq!(table.report.negative_durations, 1);
        assert_eq!(table.report.negative_adjusted, 0);
    }

    #[test]
    fn negative_durations_clamped() {
        let table = run(BACKWARDS, &with_policy(NegativeDurationPolicy::Clamp)).unwrap();
        assert_eq!(table.records[1].duration_minutes, 0);
        assert_eq!(table.report.negative_adjusted, 1);
    }

    #[test]
    fn negative_durations_dropped() {
        let table = run(BACKWARDS, &with_policy(NegativeDurationPolicy::Drop)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].duration_minutes, 30);
    }

    #[test]
    fn negative_durations_rejected() {
        let err = run(BACKWARDS, &with_policy(NegativeDurationPolicy::Reject)).unwrap_err();
        assert!(matches!(err, LoadError::TypeCoercion { row: 2, .. }));
    }

    #[test]
    fn timestamp_spellings() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        for s in [
            "2023-01-01 08:00:00",
            "2023-01-01T08:00:00",
            "2023-01-01 08:00:00.000",
            "2023/01/01 08:00:00",
            "2023-01-01 08:00",
            "20230101080000",
            "2023-01-01T08:00:00Z",
            "2023-01-01T17:00:00+09:00",
        ] {
            assert_eq!(parse_timestamp(s), Some(expected), "{s}");
        }
        assert_eq!(parse_timestamp("2023-01-01"), expected.date().and_hms_opt(0, 0, 0));
        assert_eq!(parse_timestamp("01/01/2023 8am"), None);
    }
}
