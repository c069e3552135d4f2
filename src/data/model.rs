use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// Column names of the process-record file
// ---------------------------------------------------------------------------

pub const FACTORY: &str = "FACTORY";
pub const WORK_SHAPE: &str = "WORK_SHAPE";
pub const INPUT_ED: &str = "INPUT_ED";
pub const INPUT_LENGTH: &str = "INPUT_LENGTH";
pub const INPUT_QTY: &str = "INPUT_QTY";
pub const DIRECTION_ED: &str = "DIRECTION_ED";
pub const OUTPUT_ED: &str = "OUTPUT_ED";
pub const STEEL_CATEGORY: &str = "STEEL_CATEGORY";
pub const WORK_START_DT: &str = "WORK_START_DT";
pub const WORK_END_DT: &str = "WORK_END_DT";
pub const DURATION_MINUTES: &str = "duration_minutes";

/// Columns that must be present in every source file, in file order.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    FACTORY,
    WORK_SHAPE,
    INPUT_ED,
    INPUT_LENGTH,
    INPUT_QTY,
    DIRECTION_ED,
    OUTPUT_ED,
    STEEL_CATEGORY,
    WORK_START_DT,
    WORK_END_DT,
];

// ---------------------------------------------------------------------------
// CellValue – a single raw cell before normalization
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as read from the source file.
///
/// Raw rows are compared cell by cell for duplicate removal, so `CellValue`
/// is `Eq + Hash`. Floats compare by `total_cmp` and hash by bit pattern
/// after folding `-0.0` into `0.0` and every NaN into one NaN, which keeps
/// the two consistent (NaN equals NaN, as pandas treats it).
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn rank(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Text(a), Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => canonical(*f).to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

fn canonical(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else if f.is_nan() {
        f64::NAN
    } else {
        f
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Infer a cell type from CSV text the way a default pandas read does.
    pub fn infer(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        match s {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::Text(s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – header plus untyped rows, straight from a loader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Give every column one numeric dtype: a column holding only numbers
    /// and nulls, at least one of them a float, becomes all floats. Text
    /// spellings `120` and `120.0` then read as the same value.
    pub fn widen_numeric_columns(&mut self) {
        for col in 0..self.headers.len() {
            let cells = || self.rows.iter().filter_map(move |row| row.get(col));
            let numeric = cells().all(|c| {
                matches!(
                    c,
                    CellValue::Null | CellValue::Integer(_) | CellValue::Float(_)
                )
            });
            let has_float = cells().any(|c| matches!(c, CellValue::Float(_)));
            if !(numeric && has_float) {
                continue;
            }
            for row in &mut self.rows {
                if let Some(cell) = row.get_mut(col) {
                    if let CellValue::Integer(i) = *cell {
                        *cell = CellValue::Float(i as f64);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Nominal and categorical labels
// ---------------------------------------------------------------------------

/// Shift / crew label. Stored numerically at the source (1, 2, 3) but
/// nominal: it is ordered for display only and never summed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkGroup(String);

impl WorkGroup {
    pub fn new(label: impl Into<String>) -> Self {
        WorkGroup(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a [`CategoryDict`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryCode(pub u16);

/// Sorted dictionary of the labels observed in a categorical column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDict {
    labels: Vec<String>,
}

impl CategoryDict {
    pub fn from_labels<I: IntoIterator<Item = String>>(labels: I) -> Self {
        let labels: BTreeSet<String> = labels.into_iter().collect();
        CategoryDict {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn code_of(&self, label: &str) -> Option<CategoryCode> {
        self.labels
            .binary_search_by(|l| l.as_str().cmp(label))
            .ok()
            .map(|i| CategoryCode(i as u16))
    }

    pub fn label(&self, code: CategoryCode) -> &str {
        self.labels
            .get(code.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Record – one normalized row
// ---------------------------------------------------------------------------

/// One manufacturing job after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub factory: String,
    pub work_group: WorkGroup,
    /// Input outer diameter (mm).
    pub input_ed: f64,
    /// Individual input piece length (mm).
    pub input_length: f64,
    pub input_qty: f64,
    /// Target outer diameter after machining (mm).
    pub direction_ed: f64,
    /// Produced outer diameter (mm).
    pub output_ed: f64,
    pub steel_category: CategoryCode,
    pub work_start: NaiveDateTime,
    pub work_end: NaiveDateTime,
    /// Whole minutes between start and end, floored.
    pub duration_minutes: i64,
}

/// `floor((end - start) seconds / 60)`.
pub fn duration_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_seconds().div_euclid(60)
}

// ---------------------------------------------------------------------------
// NumericColumn – the columns the view can summarize and chart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericColumn {
    InputEd,
    InputLength,
    InputQty,
    DirectionEd,
    OutputEd,
    DurationMinutes,
}

impl NumericColumn {
    /// Candidate list offered by the column multi-select.
    pub const ALL: [NumericColumn; 6] = [
        NumericColumn::InputEd,
        NumericColumn::InputLength,
        NumericColumn::InputQty,
        NumericColumn::DirectionEd,
        NumericColumn::OutputEd,
        NumericColumn::DurationMinutes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::InputEd => INPUT_ED,
            NumericColumn::InputLength => INPUT_LENGTH,
            NumericColumn::InputQty => INPUT_QTY,
            NumericColumn::DirectionEd => DIRECTION_ED,
            NumericColumn::OutputEd => OUTPUT_ED,
            NumericColumn::DurationMinutes => DURATION_MINUTES,
        }
    }

    pub fn from_name(name: &str) -> Option<NumericColumn> {
        NumericColumn::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn value(self, record: &Record) -> f64 {
        match self {
            NumericColumn::InputEd => record.input_ed,
            NumericColumn::InputLength => record.input_length,
            NumericColumn::InputQty => record.input_qty,
            NumericColumn::DirectionEd => record.direction_ed,
            NumericColumn::OutputEd => record.output_ed,
            NumericColumn::DurationMinutes => record.duration_minutes as f64,
        }
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// NormalizedTable – the immutable, load-once dataset
// ---------------------------------------------------------------------------

/// Counters collected while normalizing, shown in the status bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub negative_durations: usize,
    /// Rows removed or clamped by the negative-duration policy.
    pub negative_adjusted: usize,
}

/// The normalized dataset. Never mutated after construction; shared as
/// `Arc<NormalizedTable>` between the cache and the view.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub source: PathBuf,
    /// Header of the source file, in file order.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub steel_categories: CategoryDict,
    pub work_groups: BTreeSet<WorkGroup>,
    pub report: NormalizeReport,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn category_label(&self, record: &Record) -> &str {
        self.steel_categories.label(record.steel_category)
    }
}
