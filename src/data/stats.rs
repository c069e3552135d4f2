use std::collections::BTreeMap;

use super::model::{NormalizedTable, NumericColumn};

// ---------------------------------------------------------------------------
// Per-column summary statistics
// ---------------------------------------------------------------------------

/// `describe()`-style summary of one numeric column over a set of rows.
/// NaN cells are skipped; statistics of an empty column are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: NumericColumn,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); NaN below two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub fn compute(column: NumericColumn, table: &NormalizedTable, rows: &[usize]) -> Self {
        let mut values: Vec<f64> = rows
            .iter()
            .filter_map(|&i| table.records.get(i))
            .map(|r| column.value(r))
            .filter(|v| !v.is_nan())
            .collect();
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = if count == 0 {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / count as f64
        };
        let std = if count < 2 {
            f64::NAN
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };

        ColumnSummary {
            column,
            count,
            mean,
            std,
            min: values.first().copied().unwrap_or(f64::NAN),
            q25: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values.last().copied().unwrap_or(f64::NAN),
        }
    }
}

/// Linear-interpolated quantile of already sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

pub fn summarize(
    table: &NormalizedTable,
    rows: &[usize],
    columns: &[NumericColumn],
) -> Vec<ColumnSummary> {
    columns
        .iter()
        .map(|&c| ColumnSummary::compute(c, table, rows))
        .collect()
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// `[x, y]` points for a time-series line: x is work start in Unix seconds,
/// points are ordered by work start, NaN values are left out.
pub fn line_series(table: &NormalizedTable, rows: &[usize], column: NumericColumn) -> Vec<[f64; 2]> {
    let mut points: Vec<[f64; 2]> = rows
        .iter()
        .filter_map(|&i| table.records.get(i))
        .map(|r| [r.work_start.and_utc().timestamp() as f64, column.value(r)])
        .filter(|[_, y]| !y.is_nan())
        .collect();
    points.sort_by(|a, b| a[0].total_cmp(&b[0]));
    points
}

/// Row count per steel category label. Categories with no visible rows are
/// kept with a zero count so bar positions stay stable while filtering.
pub fn category_counts(table: &NormalizedTable, rows: &[usize]) -> Vec<(String, usize)> {
    let mut counts = vec![0usize; table.steel_categories.len()];
    for r in rows.iter().filter_map(|&i| table.records.get(i)) {
        if let Some(slot) = counts.get_mut(r.steel_category.0 as usize) {
            *slot += 1;
        }
    }
    table
        .steel_categories
        .labels()
        .iter()
        .cloned()
        .zip(counts)
        .collect()
}

/// Row count per work-group label, same zero-keeping rule as
/// [`category_counts`].
pub fn work_group_counts(table: &NormalizedTable, rows: &[usize]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = table
        .work_groups
        .iter()
        .map(|g| (g.as_str(), 0))
        .collect();
    for r in rows.iter().filter_map(|&i| table.records.get(i)) {
        *counts.entry(r.work_group.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect()
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width bins spanning their min..max.
    /// The last bin is closed on the right. A constant input is spread over
    /// `value ± 0.5`.
    pub fn of(values: &[f64], bins: usize) -> Option<Histogram> {
        let bins = bins.max(1);
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (mut lo, mut hi) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0usize; bins];
        for v in values.iter().filter(|v| v.is_finite()) {
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(Histogram {
            start: lo,
            width,
            counts,
        })
    }

    /// Center of bin `i`, for bar placement.
    pub fn center(&self, i: usize) -> f64 {
        self.start + self.width * (i as f64 + 0.5)
    }
}

pub fn duration_histogram(table: &NormalizedTable, rows: &[usize], bins: usize) -> Option<Histogram> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|&i| table.records.get(i))
        .map(|r| r.duration_minutes as f64)
        .collect();
    Histogram::of(&values, bins)
}
