use std::collections::BTreeSet;

use crate::data::filter::{filtered_indices, DurationRange};
use crate::data::model::{NormalizedTable, NumericColumn};
use crate::data::stats::{self, ColumnSummary, Histogram};

// ---------------------------------------------------------------------------
// Widget selections → view model
// ---------------------------------------------------------------------------

/// Current state of the filter widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSelection {
    /// Numeric columns picked in the multi-select.
    pub columns: BTreeSet<NumericColumn>,
    /// Duration slider position.
    pub range: DurationRange,
    /// Histogram bin count.
    pub bins: usize,
}

/// Non-fatal conditions shown instead of (part of) the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewWarning {
    /// Every column was deselected; summaries and line charts are skipped.
    EmptySelection,
}

impl ViewWarning {
    pub fn message(self) -> &'static str {
        match self {
            ViewWarning::EmptySelection => "Select at least one column",
        }
    }
}

/// Everything the panels draw, derived from the table and the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewModel {
    /// Indices of records passing the duration filter.
    pub rows: Vec<usize>,
    pub summaries: Vec<ColumnSummary>,
    pub series: Vec<(NumericColumn, Vec<[f64; 2]>)>,
    pub category_counts: Vec<(String, usize)>,
    pub work_group_counts: Vec<(String, usize)>,
    pub histogram: Option<Histogram>,
    pub warnings: Vec<ViewWarning>,
}

/// Evaluate the view for one selection. Reads the table, never changes it.
pub fn build_view(table: &NormalizedTable, selection: &ViewSelection) -> ViewModel {
    let rows = filtered_indices(table, selection.range);

    let mut view = ViewModel {
        category_counts: stats::category_counts(table, &rows),
        work_group_counts: stats::work_group_counts(table, &rows),
        histogram: stats::duration_histogram(table, &rows, selection.bins),
        ..ViewModel::default()
    };

    if selection.columns.is_empty() {
        log::warn!("No column selected; skipping summaries");
        view.warnings.push(ViewWarning::EmptySelection);
    } else {
        let columns: Vec<NumericColumn> = selection.columns.iter().copied().collect();
        view.summaries = stats::summarize(table, &rows, &columns);
        view.series = columns
            .iter()
            .map(|&c| (c, stats::line_series(table, &rows, c)))
            .collect();
    }

    view.rows = rows;
    view
}
