use std::path::Path;
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::{ViewerConfig, MAX_BINS, MIN_BINS};
use crate::data::cache::TableCache;
use crate::data::filter::{duration_bounds, DurationRange};
use crate::data::model::{NormalizedTable, NumericColumn};
use crate::view::{build_view, ViewModel, ViewSelection};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: ViewerConfig,

    /// Load-once tables keyed by source file version.
    cache: TableCache,

    /// Current normalized table (None until a file loads).
    pub table: Option<Arc<NormalizedTable>>,

    /// Slider bounds of the current table.
    pub bounds: Option<DurationRange>,

    /// Widget selections.
    pub selection: ViewSelection,

    /// Derived view for the current selection (cached).
    pub view: ViewModel,

    /// One colour per numeric column, shared by metrics and line chart.
    pub colors: ColorMap<NumericColumn>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        let selection = ViewSelection {
            columns: config.initial_columns().into_iter().collect(),
            range: DurationRange::new(0, 0),
            bins: config.bins(),
        };
        Self {
            cache: TableCache::new(config.normalize_options()),
            config,
            table: None,
            bounds: None,
            selection,
            view: ViewModel::default(),
            colors: ColorMap::new(&NumericColumn::ALL),
            status_message: None,
        }
    }

    /// Load (or fetch from cache) the table at `path` and show it.
    /// On failure the current table stays in place and the error becomes
    /// the status message.
    pub fn load_path(&mut self, path: &Path) {
        match self.cache.get_or_load(path) {
            Ok(table) => {
                log::debug!("{} table(s) cached", self.cache.len());
                self.set_table(table);
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Drop the cached table for the current source and load it again.
    pub fn reload(&mut self) {
        if let Some(source) = self.table.as_ref().map(|t| t.source.clone()) {
            self.cache.invalidate(&source);
            self.load_path(&source);
        }
    }

    /// Install a table, reset the slider to its bounds and rebuild the view.
    /// A table without records has no bounds and an empty range.
    pub fn set_table(&mut self, table: Arc<NormalizedTable>) {
        self.bounds = duration_bounds(&table);
        self.selection.range = self.bounds.unwrap_or(DurationRange::new(0, 0));
        self.status_message = None;
        self.table = Some(table);
        self.refresh();
    }

    /// Recompute the view after a selection change.
    pub fn refresh(&mut self) {
        self.view = match &self.table {
            Some(table) => build_view(table, &self.selection),
            None => ViewModel::default(),
        };
    }

    pub fn toggle_column(&mut self, column: NumericColumn) {
        if !self.selection.columns.remove(&column) {
            self.selection.columns.insert(column);
        }
        self.refresh();
    }

    pub fn select_all_columns(&mut self) {
        self.selection.columns = NumericColumn::ALL.into_iter().collect();
        self.refresh();
    }

    pub fn select_no_columns(&mut self) {
        self.selection.columns.clear();
        self.refresh();
    }

    pub fn set_range(&mut self, range: DurationRange) {
        if self.selection.range != range {
            self.selection.range = range;
            self.refresh();
        }
    }

    /// Put the slider back on the full bounds.
    pub fn reset_range(&mut self) {
        if let Some(bounds) = self.bounds {
            self.set_range(bounds);
        }
    }

    pub fn set_bins(&mut self, bins: usize) {
        let bins = bins.clamp(MIN_BINS, MAX_BINS);
        if self.selection.bins != bins {
            self.selection.bins = bins;
            self.refresh();
        }
    }
}
