use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::NumericColumn;
use crate::data::stats::ColumnSummary;
use crate::state::AppState;

fn fmt_stat(v: f64) -> String {
    if v.is_nan() {
        "–".to_string()
    } else {
        format!("{v:.2}")
    }
}

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

/// Headline mean per selected column, four to a row.
pub fn metric_cards(ui: &mut Ui, state: &AppState) {
    for chunk in state.view.summaries.chunks(4) {
        ui.columns(4, |cols: &mut [Ui]| {
            for (col_ui, summary) in cols.iter_mut().zip(chunk) {
                col_ui.label(
                    RichText::new(summary.column.name())
                        .color(state.colors.color_for(&summary.column)),
                );
                col_ui.label(RichText::new(fmt_stat(summary.mean)).heading());
                col_ui.label(
                    RichText::new(format!(
                        "{} – {}  (n = {})",
                        fmt_stat(summary.min),
                        fmt_stat(summary.max),
                        summary.count
                    ))
                    .small()
                    .weak(),
                );
            }
        });
        ui.add_space(6.0);
    }
}

/// Full `describe()` grid.
pub fn summary_grid(ui: &mut Ui, summaries: &[ColumnSummary]) {
    egui::Grid::new("summary_grid")
        .striped(true)
        .num_columns(9)
        .show(ui, |ui: &mut Ui| {
            for h in ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
                ui.strong(h);
            }
            ui.end_row();

            for s in summaries {
                ui.label(s.column.name());
                ui.label(s.count.to_string());
                for v in [s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max] {
                    ui.label(fmt_stat(v));
                }
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Record table
// ---------------------------------------------------------------------------

/// Filtered records with label columns, selected numeric columns and the
/// duration.
pub fn record_table(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        return;
    };
    let columns: Vec<NumericColumn> = state
        .selection
        .columns
        .iter()
        .copied()
        .filter(|c| *c != NumericColumn::DurationMinutes)
        .collect();
    let rows = &state.view.rows;

    TableBuilder::new(ui)
        .striped(true)
        .max_scroll_height(320.0)
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .columns(Column::auto(), columns.len())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            let mut head = |text: &str| {
                header.col(|ui| {
                    ui.strong(text);
                });
            };
            head("FACTORY");
            head("WORK_SHAPE");
            head("STEEL_CATEGORY");
            for c in &columns {
                head(c.name());
            }
            head("WORK_START_DT");
            head("WORK_END_DT");
            head("duration_minutes");
        })
        .body(|body| {
            body.rows(18.0, rows.len(), |mut row| {
                let Some(record) = rows.get(row.index()).and_then(|&i| table.records.get(i))
                else {
                    return;
                };
                row.col(|ui| {
                    ui.label(&record.factory);
                });
                row.col(|ui| {
                    ui.label(record.work_group.as_str());
                });
                row.col(|ui| {
                    ui.label(table.category_label(record));
                });
                for c in &columns {
                    row.col(|ui| {
                        ui.label(fmt_stat(c.value(record)));
                    });
                }
                row.col(|ui| {
                    ui.label(record.work_start.to_string());
                });
                row.col(|ui| {
                    ui.label(record.work_end.to_string());
                });
                row.col(|ui| {
                    ui.label(record.duration_minutes.to_string());
                });
            });
        });
}
