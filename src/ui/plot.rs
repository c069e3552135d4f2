use chrono::DateTime;
use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use crate::color::generate_palette;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Time-series line chart
// ---------------------------------------------------------------------------

fn format_time_mark(mark: GridMark, _range: &std::ops::RangeInclusive<f64>) -> String {
    DateTime::from_timestamp(mark.value as i64, 0)
        .map(|dt| dt.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// One line per selected column, x = work start.
pub fn time_series(ui: &mut Ui, state: &AppState) {
    Plot::new("time_series")
        .height(300.0)
        .legend(Legend::default())
        .x_axis_label("Work start")
        .x_axis_formatter(format_time_mark)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (column, points) in &state.view.series {
                let points: PlotPoints = points.iter().copied().collect();
                let line = Line::new(points)
                    .name(column.name())
                    .color(state.colors.color_for(column))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}

// ---------------------------------------------------------------------------
// Categorical distributions
// ---------------------------------------------------------------------------

/// Bar chart of row counts per label.
pub fn distribution(ui: &mut Ui, id: &str, x_label: &str, counts: &[(String, usize)]) {
    let palette = generate_palette(counts.len());
    let bars: Vec<Bar> = counts
        .iter()
        .zip(palette)
        .enumerate()
        .map(|(i, ((label, n), color))| {
            Bar::new(i as f64, *n as f64)
                .name(label)
                .width(0.7)
                .fill(color)
        })
        .collect();

    let labels: Vec<String> = counts.iter().map(|(l, _)| l.clone()).collect();

    Plot::new(id)
        .height(220.0)
        .x_axis_label(x_label)
        .y_axis_label("records")
        .x_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            labels.get(i as usize).cloned().unwrap_or_default()
        })
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(x_label));
        });
}

// ---------------------------------------------------------------------------
// Duration histogram
// ---------------------------------------------------------------------------

pub fn duration_histogram(ui: &mut Ui, state: &AppState) {
    let Some(hist) = &state.view.histogram else {
        ui.label("No records in the selected range.");
        return;
    };

    let bars: Vec<Bar> = hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &n)| Bar::new(hist.center(i), n as f64).width(hist.width))
        .collect();

    Plot::new("duration_histogram")
        .height(220.0)
        .x_axis_label("duration_minutes")
        .y_axis_label("records")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name("duration_minutes")
                    .color(Color32::LIGHT_BLUE),
            );
        });
}
