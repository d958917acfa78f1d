use chrono::{Days, NaiveDate};
use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, HLine, Legend, Line, Plot, Points};

use influence_dash::analysis::decompose::DecompositionResult;
use influence_dash::analysis::metrics::SpikeBreakdown;
use influence_dash::data::model::Value;

use crate::color::ColorMap;

const PLOT_HEIGHT: f32 = 260.0;
const NO_SPIKE: Color32 = Color32::from_rgb(144, 238, 144);
const SPIKE: Color32 = Color32::from_rgb(255, 99, 71);

// ---------------------------------------------------------------------------
// Measure by group (horizontal bars)
// ---------------------------------------------------------------------------

/// Horizontal bar per group key, smallest at the bottom.
pub fn ranking_chart(ui: &mut Ui, ranking: &[(Value, f64)], colors: Option<&ColorMap>, measure: &str) {
    let labels: Vec<String> = ranking.iter().map(|(k, _)| k.to_string()).collect();
    let bars: Vec<Bar> = ranking
        .iter()
        .enumerate()
        .map(|(i, (key, total))| {
            let fill = colors.map(|c| c.color_for(key)).unwrap_or(Color32::LIGHT_BLUE);
            Bar::new(i as f64, *total).name(key).fill(fill)
        })
        .collect();

    let height = (ranking.len() as f32 * 22.0).clamp(PLOT_HEIGHT * 0.6, PLOT_HEIGHT * 2.0);
    Plot::new("ranking_chart")
        .height(height)
        .x_axis_label(measure)
        .allow_scroll(false)
        .y_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().width(0.7));
        });
}

// ---------------------------------------------------------------------------
// ROI vs engagement (scatter)
// ---------------------------------------------------------------------------

pub fn scatter_plot(ui: &mut Ui, points: &[[f64; 2]], x_label: &str, y_label: &str) {
    Plot::new("roi_scatter")
        .height(PLOT_HEIGHT)
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            let pts = Points::new(points.to_vec())
                .radius(3.0)
                .color(Color32::from_rgb(255, 165, 0).gamma_multiply(0.7));
            plot_ui.points(pts);
        });
}

// ---------------------------------------------------------------------------
// Spike proportion
// ---------------------------------------------------------------------------

pub fn spike_chart(ui: &mut Ui, spikes: &SpikeBreakdown) {
    let total = (spikes.spike + spikes.no_spike).max(1) as f64;
    let share = |n: usize| 100.0 * n as f64 / total;
    let bars = vec![
        Bar::new(0.0, share(spikes.no_spike))
            .name(format!("No Spike ({})", spikes.no_spike))
            .fill(NO_SPIKE),
        Bar::new(1.0, share(spikes.spike))
            .name(format!("Spike ({})", spikes.spike))
            .fill(SPIKE),
    ];
    Plot::new("spike_chart")
        .height(PLOT_HEIGHT * 0.7)
        .y_axis_label("% of records")
        .include_y(100.0)
        .allow_scroll(false)
        .legend(Legend::default())
        .x_axis_formatter(|mark, _range| match mark.value.round() as i64 {
            0 if mark.value.fract() == 0.0 => "No Spike".to_string(),
            1 if mark.value.fract() == 0.0 => "Spike".to_string(),
            _ => String::new(),
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).width(0.6));
        });
}

// ---------------------------------------------------------------------------
// Seasonal decomposition (stacked line plots)
// ---------------------------------------------------------------------------

fn day_offset(start: NaiveDate, date: NaiveDate) -> f64 {
    (date - start).num_days() as f64
}

fn date_formatter(start: NaiveDate) -> impl Fn(egui_plot::GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        if mark.value < 0.0 || mark.value.fract() != 0.0 {
            return String::new();
        }
        start
            .checked_add_days(Days::new(mark.value as u64))
            .map(|d| d.format("%b %d").to_string())
            .unwrap_or_default()
    }
}

/// Contiguous runs of defined values, so undefined edges leave gaps.
fn segments(start: NaiveDate, dates: &[NaiveDate], values: &[Option<f64>]) -> Vec<Vec<[f64; 2]>> {
    let mut out: Vec<Vec<[f64; 2]>> = Vec::new();
    let mut current = Vec::new();
    for (d, v) in dates.iter().zip(values) {
        match v {
            Some(v) => current.push([day_offset(start, *d), *v]),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn component_plot(ui: &mut Ui, id: &str, title: &str, start: NaiveDate, runs: Vec<Vec<[f64; 2]>>, color: Color32, unit_line: bool) {
    ui.label(title);
    Plot::new(id)
        .height(PLOT_HEIGHT * 0.55)
        .allow_scroll(false)
        .x_axis_formatter(date_formatter(start))
        .show(ui, |plot_ui| {
            if unit_line {
                plot_ui.hline(HLine::new(1.0).color(Color32::DARK_GRAY));
            }
            for run in runs {
                plot_ui.line(Line::new(run).color(color).width(1.5));
            }
        });
}

pub fn decomposition_plots(ui: &mut Ui, d: &DecompositionResult) {
    let Some(&start) = d.dates.first() else {
        return;
    };
    let observed: Vec<Option<f64>> = d.observed.iter().copied().map(Some).collect();
    let seasonal: Vec<Option<f64>> = d.seasonal.iter().copied().map(Some).collect();

    component_plot(ui, "decomp_observed", "Observed", start, segments(start, &d.dates, &observed), Color32::LIGHT_BLUE, false);
    component_plot(ui, "decomp_trend", "Trend", start, segments(start, &d.dates, &d.trend), Color32::GOLD, false);
    component_plot(ui, "decomp_seasonal", "Seasonal", start, segments(start, &d.dates, &seasonal), Color32::LIGHT_GREEN, true);
    component_plot(ui, "decomp_residual", "Residual", start, segments(start, &d.dates, &d.residual), Color32::LIGHT_RED, true);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_split_on_gaps() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = start.iter_days().take(5).collect();
        let values = [None, Some(1.0), Some(2.0), None, Some(4.0)];
        let runs = segments(start, &dates, &values);
        assert_eq!(runs, vec![vec![[1.0, 1.0], [2.0, 2.0]], vec![[4.0, 4.0]]]);
    }
}
