use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use influence_dash::analysis::metrics::PortfolioMetrics;
use influence_dash::config::DashConfig;
use influence_dash::pipeline::DashboardView;

use crate::state::AppState;
use crate::ui::{panels, plot, tables};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(config: DashConfig) -> Self {
        let mut state = AppState::new(config);
        if let Some(source) = state.config.data.source.clone() {
            state.load_source(&source);
        }
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: dashboard ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| dashboard(ui, &self.state));
        });
    }
}

fn dashboard(ui: &mut Ui, state: &AppState) {
    ui.heading(state.schema.title);

    let Some(view) = &state.view else {
        ui.add_space(40.0);
        match &state.status_message {
            Some(msg) => {
                ui.label(RichText::new(msg).color(Color32::RED).size(16.0));
                ui.label("Fix the file or pick another one from File → Open.");
            }
            None => {
                ui.label("Load a CSV, JSON or Parquet file from File → Open.");
            }
        }
        return;
    };

    if view.filtered.is_empty() {
        ui.label(RichText::new("No rows match the current filters.").italics());
    }

    section(ui, "Key metrics", |ui| kpi_row(ui, view, state));
    section(ui, "Measure by group", |ui| match &view.ranking {
        Ok(ranking) => plot::ranking_chart(
            ui,
            ranking,
            state.color_map.as_ref(),
            state.schema.roles.measure,
        ),
        Err(e) => skipped(ui, e),
    });

    if let (Some(scatter), Some(x), Some(y)) = (
        &view.scatter,
        state.schema.roles.engagement,
        state.schema.roles.roi,
    ) {
        section(ui, "ROI vs engagement", |ui| match scatter {
            Ok(points) => plot::scatter_plot(ui, points, x, y),
            Err(e) => skipped(ui, e),
        });
    }

    if let Ok(PortfolioMetrics {
        spikes: Some(spikes),
        ..
    }) = &view.metrics
    {
        section(ui, "Sales spikes", |ui| plot::spike_chart(ui, spikes));
    }

    section(ui, "Group summary", |ui| match &view.summary {
        Ok(groups) => tables::summary_table(ui, &view.summary_spec, groups, state.color_map.as_ref()),
        Err(e) => skipped(ui, e),
    });

    if let Some(decomposition) = &view.decomposition {
        section(ui, "Weekly seasonality", |ui| match decomposition {
            Ok(d) => plot::decomposition_plots(ui, d),
            Err(e) => skipped(ui, e),
        });
    }

    section(ui, "Correlation", |ui| match &view.correlation {
        Ok(matrix) if !matrix.is_empty() => tables::correlation_grid(ui, matrix),
        Ok(_) => {
            ui.weak("No numeric columns to correlate.");
        }
        Err(e) => skipped(ui, e),
    });

    section(ui, "Filtered rows", |ui| tables::data_table(ui, &view.filtered));
}

fn section(ui: &mut Ui, title: &str, add_contents: impl FnOnce(&mut Ui)) {
    ui.add_space(12.0);
    ui.separator();
    ui.strong(title);
    ui.add_space(4.0);
    add_contents(ui);
}

fn skipped(ui: &mut Ui, err: &influence_dash::Error) {
    ui.label(RichText::new(format!("Skipped: {err}")).color(Color32::YELLOW));
}

fn kpi_row(ui: &mut Ui, view: &DashboardView, state: &AppState) {
    let metrics = match &view.metrics {
        Ok(m) => m,
        Err(e) => return skipped(ui, e),
    };
    let mut cards: Vec<(String, String)> = vec![
        ("Rows".to_string(), metrics.rows.to_string()),
        (
            format!("Total {}", state.schema.roles.measure),
            format!("{:.2}", metrics.total_measure),
        ),
    ];
    if let Some(cost) = metrics.total_cost {
        cards.push(("Total cost".to_string(), format!("{cost:.2}")));
    }
    if let Some(roi) = metrics.blended_roi {
        cards.push(("Blended ROI (%)".to_string(), format!("{roi:.2}")));
    }
    if let Some(avg) = metrics.average_roi {
        cards.push(("Average ROI (%)".to_string(), format!("{avg:.2}")));
    }
    if let Some(top) = &metrics.top_performer {
        cards.push(("Top performer".to_string(), top.to_string()));
    }
    if let Some(share) = metrics.spikes.and_then(|s| s.proportion()) {
        cards.push(("Spike share".to_string(), format!("{:.1}%", share * 100.0)));
    }

    ui.columns(cards.len(), |columns| {
        for (col, (label, value)) in columns.iter_mut().zip(cards) {
            egui::Frame::group(col.style()).show(col, |ui| {
                ui.weak(label);
                ui.label(RichText::new(value).size(20.0).strong());
            });
        }
    });
}
