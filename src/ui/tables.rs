use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use influence_dash::analysis::aggregate::{GroupSpec, GroupSummary};
use influence_dash::analysis::correlation::CorrelationMatrix;
use influence_dash::data::model::Table;

use crate::color::{correlation_color, ColorMap};

const ROW_HEIGHT: f32 = 20.0;

// ---------------------------------------------------------------------------
// Group summary
// ---------------------------------------------------------------------------

pub fn summary_table(ui: &mut Ui, spec: &GroupSpec, groups: &[GroupSummary], colors: Option<&ColorMap>) {
    let ratio_name = spec.ratio.as_ref().map(|r| r.name.as_str());
    let n_cols = 2 + spec.aggregations.len() + usize::from(ratio_name.is_some());

    TableBuilder::new(ui)
        .id_salt("summary_table")
        .striped(true)
        .vscroll(true)
        .max_scroll_height(280.0)
        .columns(Column::auto().at_least(70.0).resizable(true), n_cols)
        .header(ROW_HEIGHT, |mut header| {
            header.col(|ui| {
                ui.strong(&spec.key);
            });
            header.col(|ui| {
                ui.strong("rows");
            });
            for agg in &spec.aggregations {
                header.col(|ui| {
                    ui.strong(agg.label());
                });
            }
            if let Some(name) = ratio_name {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, groups.len(), |mut row| {
                let g = &groups[row.index()];
                row.col(|ui| {
                    let mut text = RichText::new(g.key.to_string());
                    if let Some(c) = colors {
                        text = text.color(c.color_for(&g.key));
                    }
                    ui.label(text);
                });
                row.col(|ui| {
                    ui.label(g.rows.to_string());
                });
                for v in &g.values {
                    row.col(|ui| {
                        ui.label(v.to_string());
                    });
                }
                if let Some(r) = g.ratio {
                    row.col(|ui| {
                        ui.label(format!("{r:.2}"));
                    });
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Filtered rows
// ---------------------------------------------------------------------------

pub fn data_table(ui: &mut Ui, table: &Table) {
    TableBuilder::new(ui)
        .id_salt("data_table")
        .striped(true)
        .vscroll(true)
        .max_scroll_height(360.0)
        .columns(Column::auto().at_least(60.0).resizable(true), table.columns.len())
        .header(ROW_HEIGHT, |mut header| {
            for col in &table.columns {
                header.col(|ui| {
                    ui.strong(&col.name).on_hover_text(col.kind.to_string());
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, table.len(), |mut row| {
                let record = &table.rows[row.index()];
                for value in &record.values {
                    row.col(|ui| {
                        if value.is_null() {
                            ui.weak("null");
                        } else {
                            ui.label(value.to_string());
                        }
                    });
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Correlation heat grid
// ---------------------------------------------------------------------------

pub fn correlation_grid(ui: &mut Ui, matrix: &CorrelationMatrix) {
    egui::Grid::new("correlation_grid")
        .spacing([6.0, 4.0])
        .show(ui, |ui| {
            ui.label("");
            for name in &matrix.columns {
                ui.strong(name);
            }
            ui.end_row();

            for (i, name) in matrix.columns.iter().enumerate() {
                ui.strong(name);
                for j in 0..matrix.len() {
                    let r = matrix.get(i, j);
                    let text = r.map(|r| format!("{r:+.2}")).unwrap_or_else(|| "n/a".to_string());
                    let fill = correlation_color(r);
                    let ink = if r.map_or(false, |r| r.abs() > 0.6) {
                        Color32::WHITE
                    } else {
                        Color32::BLACK
                    };
                    ui.label(RichText::new(format!(" {text} ")).monospace().background_color(fill).color(ink));
                }
                ui.end_row();
            }
        });
}
