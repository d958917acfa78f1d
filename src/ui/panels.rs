use std::collections::BTreeSet;

use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use influence_dash::data::model::Value;
use influence_dash::data::schema::Variant;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Filter sidebar
// ---------------------------------------------------------------------------

/// Date range first, then one collapsible checkbox list per filter column.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = state.table.clone() else {
        ui.label("Open a dataset to filter it.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some((first, last)) = state.date_bounds() {
                date_range_widget(ui, state, first, last);
                ui.separator();
            }
            for &col in &state.schema.roles.filters.clone() {
                if let Some(observed) = table.unique_values.get(col) {
                    filter_group(ui, state, col, observed);
                }
            }
        });
}

fn filter_group(ui: &mut Ui, state: &mut AppState, col: &str, observed: &BTreeSet<Value>) {
    let accepted = state.selection.accepted.get(col);
    let shown = accepted.map_or(observed.len(), |s| s.intersection(observed).count());
    let title = RichText::new(format!("{col}  ({shown}/{})", observed.len())).strong();
    let colored = col == state.schema.roles.group_key;

    egui::CollapsingHeader::new(title)
        .id_salt(col)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(col);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(col);
                }
            });

            for value in observed {
                let mut on = state
                    .selection
                    .accepted
                    .get(col)
                    .map_or(true, |s| s.contains(value));
                let label = match (&state.color_map, colored) {
                    (Some(cm), true) => RichText::new(value.to_string()).color(cm.color_for(value)),
                    _ => RichText::new(value.to_string()),
                };
                if ui.checkbox(&mut on, label).changed() {
                    state.toggle_filter_value(col, value);
                }
            }
        });
}

fn date_range_widget(ui: &mut Ui, state: &mut AppState, first: NaiveDate, last: NaiveDate) {
    ui.strong("Date range");
    let (mut start, mut end) = state
        .selection
        .date_range
        .as_ref()
        .map_or((first, last), |r| (r.start, r.end));

    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("From");
        changed |= ui
            .add(egui_extras::DatePickerButton::new(&mut start).id_salt("date_from"))
            .changed();
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("To");
        changed |= ui
            .add(egui_extras::DatePickerButton::new(&mut end).id_salt("date_to"))
            .changed();
    });
    if changed {
        state.set_date_range(Some((start, end)));
    }
    if state.selection.date_range.is_some() && ui.small_button("All dates").clicked() {
        state.set_date_range(None);
    }
}

// ---------------------------------------------------------------------------
// Menu bar
// ---------------------------------------------------------------------------

/// File menu, dataset layout picker and load status.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                ui.close_menu();
                open_file_dialog(state);
            }
            let can_export = state.view.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                ui.close_menu();
                export_dialog(state);
            }
        });

        ui.separator();

        let current = state.schema.variant;
        egui::ComboBox::from_id_salt("variant")
            .selected_text(current.label())
            .show_ui(ui, |ui: &mut Ui| {
                for variant in Variant::ALL {
                    if ui.selectable_label(current == variant, variant.label()).clicked() {
                        state.set_variant(variant);
                    }
                }
            });

        ui.separator();

        if let (Some(table), Some(view)) = (&state.table, &state.view) {
            ui.label(format!(
                "{} rows loaded, {} visible",
                table.len(),
                view.filtered.len()
            ));
        }
        if let Some(label) = &state.source_label {
            ui.weak(label);
        }

        if let Some(err) = &state.status_message {
            ui.colored_label(Color32::RED, err);
        }
    });
}

// ---------------------------------------------------------------------------
// Native dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let picked = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter("Datasets", &["csv", "json", "parquet", "pq"])
        .pick_file();
    if let Some(path) = picked {
        state.load_path(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let target = rfd::FileDialog::new()
        .set_title("Export filtered rows")
        .set_file_name("filtered_influencer_data.csv")
        .add_filter("CSV", &["csv"])
        .save_file();
    if let Some(path) = target {
        state.export_filtered(&path);
    }
}
