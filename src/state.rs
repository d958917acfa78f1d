use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use influence_dash::config::DashConfig;
use influence_dash::data::cache::LoadCache;
use influence_dash::data::export;
use influence_dash::data::filter::{DateRange, FilterSelection};
use influence_dash::data::model::{Table, Value};
use influence_dash::data::schema::{DatasetSchema, Variant};
use influence_dash::pipeline::{self, DashboardView};
use influence_dash::Error;

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashConfig,
    pub schema: DatasetSchema,
    pub cache: LoadCache,

    /// Loaded table (None until the user loads a file). Shared read-only;
    /// every refresh filters a copy.
    pub table: Option<Arc<Table>>,

    /// Where the table came from, for the top bar.
    pub source_label: Option<String>,

    /// Per-column filter selections.
    pub selection: FilterSelection,

    /// Views derived from the current selection (cached until it changes).
    pub view: Option<DashboardView>,

    /// Colours per group key.
    pub color_map: Option<ColorMap>,

    /// Blocking warning shown instead of the dashboard.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashConfig) -> Self {
        let schema = DatasetSchema::for_variant(config.data.variant);
        Self {
            config,
            schema,
            cache: LoadCache::new(),
            table: None,
            source_label: None,
            selection: FilterSelection::default(),
            view: None,
            color_map: None,
            status_message: None,
        }
    }

    /// Ingest a newly loaded table, initialise filters and colours.
    pub fn set_table(&mut self, table: Arc<Table>, label: String) {
        self.selection = FilterSelection::all_observed(&table, &self.schema.roles.filters);
        self.color_map = table
            .unique_values
            .get(self.schema.roles.group_key)
            .map(ColorMap::new);
        self.table = Some(table);
        self.source_label = Some(label);
        self.status_message = None;
        self.refresh();
    }

    fn load_failed(&mut self, err: Error) {
        log::error!("Failed to load dataset: {err}");
        self.status_message = Some(format!("Error: {err}"));
        if err.is_blocking() {
            self.table = None;
            self.view = None;
        }
    }

    /// Load a local file through the content cache.
    pub fn load_path(&mut self, path: &Path) {
        match self.cache.load_file(path, &self.schema) {
            Ok(table) => self.set_table(table, path.display().to_string()),
            Err(e) => self.load_failed(e),
        }
    }

    #[cfg(feature = "remote")]
    pub fn load_url(&mut self, url: &str) {
        match influence_dash::data::loader::load_url(url, &self.schema) {
            Ok(table) => self.set_table(Arc::new(table), url.to_string()),
            Err(e) => self.load_failed(e),
        }
    }

    /// Load `source` as a URL when it looks like one, as a path otherwise.
    pub fn load_source(&mut self, source: &str) {
        if source.starts_with("http://") || source.starts_with("https://") {
            #[cfg(feature = "remote")]
            self.load_url(source);
            #[cfg(not(feature = "remote"))]
            {
                self.status_message = Some("Error: built without URL support".to_string());
            }
        } else {
            self.load_path(Path::new(source));
        }
    }

    /// Switch dataset layout. The loaded table, the load cache and any
    /// load error are dropped: they belong to the previous schema.
    pub fn set_variant(&mut self, variant: Variant) {
        if variant == self.schema.variant {
            return;
        }
        self.schema = DatasetSchema::for_variant(variant);
        self.config.data.variant = variant;
        self.table = None;
        self.view = None;
        self.source_label = None;
        self.color_map = None;
        self.selection = FilterSelection::default();
        self.status_message = None;
        // Entries parsed under the old layout are never hit again.
        self.cache.clear();
    }

    /// Recompute every view from the current selection.
    pub fn refresh(&mut self) {
        self.view = self.table.as_ref().map(|table| {
            pipeline::compute(table, &self.schema, &self.selection, &self.config.analysis)
        });
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) {
        let selected = self.selection.accepted.entry(column.to_string()).or_default();
        if selected.contains(value) {
            selected.remove(value);
        } else {
            selected.insert(value.clone());
        }
        self.refresh();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(table) = &self.table {
            if let Some(all_vals) = table.unique_values.get(column) {
                self.selection
                    .accepted
                    .insert(column.to_string(), all_vals.clone());
                self.refresh();
            }
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.selection
            .accepted
            .insert(column.to_string(), BTreeSet::new());
        self.refresh();
    }

    /// Observed date span of the date column, if the table has one.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let column = self.schema.roles.date?;
        let dates = self.table.as_ref()?.unique_values.get(column)?;
        let mut iter = dates.iter().filter_map(Value::as_date);
        let first = iter.next()?;
        let last = iter.last().unwrap_or(first);
        Some((first, last))
    }

    pub fn set_date_range(&mut self, range: Option<(NaiveDate, NaiveDate)>) {
        self.selection.date_range = match (range, self.schema.roles.date) {
            (Some((start, end)), Some(column)) => Some(DateRange {
                column: column.to_string(),
                start: start.min(end),
                end: start.max(end),
            }),
            _ => None,
        };
        self.refresh();
    }

    /// Write the filtered rows as CSV.
    pub fn export_filtered(&mut self, path: &Path) {
        let Some(view) = &self.view else { return };
        if let Err(e) = export::write_csv_file(&view.filtered, path) {
            log::error!("Export failed: {e}");
            self.status_message = Some(format!("Export failed: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Influencer ID,Platform,Product ID,Revenue ($),Cost ($),Date
A,TikTok,1,100,0,2024-01-01
B,Instagram,1,200,100,2024-01-05
";

    fn loaded() -> AppState {
        let mut state = AppState::new(DashConfig::default());
        let table = influence_dash::data::loader::load_csv(CSV.as_bytes(), &state.schema).unwrap();
        state.set_table(Arc::new(table), "test".into());
        state
    }

    #[test]
    fn filters_drive_the_view() {
        let mut state = loaded();
        assert_eq!(state.view.as_ref().unwrap().filtered.len(), 2);

        state.toggle_filter_value("Platform", &Value::from("TikTok"));
        assert_eq!(state.view.as_ref().unwrap().filtered.len(), 1);

        state.select_none("Platform");
        assert_eq!(state.view.as_ref().unwrap().filtered.len(), 0);

        state.select_all("Platform");
        assert_eq!(state.view.as_ref().unwrap().filtered.len(), 2);
    }

    #[test]
    fn date_bounds_and_range() {
        let mut state = loaded();
        let (first, last) = state.date_bounds().unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());

        state.set_date_range(Some((last, last)));
        assert_eq!(state.view.as_ref().unwrap().filtered.len(), 1);
    }

    #[test]
    fn switching_variant_clears_error_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaign.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut state = AppState::new(DashConfig::default());
        state.load_path(&path);
        assert_eq!(state.cache.len(), 1);
        state.load_path(Path::new("/definitely/not/here.csv"));
        assert!(state.status_message.is_some());

        state.set_variant(Variant::Penguins);
        assert!(state.status_message.is_none());
        assert!(state.cache.is_empty());
        assert!(state.table.is_none());
    }

    #[test]
    fn missing_file_is_a_blocking_warning() {
        let mut state = loaded();
        state.load_path(Path::new("/definitely/not/here.csv"));
        assert!(state.status_message.is_some());
        assert!(state.table.is_none());
    }
}
