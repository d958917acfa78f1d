//! Plain-text and JSON renderings of a [`DashboardView`] for headless use.

use std::fmt;

use serde::Serialize;
use serde_json::json;

use crate::data::schema::DatasetSchema;
use crate::error::Result;
use crate::pipeline::DashboardView;

const TOP_GROUPS: usize = 10;

fn section_json<T: Serialize>(section: &Result<T>) -> serde_json::Value {
    match section {
        Ok(v) => serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// The view as one JSON document. Failed sections become
/// `{"error": "..."}`.
pub fn to_json(view: &DashboardView, schema: &DatasetSchema) -> serde_json::Value {
    json!({
        "dataset": schema.title,
        "rows": view.filtered.len(),
        "metrics": section_json(&view.metrics),
        "summary_columns": view
            .summary_spec
            .aggregations
            .iter()
            .map(|a| a.label())
            .collect::<Vec<_>>(),
        "summary": section_json(&view.summary),
        "ranking": section_json(&view.ranking),
        "correlation": section_json(&view.correlation),
        "decomposition": view.decomposition.as_ref().map(section_json),
    })
}

/// Human-readable summary for the terminal.
pub fn render_text(view: &DashboardView, schema: &DatasetSchema) -> String {
    TextReport { view, schema }.to_string()
}

/// Plain-text rendering of a view, one block per dashboard section.
pub struct TextReport<'a> {
    pub view: &'a DashboardView,
    pub schema: &'a DatasetSchema,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} rows", self.schema.title, self.view.filtered.len())?;
        writeln!(f)?;
        self.metrics(f)?;
        writeln!(f)?;
        self.groups(f)?;
        writeln!(f)?;
        self.correlation(f)?;
        self.seasonality(f)
    }
}

impl TextReport<'_> {
    fn metrics(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles = &self.schema.roles;
        writeln!(f, "Key metrics")?;
        let m = match &self.view.metrics {
            Ok(m) => m,
            Err(e) => return writeln!(f, "  unavailable: {e}"),
        };
        writeln!(f, "  Total {}: {:.2}", roles.measure, m.total_measure)?;
        if let Some(cost) = m.total_cost {
            writeln!(f, "  Total cost: {cost:.2}")?;
        }
        if let Some(roi) = m.blended_roi {
            writeln!(f, "  Blended ROI (%): {roi:.2}")?;
        }
        if let Some(avg) = m.average_roi {
            writeln!(f, "  Average ROI (%): {avg:.2}")?;
        }
        if let Some(top) = &m.top_performer {
            writeln!(f, "  Top {}: {top}", roles.group_key)?;
        }
        if let Some(p) = m.spikes.and_then(|s| s.proportion()) {
            writeln!(f, "  Sales spikes: {:.1}%", p * 100.0)?;
        }
        Ok(())
    }

    fn groups(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.schema.roles.group_key;
        let spec = &self.view.summary_spec;
        writeln!(f, "By {key}")?;
        let groups = match &self.view.summary {
            Ok(groups) if groups.is_empty() => return writeln!(f, "  (no rows)"),
            Ok(groups) => groups,
            Err(e) => return writeln!(f, "  unavailable: {e}"),
        };

        let header: Vec<String> = spec.aggregations.iter().map(|a| a.label()).collect();
        write!(f, "  {key} | {}", header.join(" | "))?;
        if let Some(ratio) = &spec.ratio {
            write!(f, " | {}", ratio.name)?;
        }
        writeln!(f)?;

        for g in groups.iter().take(TOP_GROUPS) {
            let cells: Vec<String> = g.values.iter().map(|v| v.to_string()).collect();
            write!(f, "  {} | {}", g.key, cells.join(" | "))?;
            if let Some(r) = g.ratio {
                write!(f, " | {r:.2}")?;
            }
            writeln!(f)?;
        }
        if groups.len() > TOP_GROUPS {
            writeln!(f, "  … {} more", groups.len() - TOP_GROUPS)?;
        }
        Ok(())
    }

    fn correlation(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Correlation")?;
        let m = match &self.view.correlation {
            Ok(m) => m,
            Err(e) => return writeln!(f, "  unavailable: {e}"),
        };
        for (i, name) in m.columns.iter().enumerate() {
            write!(f, "  {name:<22}")?;
            for j in 0..m.len() {
                match m.get(i, j) {
                    Some(r) => write!(f, "{r:>6.2} ")?,
                    None => write!(f, "{:>6} ", "–")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn seasonality(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(decomposition) = &self.view.decomposition else {
            return Ok(());
        };
        writeln!(f)?;
        writeln!(f, "Seasonality")?;
        match decomposition {
            Ok(d) => {
                write!(f, "  {} days, period {}:", d.dates.len(), d.period)?;
                for factor in d.seasonal_factors() {
                    write!(f, " {factor:.3}")?;
                }
                writeln!(f)
            }
            Err(e) => writeln!(f, "  skipped: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::data::filter::FilterSelection;
    use crate::data::loader::load_csv;
    use crate::pipeline::compute;

    const CSV: &str = "\
Influencer ID,Platform,Product ID,Revenue ($),Cost ($),Date
A,TikTok,1,100,0,2024-01-01
B,Instagram,1,200,100,2024-01-02
";

    fn view() -> (DashboardView, DatasetSchema) {
        let schema = DatasetSchema::influencer();
        let table = load_csv(CSV.as_bytes(), &schema).unwrap();
        let view = compute(&table, &schema, &FilterSelection::default(), &AnalysisConfig::default());
        (view, schema)
    }

    #[test]
    fn text_report_mentions_each_section() {
        let (view, schema) = view();
        let text = render_text(&view, &schema);
        assert!(text.contains("Total Revenue ($): 300.00"));
        assert!(text.contains("Blended ROI (%): 300.00"));
        assert!(text.contains("Top Influencer ID: B"));
        assert!(text.contains("skipped: insufficient data"));
    }

    #[test]
    fn sections_come_out_in_dashboard_order() {
        let (view, schema) = view();
        let text = render_text(&view, &schema);
        let at = |needle: &str| text.find(needle).unwrap();
        assert!(at("Key metrics") < at("By Influencer ID"));
        assert!(at("By Influencer ID") < at("Correlation"));
        assert!(at("Correlation") < at("Seasonality"));
        assert!(text.contains("  Influencer ID | "));
    }

    /// Sink that accepts a fixed number of bytes, then fails.
    struct Truncating(usize);

    impl fmt::Write for Truncating {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0 = self.0.checked_sub(s.len()).ok_or(fmt::Error)?;
            Ok(())
        }
    }

    #[test]
    fn write_errors_surface_instead_of_being_dropped() {
        use std::fmt::Write as _;

        let (view, schema) = view();
        let report = TextReport { view: &view, schema: &schema };
        assert!(write!(Truncating(40), "{report}").is_err());
        assert!(write!(Truncating(usize::MAX), "{report}").is_ok());
    }

    #[test]
    fn json_report_marks_failed_sections() {
        let (view, schema) = view();
        let doc = to_json(&view, &schema);
        assert_eq!(doc["rows"], 2);
        assert_eq!(doc["summary"][0]["key"], "B");
        assert!(doc["decomposition"]["error"].is_string());
    }
}
