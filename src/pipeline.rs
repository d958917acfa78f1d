//! One interaction cycle: filter the loaded table, then derive every view
//! the dashboard shows from the filtered copy.
//!
//! Each section is its own `Result`, so a failure (say, too few days for a
//! decomposition) leaves the other sections intact.

use crate::analysis::aggregate::{self, Aggregation, DerivedRatio, GroupSpec, GroupSummary};
use crate::analysis::correlation::{self, CorrelationMatrix};
use crate::analysis::decompose::{self, DecompositionResult};
use crate::analysis::metrics::{self, PortfolioMetrics};
use crate::config::AnalysisConfig;
use crate::data::filter::{self, FilterSelection};
use crate::data::model::{Table, Value};
use crate::data::schema::DatasetSchema;
use crate::error::Result;

/// Everything the presentation layer renders for one selection.
#[derive(Debug)]
pub struct DashboardView {
    pub filtered: Table,
    pub summary_spec: GroupSpec,
    pub summary: Result<Vec<GroupSummary>>,
    /// Measure total per group key, ascending.
    pub ranking: Result<Vec<(Value, f64)>>,
    pub metrics: Result<PortfolioMetrics>,
    /// ROI vs engagement points, when the dataset has both.
    pub scatter: Option<Result<Vec<[f64; 2]>>>,
    pub correlation: Result<CorrelationMatrix>,
    /// `None` when the dataset has no date column.
    pub decomposition: Option<Result<DecompositionResult>>,
}

/// Group summary layout for `schema`, restricted to columns `table` has.
///
/// The measure and cost sums come first so the ROI ratio can refer to
/// them by position.
pub fn summary_spec(table: &Table, schema: &DatasetSchema, roi_scale: f64) -> GroupSpec {
    let roles = &schema.roles;
    let present = |col: Option<&'static str>| col.filter(|c| table.has_column(c));
    let mut aggregations = vec![Aggregation::sum(roles.measure)];
    let mut ratio = None;

    if let Some(cost) = present(roles.cost) {
        aggregations.push(Aggregation::sum(cost));
        ratio = Some(DerivedRatio {
            name: "ROI (%)".to_string(),
            numerator: 0,
            denominator: 1,
            scale: roi_scale,
        });
    } else {
        aggregations.push(Aggregation::mean(roles.measure));
    }
    if let Some(engagement) = present(roles.engagement) {
        aggregations.push(Aggregation::mean(engagement));
    }
    aggregations.push(Aggregation::count(roles.measure));
    if let Some(spike) = present(roles.spike) {
        aggregations.push(Aggregation::any_true(spike));
    }

    GroupSpec {
        key: roles.group_key.to_string(),
        aggregations,
        ratio,
    }
}

/// Run the whole pipeline for one selection. `table` is only read.
pub fn compute(
    table: &Table,
    schema: &DatasetSchema,
    selection: &FilterSelection,
    options: &AnalysisConfig,
) -> DashboardView {
    let filtered = filter::apply(table, selection);
    let roles = &schema.roles;
    let has = |col: Option<&'static str>| col.filter(|c| filtered.has_column(c));

    let summary_spec = summary_spec(&filtered, schema, options.roi_scale);
    let summary = aggregate::aggregate(&filtered, &summary_spec);
    let ranking = aggregate::ranking(&filtered, roles.group_key, roles.measure);
    let metrics = metrics::portfolio(&filtered, schema, options.roi_scale);

    let scatter = match (has(roles.engagement), has(roles.roi)) {
        (Some(x), Some(y)) => Some(metrics::scatter_points(&filtered, x, y)),
        _ => None,
    };

    let corr_columns: Vec<&str> = roles
        .correlation
        .iter()
        .copied()
        .filter(|c| filtered.has_column(c))
        .collect();
    let correlation = correlation::correlation_matrix(&filtered, &corr_columns);

    let decomposition = has(roles.date).map(|date| {
        decompose::daily_totals(&filtered, date, roles.measure)
            .and_then(|series| decompose::decompose(&series, options.seasonal_period))
    });

    let view = DashboardView {
        filtered,
        summary_spec,
        summary,
        ranking,
        metrics,
        scatter,
        correlation,
        decomposition,
    };
    view.log_failures();
    view
}

impl DashboardView {
    fn log_failures(&self) {
        let sections: [(&str, Option<&crate::error::Error>); 5] = [
            ("summary", self.summary.as_ref().err()),
            ("ranking", self.ranking.as_ref().err()),
            ("metrics", self.metrics.as_ref().err()),
            ("correlation", self.correlation.as_ref().err()),
            (
                "decomposition",
                self.decomposition.as_ref().and_then(|d| d.as_ref().err()),
            ),
        ];
        for (name, err) in sections {
            if let Some(err) = err {
                log::warn!("{name} section skipped: {err}");
            }
        }
    }
}
