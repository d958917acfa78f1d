use serde::Serialize;

use super::ratio::safe_ratio;
use crate::data::model::{Table, Value};
use crate::data::schema::DatasetSchema;
use crate::error::Result;

/// Headline numbers for the KPI panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub rows: usize,
    /// Sum of the measure column (total revenue).
    pub total_measure: f64,
    pub total_cost: Option<f64>,
    /// Total measure over total cost, scaled; 0 when cost is 0.
    pub blended_roi: Option<f64>,
    /// Mean of the per-row ROI column.
    pub average_roi: Option<f64>,
    /// Group key of the single row with the largest measure.
    pub top_performer: Option<Value>,
    pub spikes: Option<SpikeBreakdown>,
}

/// Spike / no-spike record counts. Null flags are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpikeBreakdown {
    pub spike: usize,
    pub no_spike: usize,
}

impl SpikeBreakdown {
    /// Share of flagged records, or `None` when nothing was flagged either way.
    pub fn proportion(&self) -> Option<f64> {
        let total = self.spike + self.no_spike;
        (total > 0).then(|| self.spike as f64 / total as f64)
    }
}

/// Sum of non-null values.
pub fn column_total(table: &Table, column: &str) -> Result<f64> {
    Ok(table.numeric(column)?.into_iter().flatten().sum())
}

/// Mean of non-null values; `None` if there are none.
pub fn column_mean(table: &Table, column: &str) -> Result<Option<f64>> {
    let values: Vec<f64> = table.numeric(column)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

/// `key` of the row with the largest `measure`; the first such row on ties.
pub fn top_by(table: &Table, key: &str, measure: &str) -> Result<Option<Value>> {
    let key_idx = table.require_column(key)?;
    let measures = table.numeric(measure)?;

    let mut best: Option<(usize, f64)> = None;
    for (i, v) in measures.into_iter().enumerate() {
        let Some(v) = v else { continue };
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    Ok(best.map(|(i, _)| table.rows[i].get(key_idx).clone()))
}

pub fn spike_breakdown(table: &Table, column: &str) -> Result<SpikeBreakdown> {
    let mut out = SpikeBreakdown::default();
    for v in table.values(column)? {
        match v.as_bool() {
            Some(true) => out.spike += 1,
            Some(false) => out.no_spike += 1,
            None => {}
        }
    }
    Ok(out)
}

/// `[x, y]` pairs for a scatter plot, skipping rows where either is null.
pub fn scatter_points(table: &Table, x: &str, y: &str) -> Result<Vec<[f64; 2]>> {
    let xs = table.numeric(x)?;
    let ys = table.numeric(y)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) => Some([x, y]),
            _ => None,
        })
        .collect())
}

/// Totals and KPIs over the whole (filtered) table. Optional schema
/// columns the table lacks leave their metric as `None`.
pub fn portfolio(table: &Table, schema: &DatasetSchema, roi_scale: f64) -> Result<PortfolioMetrics> {
    let roles = &schema.roles;
    let present = |col: Option<&'static str>| col.filter(|c| table.has_column(c));

    let total_measure = column_total(table, roles.measure)?;
    let total_cost = present(roles.cost)
        .map(|c| column_total(table, c))
        .transpose()?;
    let blended_roi = total_cost.map(|cost| safe_ratio(total_measure, cost) * roi_scale);
    let average_roi = match present(roles.roi) {
        Some(c) => column_mean(table, c)?,
        None => None,
    };
    let spikes = present(roles.spike)
        .map(|c| spike_breakdown(table, c))
        .transpose()?;

    Ok(PortfolioMetrics {
        rows: table.len(),
        total_measure,
        total_cost,
        blended_roi,
        average_roi,
        top_performer: top_by(table, roles.group_key, roles.measure)?,
        spikes,
    })
}
