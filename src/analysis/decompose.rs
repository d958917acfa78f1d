use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::model::Table;
use crate::error::{Error, Result};

/// Weekly seasonality for daily data.
pub const DEFAULT_PERIOD: usize = 7;

/// One value per calendar day, gap-free.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl DailySeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sum `value_column` per day of `date_column`. Days inside the covered
/// range with no rows are filled with 0; rows with a null date or value
/// are ignored.
pub fn daily_totals(table: &Table, date_column: &str, value_column: &str) -> Result<DailySeries> {
    let date_idx = table.require_column(date_column)?;
    let values = table.numeric(value_column)?;

    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (row, value) in table.rows.iter().zip(values) {
        if let (Some(day), Some(v)) = (row.get(date_idx).as_date(), value) {
            *by_day.entry(day).or_insert(0.0) += v;
        }
    }

    let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
        return Ok(DailySeries {
            dates: Vec::new(),
            values: Vec::new(),
        });
    };
    let dates: Vec<NaiveDate> = first.iter_days().take_while(|d| *d <= last).collect();
    let values = dates
        .iter()
        .map(|d| by_day.get(d).copied().unwrap_or(0.0))
        .collect();
    Ok(DailySeries { dates, values })
}

/// Multiplicative trend / seasonal / residual split of a daily series.
/// All vectors are aligned with `dates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionResult {
    pub period: usize,
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<f64>,
    /// Centered moving average; `None` within half a period of either end.
    pub trend: Vec<Option<f64>>,
    /// Seasonal factor for each date's phase; the factors average to 1.
    pub seasonal: Vec<f64>,
    /// `observed / (trend × seasonal)`; `None` where the trend is.
    pub residual: Vec<Option<f64>>,
}

impl DecompositionResult {
    /// The `period` distinct seasonal factors, by phase from the first date.
    pub fn seasonal_factors(&self) -> &[f64] {
        &self.seasonal[..self.period.min(self.seasonal.len())]
    }
}

/// Decompose `series` with a fixed seasonal `period`.
///
/// Needs at least two full periods of strictly positive values; shorter or
/// non-positive series fail with a recoverable error.
pub fn decompose(series: &DailySeries, period: usize) -> Result<DecompositionResult> {
    if period < 2 {
        return Err(Error::MalformedInput(format!(
            "seasonal period must be at least 2, got {period}"
        )));
    }
    let n = series.len();
    if n < 2 * period {
        return Err(Error::InsufficientData {
            needed: 2 * period,
            available: n,
        });
    }
    if let Some((date, value)) = series
        .dates
        .iter()
        .zip(&series.values)
        .find(|(_, v)| !(**v > 0.0 && v.is_finite()))
    {
        return Err(Error::NonPositiveSeries {
            date: *date,
            value: *value,
        });
    }

    let observed = &series.values;
    let trend = centered_moving_average(observed, period);

    // Average detrended ratio per phase, normalised to mean 1.
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (t, (obs, tr)) in observed.iter().zip(&trend).enumerate() {
        if let Some(tr) = tr {
            sums[t % period] += obs / tr;
            counts[t % period] += 1;
        }
    }
    let mut factors: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 1.0 })
        .collect();
    let mean_factor = factors.iter().sum::<f64>() / period as f64;
    for f in &mut factors {
        *f /= mean_factor;
    }

    let seasonal: Vec<f64> = (0..n).map(|t| factors[t % period]).collect();
    let residual = observed
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((obs, tr), s)| tr.map(|tr| obs / (tr * s)))
        .collect();

    Ok(DecompositionResult {
        period,
        dates: series.dates.clone(),
        observed: observed.clone(),
        trend,
        seasonal,
        residual,
    })
}

/// Centered moving average over one period. Even periods use a 2×MA
/// (half weight on the two outermost points).
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let half = period / 2;
    let n = values.len();
    let mut trend = vec![None; n];
    if n <= 2 * half {
        return trend;
    }
    for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[t - half..=t + half];
        let total: f64 = if period % 2 == 1 {
            window.iter().sum()
        } else {
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            inner + 0.5 * (window[0] + window[window.len() - 1])
        };
        *slot = Some(total / period as f64);
    }
    trend
}
