//! Pure computations over a (filtered) [`Table`](crate::data::model::Table):
//! grouped summaries, portfolio KPIs, correlation and seasonal decomposition.

pub mod aggregate;
pub mod correlation;
pub mod decompose;
pub mod metrics;
pub mod ratio;
