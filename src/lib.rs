//! Influencer sales dashboard core.
//!
//! Loading, filtering and analysis are plain functions over a [`data::model::Table`];
//! the desktop front-end (the `influence-dash` binary) only renders the
//! [`pipeline::DashboardView`] they produce and feeds selections back.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;

pub use error::{Error, Result};
