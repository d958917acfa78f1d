use std::path::Path;

use config::Config as CConfig;
use serde::{Deserialize, Serialize};

use crate::analysis::decompose::DEFAULT_PERIOD;
use crate::data::schema::Variant;
use crate::error::{Error, Result};

/// Prefix of environment overrides, e.g.
/// `INFLUENCE_DASH__ANALYSIS__SEASONAL_PERIOD=14`.
pub const ENV_PREFIX: &str = "INFLUENCE_DASH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashConfig {
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Path or http(s) URL loaded at startup.
    pub source: Option<String>,
    pub variant: Variant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub seasonal_period: usize,
    pub roi_scale: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seasonal_period: DEFAULT_PERIOD,
            roi_scale: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 860.0,
        }
    }
}

impl DashConfig {
    pub fn from_str(toml_str: &str) -> Result<DashConfig> {
        CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?
            .try_deserialize::<DashConfig>()
            .map_err(|e| Error::Config(e.to_string()))?
            .validated()
    }

    /// Defaults, then the TOML file at `path` (if any), then environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<DashConfig> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?
            .try_deserialize::<DashConfig>()
            .map_err(|e| Error::Config(e.to_string()))?
            .validated()
    }

    /// Reject values that would break the analysis: ROI must stay
    /// non-negative and a season needs at least two phases.
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if !(analysis.roi_scale.is_finite() && analysis.roi_scale > 0.0) {
            return Err(Error::Config(format!(
                "analysis.roi_scale must be a finite positive number, got {}",
                analysis.roi_scale
            )));
        }
        if analysis.seasonal_period < 2 {
            return Err(Error::Config(format!(
                "analysis.seasonal_period must be at least 2, got {}",
                analysis.seasonal_period
            )));
        }
        Ok(())
    }

    fn validated(self) -> Result<DashConfig> {
        self.validate()?;
        Ok(self)
    }
}
