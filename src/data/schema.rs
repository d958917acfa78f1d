use serde::{Deserialize, Serialize};

use super::model::ColumnKind;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Dataset variants
// ---------------------------------------------------------------------------

/// The dataset layouts the dashboard knows how to read.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Influencer campaign sales (revenue, cost, ROI, engagement, spikes).
    #[default]
    Influencer,
    /// Palmer penguins biometrics.
    Penguins,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Influencer, Variant::Penguins];

    pub fn label(self) -> &'static str {
        match self {
            Variant::Influencer => "Influencer sales",
            Variant::Penguins => "Penguins",
        }
    }
}

// ---------------------------------------------------------------------------
// Declared schema
// ---------------------------------------------------------------------------

/// One declared column: cells are coerced to `kind` at load time and
/// `required` columns must be present in the header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

impl ColumnSpec {
    const fn required(name: &'static str, kind: ColumnKind) -> Self {
        ColumnSpec {
            name,
            kind,
            required: true,
        }
    }

    const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        ColumnSpec {
            name,
            kind,
            required: false,
        }
    }
}

/// Which declared column plays which part in the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Roles {
    /// Grouping key for summaries and rankings.
    pub group_key: &'static str,
    /// Main numeric measure (revenue / sales).
    pub measure: &'static str,
    pub cost: Option<&'static str>,
    pub date: Option<&'static str>,
    pub spike: Option<&'static str>,
    /// Per-row ROI column, averaged for the KPI panel.
    pub roi: Option<&'static str>,
    pub engagement: Option<&'static str>,
    /// Columns offered as categorical filters.
    pub filters: Vec<&'static str>,
    /// Numeric columns of the correlation matrix.
    pub correlation: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchema {
    pub variant: Variant,
    pub title: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub roles: Roles,
}

impl DatasetSchema {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Influencer => Self::influencer(),
            Variant::Penguins => Self::penguins(),
        }
    }

    pub fn influencer() -> Self {
        use ColumnKind::*;
        DatasetSchema {
            variant: Variant::Influencer,
            title: "Influencer Impact on Brand Sales",
            columns: vec![
                ColumnSpec::required("Influencer ID", Text),
                ColumnSpec::required("Platform", Text),
                ColumnSpec::required("Product ID", Text),
                ColumnSpec::required("Revenue ($)", Float),
                ColumnSpec::required("Cost ($)", Float),
                ColumnSpec::optional("ROI (%)", Float),
                ColumnSpec::optional("Engagement Rate (%)", Float),
                ColumnSpec::optional("Sales Spike", Bool),
                ColumnSpec::optional("Date", Date),
            ],
            roles: Roles {
                group_key: "Influencer ID",
                measure: "Revenue ($)",
                cost: Some("Cost ($)"),
                date: Some("Date"),
                spike: Some("Sales Spike"),
                roi: Some("ROI (%)"),
                engagement: Some("Engagement Rate (%)"),
                filters: vec!["Platform", "Product ID", "Influencer ID"],
                correlation: vec![
                    "Revenue ($)",
                    "Cost ($)",
                    "ROI (%)",
                    "Engagement Rate (%)",
                ],
            },
        }
    }

    pub fn penguins() -> Self {
        use ColumnKind::*;
        DatasetSchema {
            variant: Variant::Penguins,
            title: "Palmer Penguins",
            columns: vec![
                ColumnSpec::required("species", Text),
                ColumnSpec::required("island", Text),
                ColumnSpec::optional("bill_length_mm", Float),
                ColumnSpec::optional("bill_depth_mm", Float),
                ColumnSpec::optional("flipper_length_mm", Float),
                ColumnSpec::required("body_mass_g", Float),
                ColumnSpec::optional("sex", Text),
                ColumnSpec::optional("year", Integer),
            ],
            roles: Roles {
                group_key: "species",
                measure: "body_mass_g",
                cost: None,
                date: None,
                spike: None,
                roi: None,
                engagement: None,
                filters: vec!["species", "island", "sex"],
                correlation: vec![
                    "bill_length_mm",
                    "bill_depth_mm",
                    "flipper_length_mm",
                    "body_mass_g",
                ],
            },
        }
    }

    pub fn spec(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check a header row against the required columns.
    pub fn validate_headers<S: AsRef<str>>(&self, headers: &[S]) -> Result<()> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.required)
            .filter(|c| !headers.iter().any(|h| h.as_ref().trim() == c.name))
            .map(|c| c.name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumns(missing))
        }
    }
}
