//! Persisted record shapes and the computed dashboard summary.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One pollen index forecast for a (region, date, pollen type) triple.
///
/// Rows are written once per ingestion run and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollenForecastRecord {
    pub region_code: String,
    /// Calendar date the index applies to (no time component).
    pub forecast_date: NaiveDate,
    /// Pollen type code, e.g. "TREE", "GRASS", "RAGWEED", "WEED".
    pub pollen_type: String,
    pub index_name: Option<String>,
    pub index_value: Option<i32>,
    /// Qualitative level, e.g. "LOW", "MODERATE", "HIGH".
    pub index_category: Option<String>,
}

/// One air-quality health advisory observation for a monitoring site.
///
/// Derived from the first health advisory of each site in the upstream
/// payload; `create_time` is the advisory's "until" timestamp in local time,
/// or the ingestion time when the advisory carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DustRecord {
    pub site_name: String,
    pub create_time: NaiveDateTime,
    pub health_parameter: Option<String>,
    pub average_value: Option<f64>,
    pub health_advice: Option<String>,
}

/// Latest advisory categories for the dashboard, assembled per query.
///
/// Fields the lookups could not resolve are null rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub tree: Option<String>,
    pub grass: Option<String>,
    pub ragweed: Option<String>,
    pub dust: Option<String>,
}
