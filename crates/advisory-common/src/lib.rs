//! Common types shared across the advisory-dashboard services.

pub mod error;
pub mod records;

pub use error::{AdvisoryError, AdvisoryResult};
pub use records::{DashboardSummary, DustRecord, PollenForecastRecord};
