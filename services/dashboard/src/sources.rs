//! Upstream source clients and wire-format types.
//!
//! Both providers return JSON where nearly every field may be missing or
//! null; the response types keep non-identifying fields optional and
//! ignore unknown fields so payload drift never rejects a whole batch.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use advisory_common::{AdvisoryError, AdvisoryResult};

use crate::config::{DustSourceConfig, PollenSourceConfig};

// ============================================================================
// Pollen wire format
// ============================================================================

/// Forecast-lookup response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollenResponse {
    #[serde(default)]
    pub region_code: Option<String>,
    /// Daily forecast entries; individual entries may be null.
    #[serde(default)]
    pub daily_info: Option<Vec<Option<DailyInfo>>>,
}

/// One day of pollen forecasts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInfo {
    #[serde(default)]
    pub date: Option<ForecastDate>,
    #[serde(default)]
    pub pollen_type_info: Option<Vec<Option<PollenTypeInfo>>>,
}

/// Calendar date split into components, as the provider sends it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ForecastDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Forecast entry for a single pollen type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollenTypeInfo {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub index_info: Option<IndexInfo>,
}

/// Nested index details; absent entirely for out-of-season types.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub value: Option<i32>,
    #[serde(default)]
    pub category: Option<String>,
}

// ============================================================================
// Dust wire format
// ============================================================================

/// Site-listing response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DustResponse {
    #[serde(default)]
    pub total_records: Option<i64>,
    /// Monitoring site entries; individual entries may be null.
    #[serde(default)]
    pub records: Option<Vec<Option<SiteRecord>>>,
}

/// One monitoring site with its health advisories.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    #[serde(rename = "siteID", default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub site_type: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub site_health_advices: Option<Vec<Option<SiteHealthAdvice>>>,
}

/// Site location geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default)]
    pub geometry_type: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Vec<f64>>,
}

/// A time-windowed air-quality assessment for one pollutant parameter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteHealthAdvice {
    #[serde(default)]
    pub since: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub until: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub health_parameter: Option<String>,
    #[serde(default)]
    pub average_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub health_advice: Option<String>,
    #[serde(default)]
    pub health_advice_color: Option<String>,
    #[serde(default)]
    pub health_code: Option<String>,
}

// ============================================================================
// Clients
// ============================================================================

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the pollen forecast-lookup endpoint.
pub struct PollenClient {
    client: Client,
    endpoint: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    days: u32,
}

impl PollenClient {
    pub fn new(config: &PollenSourceConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            days: config.days,
        }
    }

    /// Fetch the pollen forecast for the configured coordinate.
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self) -> AdvisoryResult<PollenResponse> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.clone()),
                ("days", self.days.to_string()),
                ("location.latitude", self.latitude.to_string()),
                ("location.longitude", self.longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AdvisoryError::Http(format!("Pollen request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Http(format!(
                "Pollen fetch returned {}",
                response.status()
            )));
        }

        let payload: PollenResponse = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Parse(format!("Pollen payload: {}", e)))?;

        debug!(region = ?payload.region_code, "Fetched pollen forecast");
        Ok(payload)
    }
}

/// Client for the air-quality site-listing endpoint.
pub struct DustClient {
    client: Client,
    endpoint: String,
    api_key: String,
    environmental_segment: String,
}

impl DustClient {
    pub fn new(config: &DustSourceConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            environmental_segment: config.environmental_segment.clone(),
        }
    }

    /// Fetch current site records for the configured environmental segment.
    #[instrument(skip(self))]
    pub async fn fetch_sites(&self) -> AdvisoryResult<DustResponse> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("environmentalSegment", self.environmental_segment.clone()),
                ("X-API-key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| AdvisoryError::Http(format!("Dust request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Http(format!(
                "Dust fetch returned {}",
                response.status()
            )));
        }

        let payload: DustResponse = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Parse(format!("Dust payload: {}", e)))?;

        debug!(total = ?payload.total_records, "Fetched dust site records");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollen_response_tolerates_unknown_and_missing_fields() {
        let json = r#"{
            "regionCode": "VIC",
            "nextPageToken": "ignored",
            "dailyInfo": [
                {
                    "date": {"year": 2024, "month": 6, "day": 1},
                    "pollenTypeInfo": [
                        {"code": "GRASS"},
                        null
                    ],
                    "plantInfo": [{"code": "OAK"}]
                },
                null
            ]
        }"#;

        let response: PollenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.region_code.as_deref(), Some("VIC"));

        let daily = response.daily_info.as_ref().unwrap();
        assert_eq!(daily.len(), 2);
        assert!(daily[1].is_none());

        let entries = daily[0].as_ref().unwrap().pollen_type_info.as_ref().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].as_ref().unwrap().index_info.is_none());
        assert!(entries[1].is_none());
    }

    #[test]
    fn test_dust_response_parses_advisory_window() {
        let json = r##"{
            "totalRecords": 1,
            "records": [
                {
                    "siteID": "abc-123",
                    "siteName": "Brighton",
                    "siteType": "Standard",
                    "geometry": {"type": "Point", "coordinates": [145.0, -37.9]},
                    "siteHealthAdvices": [
                        {
                            "since": "2024-06-01T13:00:00+10:00",
                            "until": "2024-06-01T14:00:00+10:00",
                            "healthParameter": "PM2.5",
                            "averageValue": 4.2,
                            "unit": "&micro;g/m&sup3;",
                            "healthAdvice": "Good",
                            "healthAdviceColor": "#42A93C",
                            "healthCode": "1"
                        }
                    ]
                }
            ]
        }"##;

        let response: DustResponse = serde_json::from_str(json).unwrap();
        let records = response.records.as_ref().unwrap();
        let site = records[0].as_ref().unwrap();
        assert_eq!(site.site_name.as_deref(), Some("Brighton"));

        let advice = site.site_health_advices.as_ref().unwrap()[0]
            .as_ref()
            .unwrap();
        assert_eq!(advice.health_advice.as_deref(), Some("Good"));
        assert_eq!(advice.average_value, Some(4.2));
        assert!(advice.until.is_some());
    }

    #[test]
    fn test_empty_bodies_deserialize() {
        let pollen: PollenResponse = serde_json::from_str("{}").unwrap();
        assert!(pollen.region_code.is_none());
        assert!(pollen.daily_info.is_none());

        let dust: DustResponse = serde_json::from_str("{}").unwrap();
        assert!(dust.records.is_none());
    }
}
