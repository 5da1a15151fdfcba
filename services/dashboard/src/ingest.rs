//! Normalization of upstream payloads into persisted record batches.
//!
//! Both normalizers return a tagged batch so a payload that flattens to
//! zero records is an explicit branch for the caller, never an unchecked
//! first-element access.

use chrono::{NaiveDate, NaiveDateTime};

use advisory_common::{DustRecord, PollenForecastRecord};

use crate::sources::{DustResponse, PollenResponse};

/// Outcome of normalizing a pollen forecast response.
#[derive(Debug, Clone, PartialEq)]
pub enum PollenBatch {
    /// The payload flattened to zero records.
    Empty,
    Ready {
        /// Forecast date of the batch, used for the freshness comparison.
        forecast_date: NaiveDate,
        records: Vec<PollenForecastRecord>,
    },
}

/// Outcome of normalizing a dust site-listing response.
#[derive(Debug, Clone, PartialEq)]
pub enum DustBatch {
    /// The payload reduced to zero sites.
    Empty,
    Ready {
        /// Observation timestamp of the batch, used for the freshness
        /// comparison.
        observed_at: NaiveDateTime,
        records: Vec<DustRecord>,
    },
}

/// Flatten a pollen response into one record per (day, pollen type) pair.
///
/// Null entries in either list are skipped, as are entries without a type
/// code or a resolvable date. A missing `indexInfo` leaves the three index
/// fields null.
pub fn normalize_pollen(response: &PollenResponse) -> PollenBatch {
    let region = response.region_code.clone().unwrap_or_default();

    let mut records = Vec::new();
    for daily in response.daily_info.iter().flatten().flatten() {
        let Some(date) = daily
            .date
            .as_ref()
            .and_then(|d| NaiveDate::from_ymd_opt(d.year, d.month, d.day))
        else {
            continue;
        };

        for entry in daily.pollen_type_info.iter().flatten().flatten() {
            let Some(code) = entry.code.clone() else {
                continue;
            };
            let index = entry.index_info.as_ref();

            records.push(PollenForecastRecord {
                region_code: region.clone(),
                forecast_date: date,
                pollen_type: code,
                index_name: index.and_then(|i| i.display_name.clone()),
                index_value: index.and_then(|i| i.value),
                index_category: index.and_then(|i| i.category.clone()),
            });
        }
    }

    match records.first().map(|r| r.forecast_date) {
        None => PollenBatch::Empty,
        Some(forecast_date) => PollenBatch::Ready {
            forecast_date,
            records,
        },
    }
}

/// Reduce a dust response to one record per site, from the first health
/// advisory of each site.
///
/// Sites that are null, carry no advisory list, or whose first advisory is
/// null are excluded entirely. `fallback` stands in for a missing "until"
/// timestamp and should be the current local time.
pub fn normalize_dust(response: &DustResponse, fallback: NaiveDateTime) -> DustBatch {
    let mut records = Vec::new();
    for site in response.records.iter().flatten().flatten() {
        let Some(site_name) = site.site_name.clone() else {
            continue;
        };
        let Some(advice) = site
            .site_health_advices
            .as_ref()
            .and_then(|advices| advices.first())
            .and_then(|first| first.as_ref())
        else {
            continue;
        };

        let create_time = advice
            .until
            .map(|t| t.with_timezone(&chrono::Local).naive_local())
            .unwrap_or(fallback);

        records.push(DustRecord {
            site_name,
            create_time,
            health_parameter: advice.health_parameter.clone(),
            average_value: advice.average_value,
            health_advice: advice.health_advice.clone(),
        });
    }

    match records.first().map(|r| r.create_time) {
        None => DustBatch::Empty,
        Some(observed_at) => DustBatch::Ready {
            observed_at,
            records,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local};

    fn pollen_from_json(json: &str) -> PollenResponse {
        serde_json::from_str(json).unwrap()
    }

    fn dust_from_json(json: &str) -> DustResponse {
        serde_json::from_str(json).unwrap()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_single_grass_entry() {
        let response = pollen_from_json(
            r#"{
                "regionCode": "VIC",
                "dailyInfo": [{
                    "date": {"year": 2024, "month": 6, "day": 1},
                    "pollenTypeInfo": [{
                        "code": "GRASS",
                        "indexInfo": {"displayName": "Grass", "value": 2, "category": "LOW"}
                    }]
                }]
            }"#,
        );

        let PollenBatch::Ready {
            forecast_date,
            records,
        } = normalize_pollen(&response)
        else {
            panic!("expected a ready batch");
        };

        assert_eq!(forecast_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].region_code, "VIC");
        assert_eq!(records[0].pollen_type, "GRASS");
        assert_eq!(records[0].index_name.as_deref(), Some("Grass"));
        assert_eq!(records[0].index_value, Some(2));
        assert_eq!(records[0].index_category.as_deref(), Some("LOW"));
    }

    #[test]
    fn test_record_count_skips_null_entries() {
        let response = pollen_from_json(
            r#"{
                "regionCode": "VIC",
                "dailyInfo": [
                    {
                        "date": {"year": 2024, "month": 6, "day": 1},
                        "pollenTypeInfo": [
                            {"code": "GRASS", "indexInfo": {"category": "LOW"}},
                            null,
                            {"code": "TREE", "indexInfo": {"category": "HIGH"}}
                        ]
                    },
                    null,
                    {
                        "date": {"year": 2024, "month": 6, "day": 2},
                        "pollenTypeInfo": [
                            {"code": "RAGWEED"}
                        ]
                    }
                ]
            }"#,
        );

        let PollenBatch::Ready { records, .. } = normalize_pollen(&response) else {
            panic!("expected a ready batch");
        };

        // Count equals the non-null pollen-type entries across all days.
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_missing_index_info_yields_null_fields() {
        let response = pollen_from_json(
            r#"{
                "regionCode": "VIC",
                "dailyInfo": [{
                    "date": {"year": 2024, "month": 6, "day": 1},
                    "pollenTypeInfo": [{"code": "WEED"}]
                }]
            }"#,
        );

        let PollenBatch::Ready { records, .. } = normalize_pollen(&response) else {
            panic!("expected a ready batch");
        };

        assert_eq!(records[0].index_name, None);
        assert_eq!(records[0].index_value, None);
        assert_eq!(records[0].index_category, None);
    }

    #[test]
    fn test_empty_daily_info_is_empty_batch() {
        let response = pollen_from_json(r#"{"regionCode": "VIC", "dailyInfo": []}"#);
        assert_eq!(normalize_pollen(&response), PollenBatch::Empty);

        let response = pollen_from_json(
            r#"{"regionCode": "VIC", "dailyInfo": [{"date": {"year": 2024, "month": 6, "day": 1}, "pollenTypeInfo": []}]}"#,
        );
        assert_eq!(normalize_pollen(&response), PollenBatch::Empty);
    }

    #[test]
    fn test_dust_first_advisory_only() {
        let response = dust_from_json(
            r#"{
                "records": [{
                    "siteName": "Brighton",
                    "siteHealthAdvices": [
                        {"healthParameter": "PM2.5", "averageValue": 4.2, "healthAdvice": "Good",
                         "until": "2024-06-01T14:00:00+10:00"},
                        {"healthParameter": "PM10", "averageValue": 9.9, "healthAdvice": "Poor"}
                    ]
                }]
            }"#,
        );

        let DustBatch::Ready {
            observed_at,
            records,
        } = normalize_dust(&response, noon())
        else {
            panic!("expected a ready batch");
        };

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].health_parameter.as_deref(), Some("PM2.5"));
        assert_eq!(records[0].health_advice.as_deref(), Some("Good"));

        let until = DateTime::parse_from_rfc3339("2024-06-01T14:00:00+10:00").unwrap();
        assert_eq!(observed_at, until.with_timezone(&Local).naive_local());
    }

    #[test]
    fn test_dust_null_first_advisory_excludes_site() {
        let response = dust_from_json(
            r#"{
                "records": [
                    {
                        "siteName": "Brighton",
                        "siteHealthAdvices": [null, {"healthAdvice": "Good"}]
                    },
                    {
                        "siteName": "Melbourne CBD",
                        "siteHealthAdvices": [{"healthAdvice": "Moderate"}]
                    }
                ]
            }"#,
        );

        let DustBatch::Ready { records, .. } = normalize_dust(&response, noon()) else {
            panic!("expected a ready batch");
        };

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].site_name, "Melbourne CBD");
    }

    #[test]
    fn test_dust_sites_without_advisories_are_excluded() {
        let response = dust_from_json(
            r#"{
                "records": [
                    null,
                    {"siteName": "No advices"},
                    {"siteName": "Empty advices", "siteHealthAdvices": []}
                ]
            }"#,
        );

        assert_eq!(normalize_dust(&response, noon()), DustBatch::Empty);
    }

    #[test]
    fn test_dust_missing_until_uses_fallback() {
        let response = dust_from_json(
            r#"{
                "records": [{
                    "siteName": "Brighton",
                    "siteHealthAdvices": [{"healthAdvice": "Good"}]
                }]
            }"#,
        );

        let DustBatch::Ready {
            observed_at,
            records,
        } = normalize_dust(&response, noon())
        else {
            panic!("expected a ready batch");
        };

        assert_eq!(observed_at, noon());
        assert_eq!(records[0].create_time, noon());
    }
}
