//! Service configuration loaded from a YAML file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{info, warn};

/// Root service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub pollen: PollenSourceConfig,
    pub dust: DustSourceConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

/// Pollen forecast source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollenSourceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Forecast horizon in days requested from the provider.
    pub days: u32,
    /// Local time of day for the daily fetch, "HH:MM".
    pub fetch_time: String,
}

impl Default for PollenSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://pollen.googleapis.com/v1/forecast:lookup".to_string(),
            api_key: String::new(),
            latitude: -37.924484,
            longitude: 145.128025,
            days: 1,
            fetch_time: "06:00".to_string(),
        }
    }
}

impl PollenSourceConfig {
    pub fn trigger_time(&self) -> Result<NaiveTime> {
        parse_fetch_time(&self.fetch_time)
    }
}

/// Air-quality monitoring source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DustSourceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub environmental_segment: String,
    /// Local time of day for the daily fetch, "HH:MM".
    pub fetch_time: String,
}

impl Default for DustSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://gateway.api.epa.vic.gov.au/environmentMonitoring/v1/sites"
                .to_string(),
            api_key: String::new(),
            environmental_segment: "air".to_string(),
            fetch_time: "09:30".to_string(),
        }
    }
}

impl DustSourceConfig {
    pub fn trigger_time(&self) -> Result<NaiveTime> {
        parse_fetch_time(&self.fetch_time)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/advisories.db"),
        }
    }
}

/// Parse a "HH:MM" local time of day.
pub fn parse_fetch_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid fetch time: {}", value))
}

impl DashboardConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DashboardConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(path = %path.display(), "Loaded service configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.pollen.days, 1);
        assert_eq!(config.pollen.fetch_time, "06:00");
        assert_eq!(config.dust.environmental_segment, "air");
        assert_eq!(config.dust.fetch_time, "09:30");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
pollen:
  api_key: "abc123"
  latitude: -37.81
  longitude: 144.96
server:
  port: 9000
"#;
        let config: DashboardConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pollen.api_key, "abc123");
        assert_eq!(config.pollen.latitude, -37.81);
        // Unset fields keep their defaults.
        assert_eq!(config.pollen.days, 1);
        assert_eq!(config.dust.fetch_time, "09:30");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_fetch_time_parsing() {
        let time = parse_fetch_time("09:30").unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());

        assert!(parse_fetch_time("25:00").is_err());
        assert!(parse_fetch_time("morning").is_err());
    }
}
