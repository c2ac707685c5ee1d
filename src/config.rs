//! Application configuration

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::TrawlTrackerError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Request body limit, covers photo uploads
    pub max_upload_bytes: usize,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub acquire_timeout: Duration,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReportsConfig {
    pub timezone: DisplayTimezone,
    pub malformed_input: MalformedInputPolicy,
}

/// Timezone used when rendering report dates.
///
/// Dates are always stored in UTC; this only affects the `date` string of
/// the listing and JSON feed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTimezone {
    #[default]
    Utc,
    /// Timezone of the server process
    Local,
}

impl DisplayTimezone {
    pub const DATE_FORMAT: &'static str = "%d/%m/%Y %H:%M";

    /// Format a timestamp as day/month/year hour:minute
    pub fn format(&self, date: &DateTime<Utc>) -> String {
        match self {
            Self::Utc => date.format(Self::DATE_FORMAT).to_string(),
            Self::Local => date
                .with_timezone(&Local)
                .format(Self::DATE_FORMAT)
                .to_string(),
        }
    }
}

/// What to do with submitted fields that fail to parse
/// (date, coordinates, base64 photo).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedInputPolicy {
    /// Fail the whole submission, nothing is saved
    #[default]
    Reject,
    /// Drop the offending field and save the rest
    Ignore,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://trawl-tracker.db".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("TRAWLTRACKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), TrawlTrackerError> {
        self.server.validate()?;
        self.database.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), TrawlTrackerError> {
        self.bind
            .parse::<SocketAddr>()
            .map_err(|e| TrawlTrackerError::ConfigurationError {
                message: format!("Invalid bind address {}: {}", self.bind, e),
            })?;
        if self.max_upload_bytes == 0 {
            return Err(TrawlTrackerError::ConfigurationError {
                message: "Upload limit must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), TrawlTrackerError> {
        if self.url.trim().is_empty() {
            return Err(TrawlTrackerError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(TrawlTrackerError::ConfigurationError {
                message: "Connection pool size must be greater than zero".to_string(),
            });
        }
        if self.acquire_timeout.is_zero() {
            return Err(TrawlTrackerError::ConfigurationError {
                message: "Acquire timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env;

    #[test]
    fn test_load_config() {
        env::set_var("TRAWLTRACKER__SERVER__BIND", "127.0.0.1:3000");
        env::set_var("TRAWLTRACKER__DATABASE__URL", "sqlite://test.db");
        env::set_var("TRAWLTRACKER__DATABASE__ACQUIRE_TIMEOUT", "10");
        env::set_var("TRAWLTRACKER__REPORTS__TIMEZONE", "local");
        env::set_var("TRAWLTRACKER__REPORTS__MALFORMED_INPUT", "ignore");

        let config = AppConfig::load().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.database.url, "sqlite://test.db");
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.reports.timezone, DisplayTimezone::Local);
        assert_eq!(config.reports.malformed_input, MalformedInputPolicy::Ignore);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reports.timezone, DisplayTimezone::Utc);
        assert_eq!(config.reports.malformed_input, MalformedInputPolicy::Reject);
    }

    #[test]
    fn test_server_config_validate_invalid_bind() {
        let config = ServerConfig {
            bind: "not an address".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_config_validate_invalid_url() {
        let config = DatabaseConfig {
            url: "".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_config_validate_invalid_pool() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_utc_date_format() {
        let date = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(DisplayTimezone::Utc.format(&date), "14/11/2023 22:13");
    }
}
