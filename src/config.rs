//! Configuration management for the Weather MCP Server
//!
//! Handles API endpoints, HTTP deadlines and environment overrides.

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable overriding the geocoding endpoint
pub const ENV_GEOCODING_URL: &str = "WEATHER_MCP_GEOCODING_URL";

/// Environment variable overriding the forecast endpoint
pub const ENV_FORECAST_URL: &str = "WEATHER_MCP_FORECAST_URL";

/// Environment variable overriding the per-attempt HTTP timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "WEATHER_MCP_TIMEOUT_SECS";

/// Environment variable overriding the retry budget for transient failures
pub const ENV_MAX_RETRIES: &str = "WEATHER_MCP_MAX_RETRIES";

/// Configuration for the Weather MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Geocoding search endpoint
    pub geocoding_url: String,

    /// Forecast endpoint
    pub forecast_url: String,

    /// Deadline for each outbound HTTP attempt
    pub request_timeout: Duration,

    /// Retries on transient network errors (0 disables retrying)
    pub max_retries: u32,

    /// User-Agent header sent to Open-Meteo
    pub user_agent: String,
}

impl Config {
    /// Create a configuration from defaults and environment overrides
    pub fn new() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create a configuration, resolving overrides through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_GEOCODING_URL) {
            config.geocoding_url = url;
        }

        if let Some(url) = lookup(ENV_FORECAST_URL) {
            config.forecast_url = url;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(parse_var(ENV_TIMEOUT_SECS, &secs)?);
        }

        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            config.max_retries = parse_var(ENV_MAX_RETRIES, &retries)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that endpoints are absolute URLs and the deadline is usable
    pub fn validate(&self) -> Result<()> {
        for url in [&self.geocoding_url, &self.forecast_url] {
            reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                url: url.clone(),
                message: e.to_string(),
            })?;
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: ENV_TIMEOUT_SECS.to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding_url: open_meteo::GEOCODING_URL.to_string(),
            forecast_url: open_meteo::FORECAST_URL.to_string(),
            request_timeout: Duration::from_secs(http::DEFAULT_TIMEOUT_SECS),
            max_retries: http::DEFAULT_MAX_RETRIES,
            user_agent: format!("weather-mcp-server/{}", server::VERSION),
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

/// Server identification
pub mod server {
    /// Name advertised to the host during initialization
    pub const NAME: &str = "weather Model Context Protocol";

    /// Version advertised to the host during initialization
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Identification port; the stdio transport never binds it
    pub const PORT: u16 = 1005;
}

/// Outbound HTTP defaults
pub mod http {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_MAX_RETRIES: u32 = 1;
}

/// Open-Meteo API constants
pub mod open_meteo {
    /// Geocoding search endpoint
    pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

    /// Forecast endpoint
    pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

    /// Number of geocoding candidates requested
    pub const GEOCODING_RESULT_COUNT: u32 = 10;

    pub const GEOCODING_LANGUAGE: &str = "en";
    pub const GEOCODING_FORMAT: &str = "json";

    /// Current-conditions fields requested from the forecast endpoint
    pub const CURRENT_FIELDS: &[&str] = &[
        "precipitation",
        "rain",
        "relative_humidity_2m",
        "temperature_2m",
        "is_day",
        "cloud_cover",
        "wind_speed_10m",
    ];
}
