//! Open-Meteo API client
//!
//! Issues the geocoding and forecast requests with a per-attempt deadline
//! and a bounded retry on transient failures.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

use crate::config::open_meteo::{
    CURRENT_FIELDS, GEOCODING_FORMAT, GEOCODING_LANGUAGE, GEOCODING_RESULT_COUNT,
};
use crate::config::Config;
use crate::error::{Result, WeatherApiError};
use crate::weather::types::{Coordinates, GeocodingResponse, WeatherReport};

const GEOCODING_ENDPOINT: &str = "geocoding";
const FORECAST_ENDPOINT: &str = "forecast";

/// Source of geocoding and current-conditions data
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Resolve a place name to candidate positions
    async fn geocode(&self, location: &str) -> Result<GeocodingResponse>;

    /// Fetch current conditions at a position
    async fn current_weather(&self, coordinates: Coordinates) -> Result<WeatherReport>;
}

/// Open-Meteo HTTP client
pub struct OpenMeteoClient {
    /// HTTP client with retry middleware
    http_client: ClientWithMiddleware,

    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let http_client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            http_client,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    /// Send a GET request and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.http_client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherApiError::RequestFailed {
                endpoint,
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            WeatherApiError::MalformedResponse {
                endpoint,
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn geocode(&self, location: &str) -> Result<GeocodingResponse> {
        tracing::debug!(location, "Geocoding location");

        let query = [
            ("name", location.to_string()),
            ("count", GEOCODING_RESULT_COUNT.to_string()),
            ("language", GEOCODING_LANGUAGE.to_string()),
            ("format", GEOCODING_FORMAT.to_string()),
        ];

        self.get_json(GEOCODING_ENDPOINT, &self.geocoding_url, &query)
            .await
    }

    async fn current_weather(&self, coordinates: Coordinates) -> Result<WeatherReport> {
        tracing::debug!(%coordinates, "Fetching current weather");

        let query = current_weather_query(coordinates);
        self.get_json(FORECAST_ENDPOINT, &self.forecast_url, &query)
            .await
    }
}

fn current_weather_query(coordinates: Coordinates) -> [(&'static str, String); 3] {
    [
        ("latitude", coordinates.latitude.to_string()),
        ("longitude", coordinates.longitude.to_string()),
        ("current", CURRENT_FIELDS.join(",")),
    ]
}
