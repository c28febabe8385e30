//! Open-Meteo API type definitions
//!
//! These types mirror the geocoding responses. Forecast responses are kept
//! as raw JSON and passed through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current-conditions report as returned by the forecast endpoint
pub type WeatherReport = Value;

/// Geocoding search response
///
/// Open-Meteo omits `results` entirely when nothing matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodingResponse {
    /// Candidate places, best match first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<GeocodingResult>>,
}

impl GeocodingResponse {
    /// Create a response from a list of candidates
    pub fn with_results(results: Vec<GeocodingResult>) -> Self {
        Self {
            results: Some(results),
        }
    }

    /// First candidate, if any
    pub fn first_match(&self) -> Option<&GeocodingResult> {
        self.results.as_deref().and_then(<[GeocodingResult]>::first)
    }
}

/// A single geocoding candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub latitude: f64,
    pub longitude: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// First-level administrative area (state, region)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl GeocodingResult {
    /// Create a bare candidate at the given position
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            id: None,
            name: None,
            latitude,
            longitude,
            country: None,
            admin1: None,
            timezone: None,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Human-readable label for logs
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [
            self.name.as_deref(),
            self.admin1.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            self.coordinates().to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
