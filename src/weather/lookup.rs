//! Location-to-weather lookup
//!
//! Geocodes a place name, then fetches current conditions for the first
//! candidate. The two requests never overlap.

use crate::error::Result;
use crate::weather::client::WeatherProvider;
use crate::weather::types::{GeocodingResult, WeatherReport};

/// Outcome of a lookup that reached the provider successfully
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Geocoding returned no candidates; no weather request was made
    NotFound,

    /// Current conditions for the first geocoding candidate
    Found {
        place: GeocodingResult,
        report: WeatherReport,
    },
}

/// Resolve `location` and fetch its current weather.
///
/// "No candidates" is a normal outcome; transport and decoding failures from
/// either request are returned as errors.
pub async fn lookup_current_weather(
    provider: &dyn WeatherProvider,
    location: &str,
) -> Result<LookupOutcome> {
    let geocoding = provider.geocode(location).await?;

    let Some(place) = geocoding.first_match().cloned() else {
        tracing::info!(location, "No geocoding candidates");
        return Ok(LookupOutcome::NotFound);
    };

    tracing::debug!(
        location,
        place = %place.display_name(),
        candidates = geocoding.results.as_ref().map_or(0, Vec::len),
        "Resolved location"
    );

    let report = provider.current_weather(place.coordinates()).await?;
    Ok(LookupOutcome::Found { place, report })
}
