//! Reverse geocoding: turning a check-in fix into a human readable address.
//!
//! Three providers are supported (OpenStreetMap Nominatim, MapTiler and the
//! Google Geocoding API). They are tried in that order by [`GeocodeCascade`],
//! which falls back to a fixed location string when none answers in time.

pub mod cascade;
pub mod google;
pub mod maptiler;
pub mod nominatim;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use cascade::GeocodeCascade;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeocodeError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(GeocodeError::InvalidPoint {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Cache key: the point rounded to 4 decimal places (~11 m).
    pub fn cache_key(&self) -> (i64, i64) {
        (
            (self.latitude * 10_000.0).round() as i64,
            (self.longitude * 10_000.0).round() as i64,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedLocation {
    #[schema(example = "Gulshan Avenue, Dhaka 1212, Bangladesh")]
    pub address: String,
    #[schema(example = "Head Office", nullable = true)]
    pub place_name: Option<String>,
    /// `nominatim`, `maptiler`, `google` or `fallback`
    #[schema(example = "nominatim")]
    pub provider: String,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("coordinates out of range: {latitude}, {longitude}")]
    InvalidPoint { latitude: f64, longitude: f64 },

    #[error("request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} answered with HTTP {status}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{provider} returned no address")]
    NoResult { provider: &'static str },

    #[error("{provider} timed out")]
    Timeout { provider: &'static str },
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn reverse(&self, point: GeoPoint) -> Result<ResolvedLocation, GeocodeError>;
}

/// Sends a GET and decodes the JSON body, mapping failures to [`GeocodeError`].
pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, GeocodeError> {
    let response = request
        .send()
        .await
        .map_err(|source| GeocodeError::Transport { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(GeocodeError::Status { provider, status });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| GeocodeError::Transport { provider, source })
}

/// Trim and drop empty strings coming back from providers.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_points() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn nearby_points_share_a_cache_key() {
        let a = GeoPoint::new(23.810_31, 90.412_52).unwrap();
        let b = GeoPoint::new(23.810_34, 90.412_49).unwrap();
        let c = GeoPoint::new(23.811_0, 90.412_5).unwrap();

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }
}
