use async_trait::async_trait;
use serde::Deserialize;

use super::{GeoPoint, GeocodeError, ResolvedLocation, ReverseGeocoder, fetch_json, non_empty};

const PROVIDER: &str = "google";

/// Google Maps Geocoding API.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

const PLACE_TYPES: [&str; 3] = ["point_of_interest", "establishment", "premise"];

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn reverse(&self, point: GeoPoint) -> Result<ResolvedLocation, GeocodeError> {
        let request = self
            .client
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(&[
                (
                    "latlng",
                    format!("{},{}", point.latitude, point.longitude),
                ),
                ("key", self.api_key.clone()),
            ]);

        let body: GeocodeResponse = fetch_json(PROVIDER, request).await?;

        // ZERO_RESULTS, REQUEST_DENIED, OVER_QUERY_LIMIT all come back as 200
        if body.status != "OK" {
            return Err(GeocodeError::NoResult { provider: PROVIDER });
        }

        let result = body
            .results
            .into_iter()
            .next()
            .ok_or(GeocodeError::NoResult { provider: PROVIDER })?;

        let place_name = result
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| PLACE_TYPES.contains(&t.as_str())))
            .map(|c| c.long_name.clone());

        let address = non_empty(result.formatted_address)
            .ok_or(GeocodeError::NoResult { provider: PROVIDER })?;

        Ok(ResolvedLocation {
            address,
            place_name: non_empty(place_name),
            provider: PROVIDER.to_string(),
        })
    }
}
