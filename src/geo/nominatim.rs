use async_trait::async_trait;
use serde::Deserialize;

use super::{GeoPoint, GeocodeError, ResolvedLocation, ReverseGeocoder, fetch_json, non_empty};

const PROVIDER: &str = "nominatim";

/// OpenStreetMap Nominatim. Keyless, but the usage policy requires a real User-Agent.
pub struct Nominatim {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    name: Option<String>,
    address: Option<Address>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Address {
    amenity: Option<String>,
    building: Option<String>,
    road: Option<String>,
}

impl Nominatim {
    pub fn new(client: reqwest::Client, base_url: &str, user_agent: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for Nominatim {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn reverse(&self, point: GeoPoint) -> Result<ResolvedLocation, GeocodeError> {
        let request = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
                ("zoom", "18".to_string()),
                ("addressdetails", "1".to_string()),
            ]);

        let body: ReverseResponse = fetch_json(PROVIDER, request).await?;

        if body.error.is_some() {
            return Err(GeocodeError::NoResult { provider: PROVIDER });
        }

        let address = non_empty(body.display_name)
            .ok_or(GeocodeError::NoResult { provider: PROVIDER })?;

        let place_name = non_empty(body.name).or_else(|| {
            body.address.and_then(|a| {
                non_empty(a.amenity)
                    .or_else(|| non_empty(a.building))
                    .or_else(|| non_empty(a.road))
            })
        });

        Ok(ResolvedLocation {
            address,
            place_name,
            provider: PROVIDER.to_string(),
        })
    }
}
