use async_trait::async_trait;
use serde::Deserialize;

use super::{GeoPoint, GeocodeError, ResolvedLocation, ReverseGeocoder, fetch_json, non_empty};

const PROVIDER: &str = "maptiler";

pub struct MapTiler {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    place_name: Option<String>,
    text: Option<String>,
}

impl MapTiler {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for MapTiler {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn reverse(&self, point: GeoPoint) -> Result<ResolvedLocation, GeocodeError> {
        // MapTiler takes lon,lat order in the path
        let request = self
            .client
            .get(format!(
                "{}/geocoding/{},{}.json",
                self.base_url, point.longitude, point.latitude
            ))
            .query(&[("key", self.api_key.as_str())]);

        let body: FeatureCollection = fetch_json(PROVIDER, request).await?;

        let feature = body
            .features
            .into_iter()
            .find(|f| f.place_name.as_deref().is_some_and(|p| !p.trim().is_empty()))
            .ok_or(GeocodeError::NoResult { provider: PROVIDER })?;

        let address = non_empty(feature.place_name)
            .ok_or(GeocodeError::NoResult { provider: PROVIDER })?;

        Ok(ResolvedLocation {
            address,
            place_name: non_empty(feature.text),
            provider: PROVIDER.to_string(),
        })
    }
}
