use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::{debug, warn};

use super::{
    GeoPoint, GeocodeError, ResolvedLocation, ReverseGeocoder, google::GoogleGeocoder,
    maptiler::MapTiler, nominatim::Nominatim,
};
use crate::config::Config;

pub const FALLBACK_PROVIDER: &str = "fallback";

/// Tries each provider in turn and never fails: when nothing answers the
/// configured default location is returned instead.
///
/// The first provider gets `first_timeout`; the rest share whatever is left of
/// `total_timeout`.
#[derive(Clone)]
pub struct GeocodeCascade {
    providers: Vec<Arc<dyn ReverseGeocoder>>,
    first_timeout: Duration,
    total_timeout: Duration,
    default_location: String,
    cache: Cache<(i64, i64), ResolvedLocation>,
}

impl GeocodeCascade {
    pub fn new(
        providers: Vec<Arc<dyn ReverseGeocoder>>,
        first_timeout: Duration,
        total_timeout: Duration,
        default_location: String,
    ) -> Self {
        Self {
            providers,
            first_timeout,
            total_timeout: total_timeout.max(first_timeout),
            default_location,
            cache: Cache::builder()
                .max_capacity(50_000)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    /// Builds the provider chain from config. Keyed providers are skipped when no key is set.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let mut providers: Vec<Arc<dyn ReverseGeocoder>> = vec![Arc::new(Nominatim::new(
            client.clone(),
            &config.nominatim_url,
            &config.geocode_user_agent,
        ))];

        if let Some(key) = &config.maptiler_key {
            providers.push(Arc::new(MapTiler::new(
                client.clone(),
                &config.maptiler_url,
                key,
            )));
        }

        if let Some(key) = &config.google_maps_key {
            providers.push(Arc::new(GoogleGeocoder::new(
                client,
                &config.google_geocode_url,
                key,
            )));
        }

        Self::new(
            providers,
            config.geocode_first_timeout,
            config.geocode_total_timeout,
            config.default_location.clone(),
        )
    }

    pub fn fallback(&self) -> ResolvedLocation {
        ResolvedLocation {
            address: self.default_location.clone(),
            place_name: None,
            provider: FALLBACK_PROVIDER.to_string(),
        }
    }

    pub async fn resolve(&self, point: GeoPoint) -> ResolvedLocation {
        let key = point.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            debug!(provider = %hit.provider, "Reverse geocode cache hit");
            return hit;
        }

        let started = Instant::now();

        for (attempt, provider) in self.providers.iter().enumerate() {
            let budget = if attempt == 0 {
                self.first_timeout
            } else {
                self.total_timeout.saturating_sub(started.elapsed())
            };

            if budget.is_zero() {
                warn!(provider = provider.name(), "Geocoding budget exhausted");
                break;
            }

            match attempt_provider(provider.as_ref(), point, budget).await {
                Ok(location) => {
                    self.cache.insert(key, location.clone()).await;
                    return location;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "Reverse geocoding attempt failed");
                }
            }
        }

        self.fallback()
    }
}

async fn attempt_provider(
    provider: &dyn ReverseGeocoder,
    point: GeoPoint,
    budget: Duration,
) -> Result<ResolvedLocation, GeocodeError> {
    match tokio::time::timeout(budget, provider.reverse(point)).await {
        Ok(result) => result,
        Err(_) => Err(GeocodeError::Timeout {
            provider: provider.name(),
        }),
    }
}
