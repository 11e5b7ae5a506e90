use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use serde::Deserialize;
use tracing::{debug, warn};

/// Stored when the geocoder answers but knows no address.
pub const ADDRESS_NOT_FOUND: &str = "Address not found";
/// Stored when the geocoder could not be reached or answered garbage.
pub const ADDRESS_LOOKUP_FAILED: &str = "Address lookup failed";

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no address known for these coordinates")]
    NoMatch,
}

/// Maps coordinates to a human-readable address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;
}

/// Never fails: lookup problems degrade to a placeholder address.
pub async fn resolve_address(geocoder: &dyn ReverseGeocoder, latitude: f64, longitude: f64) -> String {
    match geocoder.reverse(latitude, longitude).await {
        Ok(address) => address,
        Err(GeocodeError::NoMatch) => ADDRESS_NOT_FOUND.to_string(),
        Err(e) => {
            warn!(latitude, longitude, "reverse geocoding failed: {e}");
            ADDRESS_LOOKUP_FAILED.to_string()
        }
    }
}

#[derive(Deserialize)]
struct NominatimReply {
    display_name: Option<String>,
}

/// OpenStreetMap Nominatim `/reverse` client with a small result cache.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<(i64, i64), String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(24 * 60 * 60))
                .build(),
        })
    }

    // ~1 m at the equator
    fn cache_key(latitude: f64, longitude: f64) -> (i64, i64) {
        (
            (latitude * 1e5).round() as i64,
            (longitude * 1e5).round() as i64,
        )
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let key = Self::cache_key(latitude, longitude);
        if let Some(address) = self.cache.get(&key) {
            debug!(latitude, longitude, "geocode cache hit");
            return Ok(address);
        }

        let url = format!(
            "{}/reverse?format=json&lat={latitude}&lon={longitude}",
            self.base_url
        );
        let reply: NominatimReply = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let address = reply
            .display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(GeocodeError::NoMatch)?;
        self.cache.insert(key, address.clone());
        Ok(address)
    }
}
