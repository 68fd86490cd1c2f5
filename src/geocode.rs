//! Forward geocoding of campground locations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GeocodingConfig;
use crate::types::GeoPoint;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-text location to a point. `Ok(None)` when nothing matched.
    async fn locate(&self, query: &str) -> anyhow::Result<Option<GeoPoint>>;
}

/// Used when no map token is configured.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn locate(&self, _query: &str) -> anyhow::Result<Option<GeoPoint>> {
        Ok(None)
    }
}

/// Mapbox places API client.
pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

impl MapboxGeocoder {
    pub fn new(base_url: &str, token: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10)).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), token: token.to_string() })
    }

    fn request_url(&self, query: &str) -> anyhow::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("geocoding base url cannot take path segments"))?
            .push(&format!("{}.json", query));
        url.query_pairs_mut().append_pair("limit", "1").append_pair("access_token", &self.token);
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn locate(&self, query: &str) -> anyhow::Result<Option<GeoPoint>> {
        let url = self.request_url(query)?;
        let body: FeatureCollection =
            self.client.get(url).send().await?.error_for_status()?.json().await?;
        Ok(body.features.into_iter().next().and_then(|f| match f.geometry.coordinates.as_slice() {
            [longitude, latitude, ..] => Some(GeoPoint { longitude: *longitude, latitude: *latitude }),
            _ => None,
        }))
    }
}

pub fn from_config(cfg: &GeocodingConfig) -> anyhow::Result<Arc<dyn Geocoder>> {
    match cfg.token() {
        Some(token) => Ok(Arc::new(MapboxGeocoder::new(&cfg.base_url, token)?)),
        None => Ok(Arc::new(DisabledGeocoder)),
    }
}

/// Looks up a point, logging and swallowing failures so a flaky map API never
/// blocks saving a campground.
pub async fn locate_or_none(geocoder: &dyn Geocoder, location: &str) -> Option<GeoPoint> {
    match geocoder.locate(location).await {
        Ok(point) => point,
        Err(e) => {
            tracing::warn!("Geocoding {:?} failed: {}", location, e);
            None
        }
    }
}
