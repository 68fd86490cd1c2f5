use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::config::AppConfig;
use crate::geocode::{self, Geocoder};
use crate::uploads::ImageStore;

/// The shared application state.
///
/// Everything here is read-only after startup; per-user state lives in the
/// signed session cookie, never in process memory.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Signs the session, flash and return-to cookies.
    pub cookie_key: Key,
    pub geocoder: Arc<dyn Geocoder>,
    /// Writes and removes uploaded campground images.
    pub images: ImageStore,
}

impl AppState {
    /// Builds the state, deriving the cookie key from `session.secret` and
    /// choosing a geocoder from the geocoding section.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> anyhow::Result<Self> {
        let geocoder = geocode::from_config(&config.geocoding)?;
        Self::with_geocoder(db, config, geocoder)
    }

    pub fn with_geocoder(
        db: sqlx::SqlitePool,
        config: AppConfig,
        geocoder: Arc<dyn Geocoder>,
    ) -> anyhow::Result<Self> {
        let cookie_key = Key::try_from(config.session.secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid session.secret: {}", e))?;
        let images = ImageStore::new(&config.uploads.dir);
        Ok(Self { db, config: Arc::new(config), cookie_key, geocoder, images })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
