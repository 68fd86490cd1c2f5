use std::path::Path;

use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Minimum secret length accepted by the cookie signing key.
pub const MIN_SECRET_LEN: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub max_age_days: i64,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub mapbox_token: Option<String>,
}

impl GeocodingConfig {
    /// The configured token, unless missing or blank.
    pub fn token(&self) -> Option<&str> {
        self.mapbox_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    pub dir: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub uploads: UploadsConfig,
    pub geocoding: GeocodingConfig,
    pub security: Option<SecurityConfig>,
}

fn embedded_defaults() -> ::config::ConfigBuilder<::config::builder::DefaultState> {
    ::config::Config::builder().add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
}

impl Default for AppConfig {
    /// The embedded `config/default.toml`. It ships with the binary, so a
    /// parse failure is a build defect.
    fn default() -> Self {
        let parsed = embedded_defaults().build().and_then(|cfg| cfg.try_deserialize::<AppConfig>());
        match parsed {
            Ok(cfg) => cfg,
            Err(e) => panic!("embedded default config is invalid: {}", e),
        }
    }
}

/// Layers: embedded defaults, `./yelpcamp.toml`, the file named by
/// `YELPCAMP_CONFIG`, `YELPCAMP__SECTION__KEY` variables, then the short
/// `DB_URL`, `SECRET` and `MAPBOX_TOKEN` names. A `.env` file is read first.
pub fn load() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();

    let mut builder = embedded_defaults().add_source(::config::File::with_name("yelpcamp").required(false));
    if let Some(custom_path) = non_empty_env("YELPCAMP_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    builder = builder
        .add_source(::config::Environment::with_prefix("YELPCAMP").separator("__"))
        .set_override_option("database.url", non_empty_env("DB_URL"))?
        .set_override_option("session.secret", non_empty_env("SECRET"))?
        .set_override_option("geocoding.mapbox_token", non_empty_env("MAPBOX_TOKEN"))?;

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    if cfg.database.url.trim().is_empty() {
        return Err(anyhow::anyhow!("database.url must not be empty"));
    }

    if cfg.session.secret.len() < MIN_SECRET_LEN {
        return Err(anyhow::anyhow!("session.secret must be at least {} bytes", MIN_SECRET_LEN));
    }
    if cfg.session.cookie_name.trim().is_empty() {
        return Err(anyhow::anyhow!("session.cookie_name must not be empty"));
    }
    if cfg.session.max_age_days <= 0 {
        return Err(anyhow::anyhow!("session.max_age_days must be > 0"));
    }

    if !(4..=31).contains(&cfg.auth.bcrypt_cost) {
        return Err(anyhow::anyhow!("auth.bcrypt_cost must be in 4..=31"));
    }

    if cfg.uploads.dir.trim().is_empty() {
        return Err(anyhow::anyhow!("uploads.dir must not be empty"));
    }
    if cfg.uploads.max_body_bytes < 1024 {
        return Err(anyhow::anyhow!("uploads.max_body_bytes must be at least 1024"));
    }

    if cfg.geocoding.token().is_none() {
        tracing::info!("No map token configured - campgrounds will be stored without coordinates");
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
