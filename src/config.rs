//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Service configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind port.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Template version; bumping it invalidates every cached render at once.
    pub template_version: u32,
    /// How long a cached rendered page may be served without re-rendering.
    pub render_freshness: Duration,
    /// TTL for the per-session auth flag (also the cookie max age).
    pub auth_ttl: Duration,
    /// TTL for per-session onboarding progress.
    pub progress_ttl: Duration,
    /// Optional demo password. When set, sign-in requires it; when unset,
    /// any non-empty email+password pair is accepted.
    pub demo_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8788,
            db_path: "./data/insight-hunter.db".to_string(),
            template_version: 1,
            render_freshness: Duration::from_secs(60),
            auth_ttl: Duration::from_secs(30 * 24 * 3600),
            progress_ttl: Duration::from_secs(7 * 24 * 3600),
            demo_password: None,
        }
    }
}

impl AppConfig {
    /// Build a config from environment variables, falling back to defaults.
    /// A variable that is set but unparseable is an error, not a fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_parse("IH_PORT", defaults.port)?,
            db_path: std::env::var("IH_DB_PATH").unwrap_or(defaults.db_path),
            template_version: env_parse("IH_TEMPLATE_VERSION", defaults.template_version)?,
            render_freshness: Duration::from_secs(env_parse(
                "IH_RENDER_FRESHNESS_SECS",
                defaults.render_freshness.as_secs(),
            )?),
            auth_ttl: defaults.auth_ttl,
            progress_ttl: defaults.progress_ttl,
            demo_password: std::env::var("IH_DEMO_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}
