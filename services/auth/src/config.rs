//! Service settings loaded from `AUTH_*` environment variables

use ::config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::rate_limiter::RateLimiterConfig;

/// Authentication service settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Listen address
    pub bind_addr: String,
    /// Lifetime of a verification code in seconds
    pub verification_ttl_seconds: u64,
    /// Transactional mail API endpoint; codes are only logged when unset
    #[serde(default)]
    pub mail_api_url: Option<String>,
    #[serde(default)]
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub initial_admin_username: String,
    pub initial_admin_email: String,
    pub initial_admin_password: String,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
    pub login_ban_seconds: u64,
}

impl AuthSettings {
    /// Load settings from defaults overlaid with `AUTH_*` variables,
    /// e.g. `AUTH_BIND_ADDR=127.0.0.1:8080`.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("verification_ttl_seconds", 3600)?
            .set_default("mail_from", "no-reply@storefront.local")?
            .set_default("initial_admin_username", "admin")?
            .set_default("initial_admin_email", "admin@example.com")?
            .set_default("initial_admin_password", "admin123")?
            .set_default("login_max_attempts", 5)?
            .set_default("login_window_seconds", 300)?
            .set_default("login_ban_seconds", 3600)?
            .add_source(Environment::with_prefix("AUTH").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_attempts: self.login_max_attempts,
            window_seconds: self.login_window_seconds,
            ban_duration_seconds: self.login_ban_seconds,
        }
    }
}
