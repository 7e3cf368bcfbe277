//! Service settings loaded from `SHOP_*` environment variables

use ::config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ShopSettings {
    /// Listen address
    pub bind_addr: String,
}

impl ShopSettings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:3001")?
            .add_source(Environment::with_prefix("SHOP").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
