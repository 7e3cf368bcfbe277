use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod checkout;
mod config;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use common::{
    database::{self, DatabaseConfig},
    token::{TokenConfig, TokenService},
};

use crate::{
    config::ShopSettings,
    repositories::{
        PgAccountRepository, PgCartRepository, PgOrderRepository, PgProductRepository,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting shop service");

    let settings = ShopSettings::load()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool).await?;

    let app_state = AppState {
        tokens: TokenService::new(&TokenConfig::from_env()?),
        accounts: Arc::new(PgAccountRepository::new(pool.clone())),
        products: Arc::new(PgProductRepository::new(pool.clone())),
        carts: Arc::new(PgCartRepository::new(pool.clone())),
        orders: Arc::new(PgOrderRepository::new(pool)),
    };

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Shop service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
