use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod mailer;
mod middleware;
mod models;
mod password;
mod rate_limiter;
mod repositories;
mod routes;
mod service;
#[cfg(test)]
mod testing;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
    token::{TokenConfig, TokenService},
};

use crate::{
    config::AuthSettings,
    mailer::{EmailSender, HttpMailer, LogMailer},
    password::PasswordService,
    rate_limiter::RateLimiter,
    repositories::{PgAccountRepository, RedisVerificationLedger},
    service::{AccountService, AdminSignup},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub tokens: TokenService,
    /// Credentials used by the create-initial-admin endpoint
    pub initial_admin: AdminSignup,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting authentication service");

    let settings = AuthSettings::load()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool).await?;

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let tokens = TokenService::new(&TokenConfig::from_env()?);

    let mailer: Arc<dyn EmailSender> = match &settings.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            settings.mail_api_key.clone(),
            settings.mail_from.clone(),
        )),
        None => {
            warn!("AUTH_MAIL_API_URL not set, verification codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let limiter = RateLimiter::new(settings.rate_limiter());
    info!(
        max_attempts = limiter.config().max_attempts,
        window_seconds = limiter.config().window_seconds,
        "Login attempt limiter configured"
    );

    let accounts = AccountService::new(
        Arc::new(PgAccountRepository::new(pool)),
        Arc::new(RedisVerificationLedger::new(
            redis_pool,
            settings.verification_ttl_seconds,
        )),
        mailer,
        PasswordService::new(),
        tokens.clone(),
        limiter,
        settings.verification_ttl_seconds,
    );

    let app_state = AppState {
        accounts,
        tokens,
        initial_admin: AdminSignup {
            username: settings.initial_admin_username.clone(),
            email: settings.initial_admin_email.clone(),
            password: settings.initial_admin_password.clone(),
            is_test_account: true,
        },
    };

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Authentication service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
