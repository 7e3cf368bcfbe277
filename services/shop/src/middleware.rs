//! Bearer token validation and role gating

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::AuthUser;
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Validate the bearer token issued by the auth service and expose the caller
/// as an [`AuthUser`] extension
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let user = state.tokens.authenticate(bearer.token()).map_err(|e| {
        warn!("Failed to validate token: {}", e);
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Only administrators pass. Layer it inside [`auth_middleware`].
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthorized)?;

    if !user.is_admin() {
        warn!(account_id = %user.id, path = %req.uri().path(), "Administrator route refused");
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
