//! Middleware for bearer token validation and role gating

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

use crate::{AppState, error::AuthError};

/// Validate the bearer token and put the caller's [`AuthUser`] in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;

    let user = state.tokens.authenticate(bearer.token()).map_err(|e| {
        warn!("Failed to validate token: {}", e);
        AuthError::Unauthorized
    })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Reject callers that are not administrators. Must run after [`auth_middleware`].
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::Unauthorized)?;

    if !user.is_admin() {
        warn!(account_id = %user.id, "Administrator route refused");
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(req).await)
}
