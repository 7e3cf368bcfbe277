//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::AuthUser;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::AuthError,
    middleware::{admin_middleware, auth_middleware},
    models::AccountResponse,
    service::{AdminSignup, InitialAdmin, IssuedToken},
};

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response for account creation
#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Request for email verification
#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response carrying a bearer token
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        TokenResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
        }
    }
}

/// Request for administrator creation
#[derive(Deserialize)]
pub struct RegisterAdminRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_test_account: bool,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/auth/register-admin", post(register_admin))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/login", post(login))
        .route("/auth/create-initial-admin", post(create_initial_admin))
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user_id = state
        .accounts
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created. Check your email for the verification code.".to_string(),
            user_id,
        }),
    ))
}

/// Email verification endpoint
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let issued = state.accounts.verify(&payload.email, &payload.code).await?;
    Ok(Json(TokenResponse::from(issued)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let issued = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(TokenResponse::from(issued)))
}

/// Current account endpoint
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AuthError> {
    let account = state.accounts.current_account(user.id).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// Administrator creation endpoint
pub async fn register_admin(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAdminRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user_id = state
        .accounts
        .register_admin(&AdminSignup {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            is_test_account: payload.is_test_account,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Administrator created".to_string(),
            user_id,
        }),
    ))
}

/// Bootstrap the first administrator from configured credentials
pub async fn create_initial_admin(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuthError> {
    let outcome = state
        .accounts
        .create_initial_admin(&state.initial_admin)
        .await?;

    let (status, message, user_id) = match outcome {
        InitialAdmin::Created(id) => (StatusCode::CREATED, "Administrator created", id),
        InitialAdmin::AlreadyExists(id) => (StatusCode::OK, "Administrator already exists", id),
    };

    Ok((
        status,
        Json(serde_json::json!({
            "message": message,
            "user_id": user_id,
            "email": state.initial_admin.email,
        })),
    ))
}
