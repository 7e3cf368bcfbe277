//! Checkout and order history routes

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use common::AuthUser;

use crate::{
    error::{ApiError, ApiResult},
    models::{CheckoutRequest, CheckoutResponse},
    state::AppState,
};

/// Place an order for everything in the caller's cart
pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let address = payload
        .shipping_address
        .ok_or_else(|| ApiError::Validation("Shipping address is required".to_string()))?;
    address.validate()?;

    let (order, user_balance) = state.orders.place_order(user.id, address).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            message: "Order placed".to_string(),
            order,
            user_balance,
        }),
    ))
}

pub async fn my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.orders.list_for_account(user.id).await?))
}

pub async fn all_orders(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.orders.list_all().await?))
}
