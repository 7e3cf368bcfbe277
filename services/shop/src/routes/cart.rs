//! Cart routes; users act on their own cart, administrators may read any

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use common::AuthUser;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{AddItemRequest, UpdateItemRequest, require_product_id, validate_quantity},
    state::AppState,
};

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.carts.get(user.id).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let product_id = require_product_id(payload.product_id)?;
    validate_quantity(payload.quantity)?;

    let cart = state
        .carts
        .add_item(user.id, product_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let product_id = require_product_id(payload.product_id)?;
    let quantity = payload.quantity.unwrap_or(0);
    validate_quantity(quantity)?;

    let cart = state
        .carts
        .update_item(user.id, product_id, quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.carts.remove_item(user.id, product_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.carts.clear(user.id).await?))
}

pub async fn user_cart(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.carts.find(user_id).await?))
}

pub async fn all_carts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.carts.list_all().await?))
}
