//! Catalog routes

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{NewProduct, UpdateProduct},
    state::AppState,
};

pub async fn list_products(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.products.list().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let product = state
        .products
        .find(id)
        .await?
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    let price = payload.validate()?;
    let product = state.products.create(&payload, price).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProduct>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    Ok(Json(state.products.update(id, &payload).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.products.delete(id).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}
