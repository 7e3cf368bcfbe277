//! HTTP routes of the shop service

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
};

use crate::{
    middleware::{admin_middleware, auth_middleware},
    state::AppState,
};

pub mod cart;
pub mod orders;
pub mod products;
pub mod users;

/// Create the router for the shop service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/products", post(products::create_product))
        .route(
            "/products/:id",
            patch(products::update_product).delete(products::delete_product),
        )
        .route("/cart/user/:user_id", get(cart::user_cart))
        .route("/cart/all", get(cart::all_carts))
        .route("/orders", get(orders::all_orders))
        .route("/users", get(users::list_users))
        .route("/users/balance/:id", put(users::adjust_balance))
        .route("/users/:id/role", put(users::change_role))
        .route("/users/:id", delete(users::delete_user))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_item))
        .route("/cart/update", put(cart::update_item))
        .route("/cart/remove/:product_id", delete(cart::remove_item))
        .route("/cart/clear", delete(cart::clear_cart))
        .route("/orders", post(orders::checkout))
        .route("/orders/my", get(orders::my_orders))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "shop-service"
    }))
}
