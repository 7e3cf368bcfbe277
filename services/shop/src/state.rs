//! Application state shared across handlers

use std::sync::Arc;

use common::token::TokenService;

use crate::repositories::{AccountRepository, CartRepository, OrderRepository, ProductRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub accounts: Arc<dyn AccountRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
}
