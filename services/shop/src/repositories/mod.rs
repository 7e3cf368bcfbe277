//! Storage seams of the shop service

pub mod accounts;
pub mod carts;
pub mod orders;
pub mod products;

pub use accounts::{AccountRepository, PgAccountRepository};
pub use carts::{CartRepository, PgCartRepository};
pub use orders::{OrderRepository, PgOrderRepository};
pub use products::{PgProductRepository, ProductRepository};
