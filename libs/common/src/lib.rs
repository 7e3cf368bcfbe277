//! Shared infrastructure for the storefront services
//!
//! PostgreSQL pooling and migrations, the Redis client used for expiring
//! data, and the bearer-token primitive both services trust.

pub mod cache;
pub mod database;
pub mod error;
pub mod token;

pub use token::{AuthUser, Role};
