//! Storage seams of the authentication service

pub mod account;
pub mod verification;

pub use account::{AccountRepository, PgAccountRepository};
pub use verification::{RedisVerificationLedger, VerificationLedger};
