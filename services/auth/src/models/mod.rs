//! Authentication service models

pub mod account;
pub mod verification;

pub use account::{Account, AccountResponse, NewAccount};
pub use verification::VerificationEntry;
