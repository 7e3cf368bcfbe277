//! One-time email verification codes

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a verification code
pub const CODE_LENGTH: usize = 4;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A code proving ownership of an account's email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationEntry {
    /// Create an entry with a freshly generated code
    pub fn issue(account_id: Uuid) -> Self {
        VerificationEntry {
            id: Uuid::new_v4(),
            account_id,
            code: generate_code(),
            created_at: Utc::now(),
        }
    }

    pub fn expires_at(&self, ttl_seconds: u64) -> DateTime<Utc> {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        self.created_at + Duration::seconds(ttl)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_seconds: u64) -> bool {
        now >= self.expires_at(ttl_seconds)
    }
}

/// Generate a 4-character uppercase alphanumeric code
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Normalize user input before comparing against a stored code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
