//! Verification ledger backed by Redis
//!
//! Each entry is its own key, `verification:<account>:<code>`, written with a
//! TTL. Redis evicts stale entries, and consuming an entry is a single `DEL`.

use anyhow::Result;
use async_trait::async_trait;
use common::cache::RedisPool;
use tracing::info;
use uuid::Uuid;

use crate::models::VerificationEntry;

#[async_trait]
pub trait VerificationLedger: Send + Sync {
    /// Persist an entry until its TTL elapses
    async fn store(&self, entry: &VerificationEntry) -> Result<()>;

    /// Remove the entry matching `account_id` and `code`.
    /// Returns false when no live entry matches.
    async fn consume(&self, account_id: Uuid, code: &str) -> Result<bool>;

    /// Drop an entry without using it
    async fn discard(&self, entry: &VerificationEntry) -> Result<()>;
}

fn entry_key(account_id: Uuid, code: &str) -> String {
    format!("verification:{}:{}", account_id, code)
}

#[derive(Clone)]
pub struct RedisVerificationLedger {
    redis: RedisPool,
    ttl_seconds: u64,
}

impl RedisVerificationLedger {
    pub fn new(redis: RedisPool, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl VerificationLedger for RedisVerificationLedger {
    async fn store(&self, entry: &VerificationEntry) -> Result<()> {
        let value = serde_json::to_string(entry)?;
        self.redis
            .set(
                &entry_key(entry.account_id, &entry.code),
                &value,
                Some(self.ttl_seconds),
            )
            .await?;

        info!(account_id = %entry.account_id, "Verification code stored");
        Ok(())
    }

    async fn consume(&self, account_id: Uuid, code: &str) -> Result<bool> {
        self.redis.delete(&entry_key(account_id, code)).await
    }

    async fn discard(&self, entry: &VerificationEntry) -> Result<()> {
        self.redis
            .delete(&entry_key(entry.account_id, &entry.code))
            .await?;
        Ok(())
    }
}
