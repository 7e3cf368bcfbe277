//! In-memory stand-ins for the service's collaborators

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use argon2::Params;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    error::{DatabaseError, DatabaseResult},
    token::{TokenConfig, TokenService},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    AppState,
    mailer::{EmailError, EmailSender},
    models::{Account, NewAccount, VerificationEntry},
    password::PasswordService,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{AccountRepository, VerificationLedger},
    service::{AccountService, AdminSignup},
};

#[derive(Debug)]
struct UniqueViolation;

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("duplicate key value violates unique constraint")
    }
}

impl std::error::Error for UniqueViolation {}

impl sqlx::error::DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }
}

#[derive(Default)]
pub struct MemoryAccounts {
    rows: Mutex<Vec<Account>>,
    failing_writes: AtomicBool,
}

impl MemoryAccounts {
    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Make `mark_verified` fail like a lost database connection
    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountRepository for MemoryAccounts {
    async fn create(&self, new_account: &NewAccount) -> DatabaseResult<Account> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|a| a.email == new_account.email || a.username == new_account.username)
        {
            return Err(DatabaseError::Query(sqlx::Error::Database(Box::new(
                UniqueViolation,
            ))));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: new_account.username.clone(),
            email: new_account.email.clone(),
            password_hash: new_account.password_hash.clone(),
            role: new_account.role,
            is_verified: new_account.is_verified,
            balance: Decimal::ZERO,
            is_test_account: new_account.is_test_account,
            created_at: now,
            updated_at: now,
        };
        rows.push(account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Account>> {
        Ok(self.get(id))
    }

    async fn mark_verified(&self, id: Uuid) -> DatabaseResult<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query(sqlx::Error::PoolTimedOut));
        }
        if let Some(account) = self.rows.lock().unwrap().iter_mut().find(|a| a.id == id) {
            account.is_verified = true;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        Ok(rows.len() < before)
    }
}

/// Ledger that applies the TTL at read time, like Redis eviction would
pub struct MemoryLedger {
    entries: Mutex<HashMap<(Uuid, String), VerificationEntry>>,
    ttl_seconds: u64,
}

impl MemoryLedger {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_seconds,
        }
    }

    pub fn code_for(&self, account_id: Uuid) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.account_id == account_id)
            .map(|e| e.code.clone())
    }

    pub fn backdate(&self, account_id: Uuid, created_at: DateTime<Utc>) {
        for entry in self.entries.lock().unwrap().values_mut() {
            if entry.account_id == account_id {
                entry.created_at = created_at;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl VerificationLedger for MemoryLedger {
    async fn store(&self, entry: &VerificationEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert((entry.account_id, entry.code.clone()), entry.clone());
        Ok(())
    }

    async fn consume(&self, account_id: Uuid, code: &str) -> Result<bool> {
        let removed = self
            .entries
            .lock()
            .unwrap()
            .remove(&(account_id, code.to_string()));
        Ok(removed.is_some_and(|e| !e.is_expired(Utc::now(), self.ttl_seconds)))
    }

    async fn discard(&self, entry: &VerificationEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .remove(&(entry.account_id, entry.code.clone()));
        Ok(())
    }
}

/// Records messages instead of sending them; can be told to fail
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::Rejected(503));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

pub struct TestHarness {
    pub service: AccountService,
    pub accounts: Arc<MemoryAccounts>,
    pub ledger: Arc<MemoryLedger>,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: TokenService,
}

impl TestHarness {
    pub fn new() -> Self {
        let accounts = Arc::new(MemoryAccounts::default());
        let ledger = Arc::new(MemoryLedger::new(3600));
        let mailer = Arc::new(RecordingMailer::default());
        let tokens = TokenService::new(&TokenConfig {
            secret: "test-secret".to_string(),
            expiry_seconds: 3600,
        });

        let service = AccountService::new(
            accounts.clone(),
            ledger.clone(),
            mailer.clone(),
            PasswordService::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap()),
            tokens.clone(),
            RateLimiter::new(RateLimiterConfig {
                max_attempts: 3,
                window_seconds: 300,
                ban_duration_seconds: 3600,
            }),
            3600,
        );

        Self {
            service,
            accounts,
            ledger,
            mailer,
            tokens,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            accounts: self.service.clone(),
            tokens: self.tokens.clone(),
            initial_admin: AdminSignup {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "admin123".to_string(),
                is_test_account: true,
            },
        }
    }
}
