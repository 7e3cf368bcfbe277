//! Registration, verification and login flows
//!
//! Registration is not transactional. When the code cannot be delivered the
//! new account and its verification entry are deleted again; a crash between
//! creating the account and that cleanup leaves an unverified account behind.

use std::sync::Arc;

use common::{Role, token::TokenService};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    mailer::{EmailSender, verification_email},
    models::{Account, NewAccount, VerificationEntry, verification::normalize_code},
    password::PasswordService,
    rate_limiter::RateLimiter,
    repositories::{AccountRepository, VerificationLedger},
    validation,
};

/// A signed bearer token and its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Credentials for an account created by an operator or an administrator
#[derive(Debug, Clone)]
pub struct AdminSignup {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Pre-verified and exempt from the email round-trip
    pub is_test_account: bool,
}

/// Outcome of the initial-administrator bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialAdmin {
    Created(Uuid),
    AlreadyExists(Uuid),
}

#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn VerificationLedger>,
    mailer: Arc<dyn EmailSender>,
    passwords: PasswordService,
    tokens: TokenService,
    limiter: RateLimiter,
    verification_ttl_seconds: u64,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn VerificationLedger>,
        mailer: Arc<dyn EmailSender>,
        passwords: PasswordService,
        tokens: TokenService,
        limiter: RateLimiter,
        verification_ttl_seconds: u64,
    ) -> Self {
        Self {
            accounts,
            ledger,
            mailer,
            passwords,
            tokens,
            limiter,
            verification_ttl_seconds,
        }
    }

    /// Register a standard account and email it a verification code
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AuthError> {
        let (username, email) = (username.trim(), email.trim());
        validation::validate_signup(username, email, password).map_err(AuthError::Validation)?;

        info!("Registering account: {}", email);

        let account = self
            .create_account(username, email, password, Role::Standard, false)
            .await?;
        self.send_verification(&account).await?;

        Ok(account.id)
    }

    /// Create an administrator. Test accounts skip verification entirely.
    pub async fn register_admin(&self, signup: &AdminSignup) -> Result<Uuid, AuthError> {
        let (username, email) = (signup.username.trim(), signup.email.trim());
        validation::validate_signup(username, email, &signup.password)
            .map_err(AuthError::Validation)?;

        info!(
            "Registering administrator: {} (test account: {})",
            email, signup.is_test_account
        );

        let account = self
            .create_account(
                username,
                email,
                &signup.password,
                Role::Administrator,
                signup.is_test_account,
            )
            .await?;

        if !signup.is_test_account {
            self.send_verification(&account).await?;
        }

        Ok(account.id)
    }

    /// Create the bootstrap administrator unless its email is already registered
    pub async fn create_initial_admin(&self, signup: &AdminSignup) -> Result<InitialAdmin, AuthError> {
        if let Some(existing) = self.accounts.find_by_email(&signup.email).await? {
            info!("Initial administrator already exists");
            return Ok(InitialAdmin::AlreadyExists(existing.id));
        }

        let id = self
            .register_admin(&AdminSignup {
                is_test_account: true,
                ..signup.clone()
            })
            .await?;
        Ok(InitialAdmin::Created(id))
    }

    /// Confirm an email address with its one-time code
    pub async fn verify(&self, email: &str, code: &str) -> Result<IssuedToken, AuthError> {
        let email = email.trim();
        if email.is_empty() || code.trim().is_empty() {
            return Err(AuthError::Validation(
                "Email and code are required".to_string(),
            ));
        }

        if !self.limiter.is_allowed(&format!("verify:{}", email)).await {
            return Err(AuthError::TooManyRequests);
        }

        let account = self
            .accounts
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound("Account"))?;

        let code = normalize_code(code);
        let consumed = self
            .ledger
            .consume(account.id, &code)
            .await
            .map_err(|e| {
                error!("Failed to consume verification code: {}", e);
                AuthError::InternalServerError
            })?;

        if !consumed {
            warn!(account_id = %account.id, "Rejected verification code");
            return Err(AuthError::InvalidCode);
        }

        if let Err(e) = self.accounts.mark_verified(account.id).await {
            // Put the code back so the user can retry
            let entry = VerificationEntry {
                code,
                ..VerificationEntry::issue(account.id)
            };
            if let Err(restore) = self.ledger.store(&entry).await {
                error!(account_id = %account.id, "Failed to restore verification code: {}", restore);
            }
            return Err(e.into());
        }
        info!(account_id = %account.id, "Email verified");

        self.issue_token(&account)
    }

    /// Exchange credentials for a token
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let limiter_key = format!("login:{}", email);
        if !self.limiter.is_allowed(&limiter_key).await {
            return Err(AuthError::TooManyRequests);
        }

        let account = self
            .accounts
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify(password, &account.password_hash) {
            warn!(account_id = %account.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        if !account.can_log_in() {
            return Err(AuthError::Unverified {
                account_id: account.id,
            });
        }

        self.limiter.reset(&limiter_key).await;
        info!(account_id = %account.id, "Login successful");

        self.issue_token(&account)
    }

    /// Look up the caller's own account
    pub async fn current_account(&self, id: Uuid) -> Result<Account, AuthError> {
        self.accounts
            .find_by_id(id)
            .await?
            .ok_or(AuthError::NotFound("Account"))
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
        is_test_account: bool,
    ) -> Result<Account, AuthError> {
        if self.accounts.find_by_email(email).await?.is_some() {
            return Err(AuthError::Duplicate(
                "An account with this email already exists".to_string(),
            ));
        }

        let new_account = NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: self.passwords.hash(password)?,
            role,
            is_verified: is_test_account,
            is_test_account,
        };

        self.accounts.create(&new_account).await.map_err(|e| {
            if e.is_unique_violation() {
                AuthError::Duplicate("Username or email already taken".to_string())
            } else {
                AuthError::Database(e)
            }
        })
    }

    /// Store a fresh code and email it, undoing the registration on failure
    async fn send_verification(&self, account: &Account) -> Result<(), AuthError> {
        let entry = VerificationEntry::issue(account.id);

        if let Err(e) = self.ledger.store(&entry).await {
            error!("Failed to store verification code: {}", e);
            self.remove_account(account.id).await;
            return Err(AuthError::InternalServerError);
        }

        let (subject, body) = verification_email(&entry.code, self.verification_ttl_seconds);
        if let Err(e) = self.mailer.send(&account.email, &subject, &body).await {
            warn!(account_id = %account.id, "Verification email failed, rolling back registration");
            if let Err(discard_err) = self.ledger.discard(&entry).await {
                error!("Failed to discard verification code: {}", discard_err);
            }
            self.remove_account(account.id).await;
            return Err(AuthError::Delivery(e));
        }

        Ok(())
    }

    async fn remove_account(&self, id: Uuid) {
        if let Err(e) = self.accounts.delete(id).await {
            error!(account_id = %id, "Failed to roll back account: {}", e);
        }
    }

    fn issue_token(&self, account: &Account) -> Result<IssuedToken, AuthError> {
        let token = self.tokens.issue(account.id, account.role).map_err(|e| {
            error!("Failed to issue token: {}", e);
            AuthError::InternalServerError
        })?;

        Ok(IssuedToken {
            token,
            expires_in: self.tokens.expiry_seconds(),
        })
    }
}
