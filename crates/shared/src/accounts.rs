//! Account storage
//!
//! The auth subsystem reaches accounts only through [`AccountStore`]. Email
//! uniqueness is the store's job: `insert_account` must reject a second
//! insert for the same email with [`StoreError::DuplicateEmail`] atomically,
//! which is what lets concurrent first-time social logins converge on one row.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::types::{Account, AccountId};

/// Account store collaborator
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look an account up by its (already normalized) email
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account, failing with `DuplicateEmail` if the email is taken
    async fn insert_account(&self, email: &str, password_hash: &str)
        -> Result<Account, StoreError>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// PostgreSQL-backed store over the `accounts` table
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self))]
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self, password_hash))]
    async fn insert_account(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, StoreError> {
        // The unique index on accounts.email makes this insert-if-absent atomic
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(AccountId::new())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = StoreError::from(e);
            if matches!(err, StoreError::DuplicateEmail) {
                debug!(email = %email, "Insert rejected by unique email constraint");
            }
            err
        })?;

        Ok(account)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory store for development and tests
///
/// A single mutex guards the map, so the existence check and the insert in
/// `insert_account` happen under one lock acquisition.
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored accounts
    pub fn account_count(&self) -> usize {
        self.accounts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Drop an account, as an admin deletion would
    pub fn remove_account(&self, email: &str) -> Option<Account> {
        self.accounts.lock().ok()?.remove(email)
    }

    fn poisoned() -> StoreError {
        warn!("In-memory account store lock poisoned");
        StoreError::Unavailable("account store lock poisoned".to_string())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().map_err(|_| Self::poisoned())?;
        Ok(accounts.get(email).cloned())
    }

    async fn insert_account(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().map_err(|_| Self::poisoned())?;
        if accounts.contains_key(email) {
            debug!(email = %email, "Account already exists in memory");
            return Err(StoreError::DuplicateEmail);
        }

        let account = Account {
            id: AccountId::new(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        accounts.insert(email.to_string(), account.clone());
        Ok(account)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
