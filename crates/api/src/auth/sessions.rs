//! Session lifecycle: registration, password and social login, refresh, and
//! principal resolution.
//!
//! Sessions are stateless. Everything a request needs is in the signed
//! token, and the only shared mutable resource is the account store.

use std::sync::Arc;

use plantvita_shared::{normalize_email, Account, AccountStore, StoreError};
use serde::Serialize;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::jwt::{ClaimSet, TokenCodec, TokenError, TokenKind};
use super::password::CredentialHasher;
use crate::config::{AuthConfig, ConfigError, MAX_ACCESS_TOKEN_MINUTES, MAX_REFRESH_TOKEN_DAYS};

/// Access lifetime for social logins, independent of the configured default
pub const SOCIAL_ACCESS_TTL: Duration = Duration::minutes(15);

/// The unit returned on every successful authentication event
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// Token lifetimes and the trusted-caller secret
#[derive(Clone)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub social_api_key: String,
}

/// Issues, refreshes and resolves sessions
pub struct SessionService {
    store: Arc<dyn AccountStore>,
    codec: TokenCodec,
    hasher: CredentialHasher,
    policy: SessionPolicy,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        codec: TokenCodec,
        hasher: CredentialHasher,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            codec,
            hasher,
            policy,
        }
    }

    /// Build the service from validated configuration
    pub fn from_config(
        store: Arc<dyn AccountStore>,
        config: &AuthConfig,
    ) -> Result<Self, ConfigError> {
        let codec = TokenCodec::new(&config.signing_secret, config.algorithm).map_err(|e| {
            ConfigError::Invalid {
                key: "AUTH_KEY",
                reason: e.to_string(),
            }
        })?;
        let hasher = CredentialHasher::new(config.hasher).map_err(|e| ConfigError::Invalid {
            key: "HASH_*",
            reason: e.to_string(),
        })?;
        let access_minutes = bounded_lifetime(
            "AUTH_TOKEN_EXPIRE",
            config.access_token_minutes,
            MAX_ACCESS_TOKEN_MINUTES,
        )?;
        let refresh_days = bounded_lifetime(
            "AUTH_REFRESH_EXPIRE_DAYS",
            config.refresh_token_days,
            MAX_REFRESH_TOKEN_DAYS,
        )?;

        Ok(Self::new(
            store,
            codec,
            hasher,
            SessionPolicy {
                access_ttl: Duration::minutes(access_minutes),
                refresh_ttl: Duration::days(refresh_days),
                social_api_key: config.social_api_key.clone(),
            },
        ))
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Create an account with a password
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required"));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required"));
        }

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let password_hash = blocking(move || hasher.hash(&password))
            .await?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        // The store's unique constraint decides, not a prior lookup
        let account = self
            .store
            .insert_account(&email, &password_hash)
            .await
            .map_err(|e| {
                if matches!(e, StoreError::DuplicateEmail) {
                    info!(email = %email, "register: Email already registered");
                }
                AuthError::from(e)
            })?;

        info!(account_id = %account.id, "register: Account created");
        Ok(account)
    }

    /// Exchange a username (email) and password for a token pair
    ///
    /// An unknown account and a wrong password produce the same error.
    #[instrument(skip(self, secret))]
    pub async fn login_password(&self, username: &str, secret: &str) -> Result<TokenPair, AuthError> {
        let email = normalize_email(username);

        let Some(account) = self.store.find_account_by_email(&email).await? else {
            warn!(email = %email, "login: Account not found");
            return Err(AuthError::InvalidCredentials);
        };

        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        let digest = account.password_hash.clone();
        let valid = blocking(move || hasher.verify(&secret, &digest)).await?;

        if !valid {
            warn!(account_id = %account.id, "login: Invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(account_id = %account.id, "login: Password verified");
        self.issue_pair(&account.email, self.policy.access_ttl)
    }

    /// Admit a login asserted by a trusted caller (the web front-end after a
    /// third-party sign-in), provisioning the account on first sight
    #[instrument(skip(self, caller_api_key))]
    pub async fn login_social(
        &self,
        asserted_email: &str,
        caller_api_key: &str,
    ) -> Result<TokenPair, AuthError> {
        if !constant_time_compare(caller_api_key, &self.policy.social_api_key) {
            warn!("social login: Untrusted caller key");
            return Err(AuthError::UntrustedCaller);
        }

        let email = normalize_email(asserted_email);
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required"));
        }

        let account = match self.store.find_account_by_email(&email).await? {
            Some(account) => account,
            None => self.provision_social_account(&email).await?,
        };

        info!(account_id = %account.id, "social login: Admitted");
        self.issue_pair(&account.email, SOCIAL_ACCESS_TTL)
    }

    async fn provision_social_account(&self, email: &str) -> Result<Account, AuthError> {
        let hasher = self.hasher.clone();
        let sentinel = blocking(move || hasher.sentinel())
            .await?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        match self.store.insert_account(email, &sentinel).await {
            Ok(account) => {
                info!(account_id = %account.id, "social login: Provisioned account");
                Ok(account)
            }
            Err(StoreError::DuplicateEmail) => {
                // A concurrent request created it first
                debug!(email = %email, "social login: Lost provisioning race, re-fetching");
                self.store.find_account_by_email(email).await?.ok_or_else(|| {
                    error!(email = %email, "social login: Account missing after duplicate insert");
                    AuthError::StoreUnavailable("account missing after duplicate insert".to_string())
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mint a fresh pair from a refresh token
    ///
    /// The presented token is not invalidated and stays usable until it
    /// expires.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode(refresh_token).map_err(|e| {
            debug!(reason = %e, "refresh: Token rejected");
            AuthError::InvalidToken(e)
        })?;

        if claims.kind() != Some(TokenKind::Refresh) {
            debug!(token_type = ?claims.token_type, "refresh: Not a refresh token");
            return Err(AuthError::WrongTokenKind);
        }

        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::InvalidToken(TokenError::Malformed))?;

        let account = self
            .store
            .find_account_by_email(&subject)
            .await?
            .ok_or_else(|| {
                warn!(email = %subject, "refresh: Account no longer exists");
                AuthError::AccountGone
            })?;

        self.issue_pair(&account.email, self.policy.access_ttl)
    }

    /// Map a bearer access token to its account
    ///
    /// Every failure except a store fault is `Unauthenticated`, including a
    /// valid token whose account has since been deleted.
    pub async fn resolve(&self, bearer_token: &str) -> Result<Account, AuthError> {
        let claims = self.codec.decode(bearer_token).map_err(|e| {
            debug!(reason = %e, "resolve: Token rejected");
            AuthError::Unauthenticated
        })?;

        if claims.kind() != Some(TokenKind::Access) {
            debug!("resolve: Refresh token presented as bearer");
            return Err(AuthError::Unauthenticated);
        }

        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        self.store
            .find_account_by_email(&subject)
            .await?
            .ok_or_else(|| {
                debug!(email = %subject, "resolve: Account no longer exists");
                AuthError::Unauthenticated
            })
    }

    fn issue_pair(&self, subject: &str, access_ttl: Duration) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.mint(subject, TokenKind::Access, access_ttl)?,
            refresh_token: self.mint(subject, TokenKind::Refresh, self.policy.refresh_ttl)?,
            token_type: "bearer",
        })
    }

    fn mint(&self, subject: &str, kind: TokenKind, ttl: Duration) -> Result<String, AuthError> {
        ClaimSet::builder()
            .subject(subject)
            .kind(kind)
            .build()
            .and_then(|claims| self.codec.encode(&claims, ttl))
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

fn bounded_lifetime(key: &'static str, value: i64, max: i64) -> Result<i64, ConfigError> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!("must be between 1 and {max}"),
        })
    }
}

/// Run CPU-bound hashing off the async workers
async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    // Even when lengths differ, do constant-time work to avoid leaking length
    if a.len() != b.len() {
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Untrusted caller")]
    UntrustedCaller,
    /// The codec reason is kept for logs only
    #[error("Invalid or expired token")]
    InvalidToken(TokenError),
    #[error("Wrong token type")]
    WrongTokenKind,
    #[error("Account no longer exists")]
    AccountGone,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Account store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Validation error: {0}")]
    Validation(&'static str),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Unavailable(msg) => {
                error!(error = %msg, "Account store unavailable");
                AuthError::StoreUnavailable(msg)
            }
        }
    }
}
