//! Application configuration

use std::{env, fmt, str::FromStr};

use jsonwebtoken::Algorithm;

use crate::auth::{CredentialHasher, HasherConfig};

/// Longest accepted access token lifetime (one year)
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 60 * 24 * 365;

/// Longest accepted refresh token lifetime (ten years)
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365 * 10;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Logging
    pub log_json: bool,

    // Authentication
    pub auth: AuthConfig,
}

/// Settings for token issuance and credential hashing
#[derive(Clone)]
pub struct AuthConfig {
    pub signing_secret: String,
    pub algorithm: Algorithm,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    /// Shared secret the front-end presents when relaying a social login
    pub social_api_key: String,
    pub hasher: HasherConfig,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("social_api_key", &"<redacted>")
            .field("hasher", &self.hasher)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let algorithm_name = vars.or("AUTH_ALG", "HS256");
        let algorithm = Algorithm::from_str(algorithm_name.trim())
            .ok()
            .filter(|alg| matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
            .ok_or(ConfigError::UnsupportedAlgorithm(algorithm_name))?;

        let defaults = HasherConfig::default();
        let hasher = HasherConfig {
            memory_kib: vars.parse_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: vars.parse_or("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: vars.parse_or("HASH_PARALLELISM", defaults.parallelism)?,
        };
        CredentialHasher::new(hasher).map_err(|e| ConfigError::Invalid {
            key: "HASH_*",
            reason: e.to_string(),
        })?;

        Ok(Self {
            // Server
            bind_address: vars.or("BIND_ADDRESS", "0.0.0.0:8000"),

            // Database
            database_url: vars.required("DATABASE_URL")?,
            database_max_connections: vars.parse_or("DATABASE_MAX_CONNECTIONS", 5)?,

            // Logging
            log_json: vars
                .or("LOG_FORMAT", "text")
                .eq_ignore_ascii_case("json"),

            // Authentication
            auth: AuthConfig {
                signing_secret: vars.required("AUTH_KEY")?,
                algorithm,
                access_token_minutes: vars.lifetime_or(
                    "AUTH_TOKEN_EXPIRE",
                    30,
                    MAX_ACCESS_TOKEN_MINUTES,
                )?,
                refresh_token_days: vars.lifetime_or(
                    "AUTH_REFRESH_EXPIRE_DAYS",
                    7,
                    MAX_REFRESH_TOKEN_DAYS,
                )?,
                social_api_key: vars.required("API_SECRET_KEY")?,
                hasher,
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        match (self.0)(key) {
            None => Err(ConfigError::Missing(key)),
            Some(value) if value.trim().is_empty() => Err(ConfigError::Empty(key)),
            Some(value) => Ok(value),
        }
    }

    fn or(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match (self.0)(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }),
        }
    }

    fn lifetime_or(&self, key: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
        let value = self.parse_or(key, default)?;
        if value <= 0 {
            return Err(ConfigError::Invalid {
                key,
                reason: "must be greater than zero".to_string(),
            });
        }
        if value > max {
            return Err(ConfigError::Invalid {
                key,
                reason: format!("must be at most {max}"),
            });
        }
        Ok(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Environment variable must not be empty: {0}")]
    Empty(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("Unsupported signing algorithm: {0} (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),
}
