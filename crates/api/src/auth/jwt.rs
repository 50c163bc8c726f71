//! JWT token generation and validation

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Wire value of the `type` claim on refresh tokens
const REFRESH_MARKER: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Authorizes API calls; carries no `type` claim
    Access,
    /// Authorizes minting a new pair only
    Refresh,
}

impl TokenKind {
    fn marker(self) -> Option<&'static str> {
        match self {
            TokenKind::Access => None,
            TokenKind::Refresh => Some(REFRESH_MARKER),
        }
    }
}

/// Claims to be signed. Built only through [`ClaimSet::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    subject: String,
    kind: TokenKind,
}

impl ClaimSet {
    pub fn builder() -> ClaimSetBuilder {
        ClaimSetBuilder::default()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

#[derive(Debug, Default)]
pub struct ClaimSetBuilder {
    subject: Option<String>,
    kind: Option<TokenKind>,
}

impl ClaimSetBuilder {
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn kind(mut self, kind: TokenKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn build(self) -> Result<ClaimSet, TokenError> {
        let subject = self
            .subject
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MissingClaim("sub"))?;
        let kind = self.kind.ok_or(TokenError::MissingClaim("type"))?;
        Ok(ClaimSet { subject, kind })
    }
}

/// Claims as they appear on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account email)
    pub sub: Option<String>,
    /// Expiration
    pub exp: i64,
    /// Issued at
    pub iat: Option<i64>,
    /// JWT ID, unique per minted token
    pub jti: Option<String>,
    /// Token type marker, present only on refresh tokens
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Claims {
    /// Kind of token these claims came from; `None` for an unknown marker
    pub fn kind(&self) -> Option<TokenKind> {
        match self.token_type.as_deref() {
            None => Some(TokenKind::Access),
            Some(REFRESH_MARKER) => Some(TokenKind::Refresh),
            Some(_) => None,
        }
    }
}

/// Signs and verifies bearer tokens with a server-held HMAC secret
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    leeway_secs: u64,
}

impl TokenCodec {
    /// Create a codec. Only the HMAC family is accepted, and the secret must
    /// be non-empty.
    pub fn new(secret: &str, algorithm: Algorithm) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::UnsupportedAlgorithm(algorithm));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            leeway_secs: 0,
        })
    }

    /// Tolerate this much clock skew when checking `exp`
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Sign `claims`, expiring `ttl` from now
    pub fn encode(&self, claims: &ClaimSet, ttl: Duration) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| TokenError::Encoding(format!("lifetime {ttl} out of range")))?;
        self.encode_at(claims, now, expires_at)
    }

    fn encode_at(
        &self,
        claims: &ClaimSet,
        issued_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let wire = Claims {
            sub: Some(claims.subject.clone()),
            exp: expires_at.unix_timestamp(),
            iat: Some(issued_at.unix_timestamp()),
            jti: Some(Uuid::new_v4().to_string()),
            token_type: claims.kind.marker().map(str::to_string),
        };

        encode(&Header::new(self.algorithm), &wire, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature, then expiry, and return the claims
    ///
    /// A token is live only while `exp` is strictly after now (less leeway).
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        // Explicit algorithm prevents algorithm confusion attacks
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        // jsonwebtoken only rejects `exp < now`
        let leeway = i64::try_from(self.leeway_secs).unwrap_or(i64::MAX);
        let cutoff = OffsetDateTime::now_utc().unix_timestamp().saturating_sub(leeway);
        if claims.exp <= cutoff {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Token is malformed")]
    Malformed,
    #[error("Signing secret is empty")]
    EmptySecret,
    #[error("Unsupported signing algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}
