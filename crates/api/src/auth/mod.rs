//! Authentication module for Plant-Vita

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod sessions;

pub use jwt::{ClaimSet, Claims, TokenCodec, TokenError, TokenKind};
pub use middleware::{bearer_token, require_auth, AuthUser};
pub use password::{CredentialHasher, HasherConfig, PasswordError};
pub use sessions::{AuthError, SessionPolicy, SessionService, TokenPair, SOCIAL_ACCESS_TTL};
