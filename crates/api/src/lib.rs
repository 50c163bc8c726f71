//! Plant-Vita API Library
//!
//! Authentication and session lifecycle for the Plant-Vita backend, plus the
//! HTTP routes that expose it.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{AuthConfig, Config};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
