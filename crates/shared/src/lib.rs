//! Plant-Vita Shared Types and Utilities
//!
//! Account types, the account store contract and database helpers shared
//! by the Plant-Vita services.

pub mod accounts;
pub mod db;
pub mod error;
pub mod types;

pub use accounts::{AccountStore, InMemoryAccountStore, PgAccountStore};
pub use db::*;
pub use error::*;
pub use types::*;
