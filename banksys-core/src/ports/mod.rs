//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The session and
//! cache services depend only on these traits, not on concrete implementations.

mod banking_api;
mod storage;

pub use banking_api::BankingApi;
pub use storage::{KeyValueStore, AUTH_TOKEN_KEY, USER_DATA_KEY};
