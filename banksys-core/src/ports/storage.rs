//! Persisted key-value storage port
//!
//! Browser local storage, mobile async storage and a file on disk all fit
//! behind this capability, which keeps the session manager storage-agnostic.

use crate::domain::result::Result;

/// Key holding the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key holding the serialized user record
pub const USER_DATA_KEY: &str = "user_data";

/// Minimal persisted key-value capability
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}
