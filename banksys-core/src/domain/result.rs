//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Every session and cache operation returns one of these. None of them are
/// fatal: the caller (view layer) decides how to present them.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid credentials, expired/invalid token, or an authorized call made
    /// while unauthenticated
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx response carrying a server-supplied message
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The response was discarded because a newer request or session change won
    #[error("Superseded: {0}")]
    Superseded(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for errors that mean the current token can no longer be used
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Short machine-friendly kind, used for event logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Network(_) => "network",
            Self::Validation(_) => "validation",
            Self::Server { .. } => "server",
            Self::Superseded(_) => "superseded",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_message_verbatim() {
        let err = Error::Server {
            status: 400,
            message: "Insufficient funds".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient funds");
        assert_eq!(err.kind(), "server");
    }

    #[test]
    fn test_is_auth() {
        assert!(Error::auth("Invalid CPF or password").is_auth());
        assert!(!Error::network("timed out").is_auth());
        assert!(Error::validation("bad cpf")
            .to_string()
            .contains("Validation error"));
    }
}
