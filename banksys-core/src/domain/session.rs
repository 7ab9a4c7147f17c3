//! Authenticated session model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::user::User;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
        };
        f.write_str(s)
    }
}

/// The identity and credential held for the current login
///
/// Constructed only through [`Session::authenticated`], [`Session::authenticating`]
/// and [`Session::default`], so `status == Authenticated` always comes with a
/// non-empty token and a present user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    token: Option<String>,
    user: Option<User>,
    status: SessionStatus,
}

impl Session {
    /// An authenticated session, or `None` if either half is missing
    pub fn authenticated(token: impl Into<String>, user: User) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() || !user.is_present() {
            return None;
        }
        Some(Self {
            token: Some(token),
            user: Some(user),
            status: SessionStatus::Authenticated,
        })
    }

    /// A session with a login in flight
    pub fn authenticating() -> Self {
        Self {
            token: None,
            user: None,
            status: SessionStatus::Authenticating,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Replace the identity record while keeping the credential
    pub(crate) fn with_user(mut self, user: User) -> Self {
        if self.is_authenticated() && user.is_present() {
            self.user = Some(user);
        }
        self
    }

    /// The credential to present on authorized requests
    pub fn credential(&self) -> BearerCredential {
        match (&self.status, &self.token) {
            (SessionStatus::Authenticated, Some(token)) => BearerCredential(Some(token.clone())),
            _ => BearerCredential(None),
        }
    }
}

/// Bearer credential, possibly empty
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BearerCredential(Option<String>);

impl BearerCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> Option<String> {
        self.0.as_ref().map(|t| format!("Bearer {}", t))
    }
}

// Tokens never end up in logs or panics
impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("BearerCredential(<redacted>)"),
            None => f.write_str("BearerCredential(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("u1", "12345678901", "Maria Silva Santos", "maria@email.com")
    }

    #[test]
    fn test_default_session_is_unauthenticated() {
        let session = Session::default();
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(session.credential().is_empty());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_authenticated_requires_token_and_user() {
        assert!(Session::authenticated("", user()).is_none());
        let nameless = User::new("", "12345678901", "x", "x@y.zz");
        assert!(Session::authenticated("t1", nameless).is_none());

        let session = Session::authenticated("t1", user()).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.credential().header_value(), Some("Bearer t1".to_string()));
    }

    #[test]
    fn test_authenticating_has_no_credential() {
        let session = Session::authenticating();
        assert_eq!(session.status(), SessionStatus::Authenticating);
        assert!(session.credential().is_empty());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = BearerCredential::new("secret-token");
        assert!(!format!("{:?}", cred).contains("secret-token"));
    }

    #[test]
    fn test_serialized_session_omits_token() {
        let session = Session::authenticated("t1", user()).unwrap();
        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("t1\""));
        assert!(json.contains("authenticated"));
    }
}
