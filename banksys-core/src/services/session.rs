//! Session manager - login, logout and session restore
//!
//! Owns the persisted session cache. State changes go through the shared
//! [`StateStore`] so the snapshot is dropped in the same write that ends a
//! session.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{BearerCredential, LoginRequest, RegisterRequest, Session, User};
use crate::ports::{BankingApi, KeyValueStore, AUTH_TOKEN_KEY, USER_DATA_KEY};
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::state::StateStore;

pub struct SessionManager {
    api: Arc<dyn BankingApi>,
    storage: Arc<dyn KeyValueStore>,
    state: Arc<StateStore>,
    logger: Option<Arc<LoggingService>>,
    /// Serializes session boundaries with the persisted-cache writes that
    /// belong to them
    commit: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn BankingApi>,
        storage: Arc<dyn KeyValueStore>,
        state: Arc<StateStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            api,
            storage,
            state,
            logger,
            commit: Mutex::new(()),
        }
    }

    fn commit_guard(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Authenticate with a CPF and password
    ///
    /// Any previous session and snapshot are discarded before the request is
    /// sent. On failure nothing is left behind, in memory or on disk.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session> {
        let request = LoginRequest::new(identifier, secret)?;

        let epoch = {
            let _guard = self.commit_guard();
            let epoch = self.state.begin_login();
            self.clear_persisted();
            epoch
        };
        debug!(epoch, "login started");

        let response = match self.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                let err = login_error(e);
                let _guard = self.commit_guard();
                if self.state.fail_login(epoch) {
                    debug!(epoch, kind = err.kind(), "login failed");
                    self.record(
                        LogEvent::new("login_failed")
                            .with_error(err.to_string())
                            .with_error_details(err.kind()),
                    );
                }
                return Err(err);
            }
        };

        let _guard = self.commit_guard();
        let Some(session) = Session::authenticated(response.access_token, response.user) else {
            self.state.fail_login(epoch);
            return Err(Error::MalformedResponse(
                "Login response is missing the token or user".to_string(),
            ));
        };

        if self.state.epoch() != epoch {
            debug!(epoch, "login result superseded");
            return Err(Error::Superseded(
                "Session changed while logging in".to_string(),
            ));
        }

        if let Err(e) = self.persist(&session) {
            self.state.fail_login(epoch);
            self.record(
                LogEvent::new("login_failed")
                    .with_error(e.to_string())
                    .with_error_details(e.kind()),
            );
            return Err(e);
        }

        if !self.state.commit_login(epoch, session.clone()) {
            self.clear_persisted();
            return Err(Error::Superseded(
                "Session changed while logging in".to_string(),
            ));
        }

        debug!(epoch, "login committed");
        self.record(LogEvent::new("login_succeeded"));
        Ok(session)
    }

    /// End the session locally. Storage failures are logged, never returned.
    pub fn logout(&self) {
        let _guard = self.commit_guard();
        if self.end_session() {
            self.record(LogEvent::new("logout"));
        }
    }

    /// Drop a session the backend no longer accepts
    pub fn expire(&self, reason: &str) {
        let _guard = self.commit_guard();
        if self.end_session() {
            self.record(LogEvent::new("session_expired").with_error(reason));
        }
    }

    /// Expire only if the session is still the one that saw the rejection
    pub(crate) fn expire_epoch(&self, epoch: u64, reason: &str) {
        let _guard = self.commit_guard();
        if self.state.epoch() == epoch && self.end_session() {
            self.record(LogEvent::new("session_expired").with_error(reason));
        }
    }

    fn end_session(&self) -> bool {
        let was_active = self.state.clear();
        self.clear_persisted();
        debug!(was_active, "session cleared");
        was_active
    }

    /// Re-establish a session from the persisted cache
    ///
    /// The persisted session is installed provisionally and verified against
    /// the backend. Any verification failure logs out; the result is then an
    /// unauthenticated session rather than an error.
    pub async fn restore_session(&self) -> Result<Session> {
        let (epoch, credential) = {
            let _guard = self.commit_guard();
            match self.read_persisted() {
                Some(session) => {
                    let credential = session.credential();
                    (self.state.begin_restore(session), credential)
                }
                None => {
                    self.state.clear();
                    self.clear_persisted();
                    debug!("no persisted session");
                    return Ok(Session::default());
                }
            }
        };
        debug!(epoch, "verifying persisted session");

        let verified = self.api.current_user(&credential).await;

        let _guard = self.commit_guard();
        if self.state.epoch() != epoch {
            return Err(Error::Superseded(
                "Session changed while restoring".to_string(),
            ));
        }

        match verified {
            Ok(user) => {
                let session = self
                    .state
                    .replace_user(epoch, user)
                    .unwrap_or_else(|| self.state.session());
                if let Some(user) = session.user() {
                    if let Err(e) = self.write_user(user) {
                        warn!(error = %e, "failed to refresh persisted user");
                    }
                }
                debug!(epoch, "session restored");
                self.record(LogEvent::new("session_restored"));
                Ok(session)
            }
            Err(e) => {
                debug!(epoch, kind = e.kind(), "persisted session rejected");
                self.end_session();
                self.record(
                    LogEvent::new("session_restore_failed")
                        .with_error(e.to_string())
                        .with_error_details(e.kind()),
                );
                Ok(Session::default())
            }
        }
    }

    /// `Bearer <token>` for the current session, or empty
    pub fn auth_header(&self) -> BearerCredential {
        self.state.credential()
    }

    /// Create a backend account. The current session is left alone.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        self.api.register(request).await
    }

    /// Load a complete persisted session, clearing anything partial
    fn read_persisted(&self) -> Option<Session> {
        let token = match self.storage.get(AUTH_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "failed to read persisted token");
                None
            }
        };
        let user_data = match self.storage.get(USER_DATA_KEY) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to read persisted user");
                None
            }
        };

        let (token, user_data) = (token?, user_data?);
        let user: User = match serde_json::from_str(&user_data) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "persisted user record is unreadable");
                return None;
            }
        };
        Session::authenticated(token, user)
    }

    /// Write token and user together, rolling back the token if the user
    /// write fails
    fn persist(&self, session: &Session) -> Result<()> {
        let (Some(token), Some(user)) = (session.token(), session.user()) else {
            return Err(Error::storage("Cannot persist an incomplete session"));
        };
        let user_data = serde_json::to_string(user)?;

        self.storage.set(AUTH_TOKEN_KEY, token)?;
        if let Err(e) = self.storage.set(USER_DATA_KEY, &user_data) {
            if let Err(rollback) = self.storage.remove(AUTH_TOKEN_KEY) {
                warn!(error = %rollback, "failed to roll back persisted token");
            }
            return Err(e);
        }
        Ok(())
    }

    fn write_user(&self, user: &User) -> Result<()> {
        let user_data = serde_json::to_string(user)?;
        self.storage.set(USER_DATA_KEY, &user_data)
    }

    fn clear_persisted(&self) {
        for key in [AUTH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear persisted session");
            }
        }
    }

    fn record(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(event) {
                warn!(error = %e, "failed to write event log");
            }
        }
    }
}

/// Login failures surface as authentication errors carrying the server's
/// message when there is one
fn login_error(error: Error) -> Error {
    match error {
        Error::Auth(message) => Error::Auth(message),
        Error::Server { message, .. } => Error::Auth(message),
        Error::Network(message) => Error::Auth(format!("Login failed: {}", message)),
        Error::Validation(message) => Error::Validation(message),
        _ => Error::auth("Login failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_mapping() {
        let err = login_error(Error::Server {
            status: 400,
            message: "Invalid CPF or password".to_string(),
        });
        assert_eq!(err.to_string(), "Authentication error: Invalid CPF or password");

        let err = login_error(Error::MalformedResponse("eof".to_string()));
        assert_eq!(err.to_string(), "Authentication error: Login failed");

        let err = login_error(Error::network("Unable to connect to BankSys servers"));
        assert!(err.is_auth());
        assert!(err.to_string().contains("Unable to connect"));
    }
}
