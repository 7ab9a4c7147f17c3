//! BankSys Core - client session and account-state synchronization
//!
//! This crate implements the client side of BankSys following hexagonal
//! architecture:
//!
//! - **domain**: Core entities (User, Session, AccountBalance, Transaction, etc.)
//! - **ports**: Trait definitions for external dependencies (BankingApi, KeyValueStore)
//! - **services**: Session manager, domain cache, shared state, event log
//! - **adapters**: Concrete implementations (HTTP backend, demo backend, file store)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, OnceCell};
use tracing::{debug, warn};

use adapters::demo::DemoBankingApi;
use adapters::file_store::FileKeyValueStore;
use adapters::http::HttpBankingApi;
use config::Config;
use services::{DomainCache, SessionManager, StateStore};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    AccountBalance, BearerCredential, CreditCard, DomainSnapshot, NewTransaction, PixPayment,
    RegisterRequest, Session, SessionStatus, Slice, SliceState, SliceStatus, Transaction,
    TransactionAnalytics, TransactionCategory, TransactionType, User,
};
pub use ports::{BankingApi, KeyValueStore};
pub use services::{ClientState, LoggingService, RefreshReport};

/// Session file used while demo mode is on, kept apart from the real one
pub const DEMO_SESSION_FILE: &str = "demo-session.json";

/// State of the in-process demo backend
pub const DEMO_DATA_FILE: &str = "demo.json";

/// Tunables for [`BankingClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Transactions page fetched by full refreshes until another is requested
    pub page_size: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            page_size: services::DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
        }
    }
}

/// Main entry point for BankSys client operations
///
/// Holds the shared state container, the session manager and the domain
/// cache. Everything is constructor-injected; there are no globals.
pub struct BankingClient {
    logger: Option<Arc<LoggingService>>,
    state: Arc<StateStore>,
    session: Arc<SessionManager>,
    cache: DomainCache,
    init: OnceCell<Session>,
}

impl BankingClient {
    pub fn new(
        api: Arc<dyn BankingApi>,
        storage: Arc<dyn KeyValueStore>,
        options: ClientOptions,
    ) -> Self {
        Self::with_event_log(api, storage, options, None)
    }

    /// Like [`BankingClient::new`], recording session and sync events to
    /// `logger` from the first call on
    pub fn with_event_log(
        api: Arc<dyn BankingApi>,
        storage: Arc<dyn KeyValueStore>,
        options: ClientOptions,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let state = Arc::new(StateStore::new());
        let session = Arc::new(SessionManager::new(
            Arc::clone(&api),
            storage,
            Arc::clone(&state),
            logger.clone(),
        ));
        let cache = DomainCache::new(
            api,
            Arc::clone(&state),
            Arc::clone(&session),
            logger.clone(),
            options.page_size,
        );

        Self {
            logger,
            state,
            session,
            cache,
            init: OnceCell::new(),
        }
    }

    /// Build a client from settings: the HTTP backend, or the demo backend
    /// when demo mode is on, with the session cached under `banksys_dir`
    pub fn from_config(
        config: &Config,
        banksys_dir: &Path,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        std::fs::create_dir_all(banksys_dir)?;

        let (api, storage): (Arc<dyn BankingApi>, Arc<dyn KeyValueStore>) = if config.demo_mode {
            (
                Arc::new(DemoBankingApi::persistent(&banksys_dir.join(DEMO_DATA_FILE))?),
                Arc::new(FileKeyValueStore::new(banksys_dir.join(DEMO_SESSION_FILE))),
            )
        } else {
            (
                Arc::new(HttpBankingApi::with_timeout(
                    &config.api_base_url,
                    Duration::from_secs(config.timeout_secs),
                )?),
                Arc::new(FileKeyValueStore::in_dir(banksys_dir)),
            )
        };

        Ok(Self::with_event_log(api, storage, ClientOptions::from(config), logger))
    }

    /// Restore any persisted session and, if it verifies, load the snapshot
    ///
    /// Runs once; concurrent and later callers share the first result.
    pub async fn initialize(&self) -> Session {
        self.init
            .get_or_init(|| async {
                match self.session.restore_session().await {
                    Ok(session) if session.is_authenticated() => {
                        self.initial_sync().await;
                        self.state.session()
                    }
                    Ok(session) => session,
                    Err(e) => {
                        warn!(error = %e, "session restore did not complete");
                        self.state.session()
                    }
                }
            })
            .await
            .clone()
    }

    /// Log in and load the snapshot
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session> {
        self.session.login(identifier, secret).await?;
        self.initial_sync().await;
        Ok(self.state.session())
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        self.session.register(request).await
    }

    /// Exactly one full refresh per session start, then mark the snapshot synced
    async fn initial_sync(&self) {
        let epoch = self.state.epoch();
        match self.cache.refresh_all().await {
            Ok(report) => {
                for (slice, error) in report.failures() {
                    debug!(%slice, error = %error, "initial refresh incomplete");
                }
                self.state.mark_synced(epoch);
            }
            Err(e) => debug!(error = %e, "initial refresh skipped"),
        }
    }

    pub async fn refresh_balance(&self) -> Result<()> {
        self.cache.refresh_balance().await
    }

    pub async fn refresh_credit_cards(&self) -> Result<()> {
        self.cache.refresh_credit_cards().await
    }

    pub async fn refresh_transactions(&self, limit: u32, offset: u32) -> Result<()> {
        self.cache.refresh_transactions(limit, offset).await
    }

    pub async fn refresh_all(&self) -> Result<RefreshReport> {
        self.cache.refresh_all().await
    }

    pub async fn create_transaction(&self, draft: &NewTransaction) -> Result<Transaction> {
        self.cache.create_transaction(draft).await
    }

    pub async fn send_pix(&self, payment: &PixPayment) -> Result<Transaction> {
        self.cache.send_pix(payment).await
    }

    pub async fn seed_sample_data(&self) -> Result<String> {
        self.cache.seed_sample_data().await
    }

    pub async fn analytics(&self, months: u32) -> Result<TransactionAnalytics> {
        self.cache.analytics(months).await
    }

    /// Current session (token never leaves through serialization)
    pub fn session(&self) -> Session {
        self.state.session()
    }

    /// `Bearer <token>` for the current session, or empty
    pub fn auth_header(&self) -> BearerCredential {
        self.session.auth_header()
    }

    /// Copy of the full client state
    pub fn state(&self) -> ClientState {
        self.state.current()
    }

    /// Observe every committed state change
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    pub fn logger(&self) -> Option<&Arc<LoggingService>> {
        self.logger.as_ref()
    }
}
