//! Domain cache - keeps the account snapshot in step with the backend
//!
//! Each refresh replaces one slice wholesale. Responses are applied only if
//! they are the newest for their slice and were issued in the current
//! session; everything else is discarded.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{
    DomainSnapshot, NewTransaction, PixPayment, Slice, Transaction, TransactionAnalytics,
};
use crate::ports::BankingApi;
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::session::SessionManager;
use crate::services::state::{Settled, StateStore, Ticket};

/// Largest page the backend serves
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when none was requested yet
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Analytics window bounds, in months
pub const MAX_ANALYTICS_MONTHS: u32 = 12;

/// Outcome of a full refresh, one entry per slice
#[derive(Debug)]
pub struct RefreshReport {
    pub balance: Result<()>,
    pub credit_cards: Result<()>,
    pub transactions: Result<()>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.balance.is_ok() && self.credit_cards.is_ok() && self.transactions.is_ok()
    }

    pub fn failures(&self) -> Vec<(Slice, &Error)> {
        [
            (Slice::Balance, &self.balance),
            (Slice::CreditCards, &self.credit_cards),
            (Slice::Transactions, &self.transactions),
        ]
        .into_iter()
        .filter_map(|(slice, result)| result.as_ref().err().map(|e| (slice, e)))
        .collect()
    }
}

pub struct DomainCache {
    api: Arc<dyn BankingApi>,
    state: Arc<StateStore>,
    session: Arc<SessionManager>,
    logger: Option<Arc<LoggingService>>,
    /// (limit, offset) of the last transactions page requested
    page: Mutex<(u32, u32)>,
}

impl DomainCache {
    pub fn new(
        api: Arc<dyn BankingApi>,
        state: Arc<StateStore>,
        session: Arc<SessionManager>,
        logger: Option<Arc<LoggingService>>,
        page_size: u32,
    ) -> Self {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        Self {
            api,
            state,
            session,
            logger,
            page: Mutex::new((page_size, 0)),
        }
    }

    /// The transactions page re-fetched by full refreshes and re-syncs
    pub fn current_page(&self) -> (u32, u32) {
        *self.page.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub async fn refresh_balance(&self) -> Result<()> {
        let ticket = self.state.issue(Slice::Balance)?;
        let result = self.api.get_balance(&ticket.credential).await;
        self.settle(ticket, result, |snapshot, balance| snapshot.balance.replace(balance))
    }

    pub async fn refresh_credit_cards(&self) -> Result<()> {
        let ticket = self.state.issue(Slice::CreditCards)?;
        let result = self.api.get_credit_cards(&ticket.credential).await;
        self.settle(ticket, result, |snapshot, cards| {
            snapshot.credit_cards.replace(cards)
        })
    }

    /// Fetch one page of transactions, newest first
    pub async fn refresh_transactions(&self, limit: u32, offset: u32) -> Result<()> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "Limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let ticket = self.state.issue(Slice::Transactions)?;
        *self.page.lock().unwrap_or_else(|p| p.into_inner()) = (limit, offset);

        let result = self
            .api
            .get_transactions(&ticket.credential, limit, offset)
            .await;
        self.settle(ticket, result, |snapshot, page| {
            snapshot.transactions.replace(page)
        })
    }

    /// Refresh every slice concurrently; one failure never cancels the others
    pub async fn refresh_all(&self) -> Result<RefreshReport> {
        self.state.authorized()?;
        let (limit, offset) = self.current_page();

        let (balance, credit_cards, transactions) = tokio::join!(
            self.refresh_balance(),
            self.refresh_credit_cards(),
            self.refresh_transactions(limit, offset),
        );

        let report = RefreshReport {
            balance,
            credit_cards,
            transactions,
        };
        debug!(complete = report.is_complete(), "full refresh settled");
        Ok(report)
    }

    /// Create a transaction, then re-sync balance and transactions from the
    /// backend. The created record is returned but never inserted locally.
    pub async fn create_transaction(&self, draft: &NewTransaction) -> Result<Transaction> {
        draft.validate()?;
        let (credential, epoch) = self.state.authorized()?;

        let result = self.api.create_transaction(&credential, draft).await;
        let created = self.check(epoch, result)?;

        self.record(LogEvent::new("transaction_created").with_slice(Slice::Transactions.as_str()));
        self.resync().await;
        Ok(created)
    }

    /// Send a PIX payment, with the same re-sync policy as
    /// [`create_transaction`](Self::create_transaction)
    pub async fn send_pix(&self, payment: &PixPayment) -> Result<Transaction> {
        payment.validate()?;
        let (credential, epoch) = self.state.authorized()?;

        let result = self.api.send_pix(&credential, payment).await;
        let created = self.check(epoch, result)?;

        self.record(LogEvent::new("transaction_created").with_slice(Slice::Transactions.as_str()));
        self.resync().await;
        Ok(created)
    }

    /// Ask the backend to populate sample transactions, then refresh everything
    pub async fn seed_sample_data(&self) -> Result<String> {
        let (credential, epoch) = self.state.authorized()?;
        let result = self.api.seed_sample_data(&credential).await;
        let message = self.check(epoch, result)?;

        if let Ok(report) = self.refresh_all().await {
            for (slice, error) in report.failures() {
                debug!(%slice, error = %error, "refresh after seeding failed");
            }
        }
        Ok(message)
    }

    /// Spending analytics over the last `months` months; not cached
    pub async fn analytics(&self, months: u32) -> Result<TransactionAnalytics> {
        if months == 0 || months > MAX_ANALYTICS_MONTHS {
            return Err(Error::validation(format!(
                "Months must be between 1 and {}",
                MAX_ANALYTICS_MONTHS
            )));
        }
        let (credential, epoch) = self.state.authorized()?;
        let result = self.api.get_analytics(&credential, months).await;
        self.check(epoch, result)
    }

    /// Re-fetch what a new transaction changes. Failures stay on the slices.
    async fn resync(&self) {
        let (limit, offset) = self.current_page();
        let (balance, transactions) = tokio::join!(
            self.refresh_balance(),
            self.refresh_transactions(limit, offset),
        );
        if let Err(e) = balance {
            debug!(error = %e, "balance re-sync failed");
        }
        if let Err(e) = transactions {
            debug!(error = %e, "transactions re-sync failed");
        }
    }

    /// Expire the session when a one-shot call is rejected for auth
    fn check<T>(&self, epoch: u64, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_auth() {
                self.session.expire_epoch(epoch, &e.to_string());
            }
        }
        result
    }

    fn settle<T>(
        &self,
        ticket: Ticket,
        result: Result<T>,
        apply: impl FnOnce(&mut DomainSnapshot, T),
    ) -> Result<()> {
        let slice = ticket.slice;
        match result {
            Ok(value) => match self.state.settle(&ticket, |s| apply(s, value)) {
                Settled::Current => Ok(()),
                Settled::Superseded => {
                    debug!(%slice, seq = ticket.seq, "response superseded by a newer request");
                    Err(Error::Superseded(format!(
                        "A newer {} refresh already applied",
                        slice
                    )))
                }
                Settled::StaleSession => {
                    debug!(%slice, seq = ticket.seq, "response from an ended session discarded");
                    Err(Error::Superseded(format!(
                        "Session changed while refreshing {}",
                        slice
                    )))
                }
            },
            Err(err) => {
                let message = err.to_string();
                let notice = message.clone();
                let outcome = self.state.settle(&ticket, |s| s.record_error(slice, notice));
                if outcome == Settled::Current {
                    warn!(%slice, kind = err.kind(), "refresh failed");
                    self.record(
                        LogEvent::new("refresh_failed")
                            .with_slice(slice.as_str())
                            .with_error(message.as_str())
                            .with_error_details(err.kind()),
                    );
                    if err.is_auth() {
                        self.session.expire_epoch(ticket.epoch, &message);
                    }
                }
                Err(err)
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
