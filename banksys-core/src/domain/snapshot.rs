//! Cached view of the backend's account data

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::account::{AccountBalance, CreditCard};
use super::transaction::Transaction;

/// Independently refreshed part of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slice {
    Balance,
    CreditCards,
    Transactions,
}

impl Slice {
    pub const ALL: [Slice; 3] = [Slice::Balance, Slice::CreditCards, Slice::Transactions];

    pub(crate) fn index(self) -> usize {
        match self {
            Slice::Balance => 0,
            Slice::CreditCards => 1,
            Slice::Transactions => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Slice::Balance => "balance",
            Slice::CreditCards => "credit_cards",
            Slice::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slice of the snapshot
///
/// `value` is `None` until the first successful fetch in the session, so a
/// never-fetched slice can be told apart from a fetched-but-empty one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceState<T> {
    pub value: Option<T>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Latest failure notice, cleared by the next successful refresh
    pub last_error: Option<String>,
}

impl<T> Default for SliceState<T> {
    fn default() -> Self {
        Self {
            value: None,
            updated_at: None,
            last_error: None,
        }
    }
}

impl<T> SliceState<T> {
    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    /// Load state without the value
    pub fn status(&self, slice: Slice) -> SliceStatus {
        SliceStatus {
            slice,
            loaded: self.is_loaded(),
            updated_at: self.updated_at,
            last_error: self.last_error.clone(),
        }
    }

    pub(crate) fn replace(&mut self, value: T) {
        self.value = Some(value);
        self.updated_at = Some(Utc::now());
        self.last_error = None;
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}

/// Whether a slice has data, how fresh it is, and its last failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceStatus {
    pub slice: Slice,
    pub loaded: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SliceStatus {
    /// Status of a slice nothing is known about
    pub fn unknown(slice: Slice) -> Self {
        Self {
            slice,
            loaded: false,
            updated_at: None,
            last_error: None,
        }
    }
}

/// Last-fetched balance, cards and transactions for the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainSnapshot {
    pub balance: SliceState<AccountBalance>,
    pub credit_cards: SliceState<Vec<CreditCard>>,
    /// Newest first, as ordered by the server
    pub transactions: SliceState<Vec<Transaction>>,
    /// Set once the session's initial full refresh has settled
    pub synced: bool,
}

impl DomainSnapshot {
    pub fn is_empty(&self) -> bool {
        !self.balance.is_loaded()
            && !self.credit_cards.is_loaded()
            && !self.transactions.is_loaded()
    }

    pub fn slice_status(&self, slice: Slice) -> SliceStatus {
        match slice {
            Slice::Balance => self.balance.status(slice),
            Slice::CreditCards => self.credit_cards.status(slice),
            Slice::Transactions => self.transactions.status(slice),
        }
    }

    pub(crate) fn record_error(&mut self, slice: Slice, message: impl Into<String>) {
        match slice {
            Slice::Balance => self.balance.record_error(message),
            Slice::CreditCards => self.credit_cards.record_error(message),
            Slice::Transactions => self.transactions.record_error(message),
        }
    }

    /// Slices currently carrying a failure notice
    pub fn errors(&self) -> Vec<(Slice, &str)> {
        let mut out = Vec::new();
        if let Some(e) = &self.balance.last_error {
            out.push((Slice::Balance, e.as_str()));
        }
        if let Some(e) = &self.credit_cards.last_error {
            out.push((Slice::CreditCards, e.as_str()));
        }
        if let Some(e) = &self.transactions.last_error {
            out.push((Slice::Transactions, e.as_str()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_differs_from_empty() {
        let mut snapshot = DomainSnapshot::default();
        assert!(snapshot.is_empty());
        assert!(!snapshot.transactions.is_loaded());

        snapshot.transactions.replace(Vec::new());
        assert!(snapshot.transactions.is_loaded());
        assert_eq!(snapshot.transactions.value.as_deref(), Some(&[][..]));
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_success_clears_error_notice() {
        let mut snapshot = DomainSnapshot::default();
        snapshot.record_error(Slice::CreditCards, "Network error: timed out");
        assert_eq!(snapshot.errors().len(), 1);

        snapshot.credit_cards.replace(Vec::new());
        assert!(snapshot.errors().is_empty());
        assert!(snapshot.credit_cards.updated_at.is_some());
    }

    #[test]
    fn test_slice_status_reports_each_slice() {
        let mut snapshot = DomainSnapshot::default();
        snapshot.transactions.replace(Vec::new());
        snapshot.record_error(Slice::Balance, "Network error: timed out");

        let balance = snapshot.slice_status(Slice::Balance);
        assert_eq!(balance.slice, Slice::Balance);
        assert!(!balance.loaded);
        assert_eq!(balance.last_error.as_deref(), Some("Network error: timed out"));

        let transactions = snapshot.slice_status(Slice::Transactions);
        assert!(transactions.loaded);
        assert!(transactions.updated_at.is_some());
        assert_eq!(
            snapshot.slice_status(Slice::CreditCards),
            SliceStatus::unknown(Slice::CreditCards)
        );
    }
}
