//! Shared client state
//!
//! One `watch` channel holds the session together with the domain snapshot.
//! Every mutation is a single closure over the channel value, so subscribers
//! only ever see committed states and no write spans an `.await`.

use tokio::sync::watch;

use crate::domain::result::{Error, Result};
use crate::domain::{BearerCredential, DomainSnapshot, Session, SessionStatus, Slice, User};

/// Everything a view needs to render: who is logged in and what we know
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    session: Session,
    snapshot: DomainSnapshot,
    epoch: u64,
    ledger: RequestLedger,
}

impl ClientState {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The cached data, only while a session is authenticated
    pub fn snapshot(&self) -> Option<&DomainSnapshot> {
        if self.is_authenticated() {
            Some(&self.snapshot)
        } else {
            None
        }
    }

    /// Whether a refresh for `slice` is still outstanding
    pub fn is_loading(&self, slice: Slice) -> bool {
        self.ledger.in_flight(slice) > 0
    }

    /// Session boundary counter
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a new session boundary: everything tied to the old one goes
    fn reset(&mut self, session: Session) {
        self.session = session;
        self.snapshot = DomainSnapshot::default();
        self.ledger = RequestLedger::default();
        self.epoch += 1;
    }
}

/// How a settled refresh relates to the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
    /// Newest response for its slice; its outcome is recorded
    Current,
    /// A later-issued request for the same slice already applied
    Superseded,
    /// Issued before the last login/logout
    StaleSession,
}

/// Per-slice sequence numbers and the tickets still in flight
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestLedger {
    issued: [u64; 3],
    /// Highest sequence whose outcome, success or failure, was recorded
    settled: [u64; 3],
    in_flight: [Vec<u64>; 3],
}

impl RequestLedger {
    fn issue(&mut self, slice: Slice) -> u64 {
        let i = slice.index();
        self.issued[i] += 1;
        self.in_flight[i].push(self.issued[i]);
        self.issued[i]
    }

    /// Last request wins by issue order: a response is current only if no
    /// later-issued one for the same slice has settled yet, whether that one
    /// succeeded or failed.
    fn settle(&mut self, slice: Slice, seq: u64) -> Settled {
        let i = slice.index();
        self.in_flight[i].retain(|s| *s != seq);
        if seq <= self.settled[i] {
            return Settled::Superseded;
        }
        self.settled[i] = seq;
        Settled::Current
    }

    fn in_flight(&self, slice: Slice) -> usize {
        self.in_flight[slice.index()].len()
    }
}

/// Claim on one outbound refresh
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    pub slice: Slice,
    pub seq: u64,
    pub epoch: u64,
    pub credential: BearerCredential,
}

/// Owner of the shared [`ClientState`]
pub struct StateStore {
    tx: watch::Sender<ClientState>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ClientState::default());
        Self { tx }
    }

    /// Receiver that observes every committed change
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.tx.subscribe()
    }

    /// Copy of the current state
    pub fn current(&self) -> ClientState {
        self.tx.borrow().clone()
    }

    pub fn session(&self) -> Session {
        self.tx.borrow().session.clone()
    }

    pub fn credential(&self) -> BearerCredential {
        self.tx.borrow().session.credential()
    }

    pub fn epoch(&self) -> u64 {
        self.tx.borrow().epoch
    }

    /// Credential and epoch for a one-shot authorized call
    pub(crate) fn authorized(&self) -> Result<(BearerCredential, u64)> {
        let state = self.tx.borrow();
        if !state.is_authenticated() {
            return Err(Error::auth("Not authenticated"));
        }
        Ok((state.session.credential(), state.epoch))
    }

    /// Drop the current session and snapshot, entering `authenticating`
    pub(crate) fn begin_login(&self) -> u64 {
        let mut epoch = 0;
        self.tx.send_modify(|s| {
            s.reset(Session::authenticating());
            epoch = s.epoch;
        });
        epoch
    }

    /// Commit a successful login if nothing replaced it meanwhile
    pub(crate) fn commit_login(&self, epoch: u64, session: Session) -> bool {
        self.tx.send_if_modified(|s| {
            if s.epoch != epoch || s.session.status() != SessionStatus::Authenticating {
                return false;
            }
            s.session = session;
            true
        })
    }

    /// Leave `authenticating` after a failed login
    pub(crate) fn fail_login(&self, epoch: u64) -> bool {
        self.tx.send_if_modified(|s| {
            if s.epoch != epoch || s.session.status() != SessionStatus::Authenticating {
                return false;
            }
            s.session = Session::default();
            true
        })
    }

    /// Provisionally install a persisted session pending verification
    pub(crate) fn begin_restore(&self, session: Session) -> u64 {
        let mut epoch = 0;
        self.tx.send_modify(|s| {
            s.reset(session);
            epoch = s.epoch;
        });
        epoch
    }

    /// Swap in a fresher user record for the same credential
    pub(crate) fn replace_user(&self, epoch: u64, user: User) -> Option<Session> {
        let mut updated = None;
        self.tx.send_if_modified(|s| {
            if s.epoch != epoch || !s.is_authenticated() {
                return false;
            }
            s.session = std::mem::take(&mut s.session).with_user(user);
            updated = Some(s.session.clone());
            true
        });
        updated
    }

    /// Transition to `unauthenticated`, clearing the snapshot in the same write
    ///
    /// Returns whether a session (or login attempt) was active.
    pub(crate) fn clear(&self) -> bool {
        let mut was_active = false;
        self.tx.send_modify(|s| {
            was_active = s.session.status() != SessionStatus::Unauthenticated;
            s.reset(Session::default());
        });
        was_active
    }

    /// Tag a refresh of `slice`; refused unless authenticated
    pub(crate) fn issue(&self, slice: Slice) -> Result<Ticket> {
        let mut ticket = None;
        self.tx.send_if_modified(|s| {
            if !s.is_authenticated() {
                return false;
            }
            let seq = s.ledger.issue(slice);
            ticket = Some(Ticket {
                slice,
                seq,
                epoch: s.epoch,
                credential: s.session.credential(),
            });
            true
        });
        ticket.ok_or_else(|| Error::auth("Not authenticated"))
    }

    /// Retire `ticket`, running `apply` on the snapshot only if it is current
    pub(crate) fn settle(
        &self,
        ticket: &Ticket,
        apply: impl FnOnce(&mut DomainSnapshot),
    ) -> Settled {
        let mut outcome = Settled::StaleSession;
        self.tx.send_if_modified(|s| {
            if s.epoch != ticket.epoch {
                return false;
            }
            outcome = s.ledger.settle(ticket.slice, ticket.seq);
            if outcome == Settled::Current {
                apply(&mut s.snapshot);
            }
            true
        });
        outcome
    }

    /// Mark the session's initial full refresh as done
    pub(crate) fn mark_synced(&self, epoch: u64) -> bool {
        self.tx.send_if_modified(|s| {
            if s.epoch != epoch || !s.is_authenticated() || s.snapshot.synced {
                return false;
            }
            s.snapshot.synced = true;
            true
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountBalance;
    use rust_decimal::Decimal;

    fn user() -> User {
        User::new("u1", "12345678901", "Maria Silva Santos", "maria@email.com")
    }

    fn balance(cents: i64) -> AccountBalance {
        AccountBalance {
            balance: Decimal::new(cents, 2),
            available_balance: Decimal::new(cents, 2),
            account_number: "12345-6".to_string(),
        }
    }

    fn logged_in() -> StateStore {
        let store = StateStore::new();
        let epoch = store.begin_login();
        assert!(store.commit_login(epoch, Session::authenticated("t1", user()).unwrap()));
        store
    }

    #[test]
    fn test_issue_requires_authentication() {
        let store = StateStore::new();
        assert!(store.issue(Slice::Balance).unwrap_err().is_auth());
        assert!(store.authorized().is_err());
    }

    #[test]
    fn test_later_issue_wins_regardless_of_completion_order() {
        let store = logged_in();
        let a = store.issue(Slice::Balance).unwrap();
        let b = store.issue(Slice::Balance).unwrap();
        assert!(store.current().is_loading(Slice::Balance));

        let applied = store.settle(&b, |s| s.balance.replace(balance(200)));
        assert_eq!(applied, Settled::Current);
        let late = store.settle(&a, |s| s.balance.replace(balance(100)));
        assert_eq!(late, Settled::Superseded);

        let state = store.current();
        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.balance.value, Some(balance(200)));
        assert!(!state.is_loading(Slice::Balance));
    }

    #[test]
    fn test_slices_are_sequenced_independently() {
        let store = logged_in();
        let tx = store.issue(Slice::Transactions).unwrap();
        let bal = store.issue(Slice::Balance).unwrap();
        assert_eq!(tx.seq, 1);
        assert_eq!(bal.seq, 1);
        assert_eq!(store.settle(&bal, |_| {}), Settled::Current);
        assert_eq!(store.settle(&tx, |_| {}), Settled::Current);
    }

    #[test]
    fn test_newer_failure_supersedes_older_success() {
        let store = logged_in();
        let a = store.issue(Slice::CreditCards).unwrap();
        let b = store.issue(Slice::CreditCards).unwrap();
        assert_eq!(
            store.settle(&b, |s| s.record_error(Slice::CreditCards, "timeout")),
            Settled::Current
        );
        assert_eq!(
            store.settle(&a, |s| s.credit_cards.replace(Vec::new())),
            Settled::Superseded
        );
        let state = store.current();
        let snapshot = state.snapshot().unwrap();
        assert!(!snapshot.credit_cards.is_loaded());
        assert_eq!(snapshot.credit_cards.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_older_failure_after_newer_success_is_ignored() {
        let store = logged_in();
        let a = store.issue(Slice::Balance).unwrap();
        let b = store.issue(Slice::Balance).unwrap();
        assert_eq!(store.settle(&b, |s| s.balance.replace(balance(300))), Settled::Current);
        assert_eq!(
            store.settle(&a, |s| s.record_error(Slice::Balance, "timeout")),
            Settled::Superseded
        );
        let state = store.current();
        assert!(state.snapshot().unwrap().balance.last_error.is_none());
    }

    #[test]
    fn test_clear_discards_in_flight_tickets() {
        let store = logged_in();
        let ticket = store.issue(Slice::Balance).unwrap();
        assert!(store.clear());

        let outcome = store.settle(&ticket, |s| s.balance.replace(balance(100)));
        assert_eq!(outcome, Settled::StaleSession);
        let state = store.current();
        assert!(state.snapshot().is_none());
        assert_eq!(state.session().status(), SessionStatus::Unauthenticated);
        assert!(!state.is_loading(Slice::Balance));
    }

    #[test]
    fn test_commit_login_rejected_after_newer_boundary() {
        let store = StateStore::new();
        let first = store.begin_login();
        let _second = store.begin_login();
        assert!(!store.commit_login(first, Session::authenticated("t1", user()).unwrap()));
        assert_eq!(store.session().status(), SessionStatus::Authenticating);
    }

    #[test]
    fn test_replace_user_keeps_credential() {
        let store = StateStore::new();
        let epoch = store.begin_restore(Session::authenticated("t1", user()).unwrap());
        let mut fresh = user();
        fresh.full_name = "Maria S. Santos".to_string();

        let session = store.replace_user(epoch, fresh).unwrap();
        assert_eq!(session.user().unwrap().full_name, "Maria S. Santos");
        assert_eq!(store.credential().token(), Some("t1"));
        assert!(store.replace_user(epoch + 1, user()).is_none());
    }

    #[test]
    fn test_subscriber_sees_cleared_snapshot_with_logout() {
        let store = logged_in();
        let ticket = store.issue(Slice::Balance).unwrap();
        store.settle(&ticket, |s| s.balance.replace(balance(100)));

        let mut rx = store.subscribe();
        store.clear();
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update();
        assert!(!seen.is_authenticated());
        assert!(seen.snapshot().is_none());
    }

    #[test]
    fn test_mark_synced_once_per_epoch() {
        let store = logged_in();
        let epoch = store.epoch();
        assert!(store.mark_synced(epoch));
        assert!(!store.mark_synced(epoch));
        assert!(store.current().snapshot().unwrap().synced);
    }
}
