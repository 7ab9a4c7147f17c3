//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod session;
mod snapshot;
pub mod transaction;
pub mod user;
pub mod wire;
pub mod result;

pub use account::{AccountBalance, CreditCard};
pub use session::{BearerCredential, Session, SessionStatus};
pub use snapshot::{DomainSnapshot, Slice, SliceState, SliceStatus};
pub use transaction::{
    NewTransaction, PixPayment, Transaction, TransactionAnalytics, TransactionCategory,
    TransactionType,
};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, User};
