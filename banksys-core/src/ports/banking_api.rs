//! Banking backend port
//!
//! The backend owns all monetary truth. Implementations forward these calls
//! to it (HTTP in production, an in-process demo backend otherwise).

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{
    AccountBalance, BearerCredential, CreditCard, LoginRequest, LoginResponse, NewTransaction,
    PixPayment, RegisterRequest, Transaction, TransactionAnalytics, User,
};

/// Banking backend abstraction
///
/// Every call is a suspension point. Implementations map invalid or expired
/// credentials to `Error::Auth`, transport failures and timeouts to
/// `Error::Network`, and other non-2xx responses to `Error::Server`.
#[async_trait]
pub trait BankingApi: Send + Sync {
    // === Auth ===

    /// Exchange credentials for a token and identity
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    /// Create a new user
    async fn register(&self, request: &RegisterRequest) -> Result<User>;

    /// Identity for the presented credential; used to verify a restored token
    async fn current_user(&self, credential: &BearerCredential) -> Result<User>;

    // === Accounts ===

    async fn get_balance(&self, credential: &BearerCredential) -> Result<AccountBalance>;

    /// Cards in server order
    async fn get_credit_cards(&self, credential: &BearerCredential) -> Result<Vec<CreditCard>>;

    // === Transactions ===

    /// A page of transactions, newest first
    async fn get_transactions(
        &self,
        credential: &BearerCredential,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>>;

    async fn create_transaction(
        &self,
        credential: &BearerCredential,
        draft: &NewTransaction,
    ) -> Result<Transaction>;

    async fn send_pix(&self, credential: &BearerCredential, payment: &PixPayment)
        -> Result<Transaction>;

    async fn get_analytics(
        &self,
        credential: &BearerCredential,
        months: u32,
    ) -> Result<TransactionAnalytics>;

    /// Populate demo transactions; returns the server's message
    async fn seed_sample_data(&self, credential: &BearerCredential) -> Result<String>;
}
