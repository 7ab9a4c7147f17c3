//! Demo banking backend
//!
//! An in-process stand-in for the BankSys API so the client can be explored
//! without a server:
//! - one demo customer (CPF `12345678901`, password `senha123`)
//! - a checking account, two credit cards, and a handful of transactions
//! - seed data matching the server's sample set
//!
//! State can optionally be persisted to a JSON file so consecutive CLI
//! invocations see the same account.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::transaction::{CategorySpending, MerchantSpending, MonthlySpending};
use crate::domain::{
    AccountBalance, BearerCredential, CreditCard, LoginRequest, LoginResponse, NewTransaction,
    PixPayment, RegisterRequest, Transaction, TransactionAnalytics, TransactionCategory,
    TransactionType, User,
};
use crate::ports::BankingApi;

/// Demo customer login
pub const DEMO_CPF: &str = "12345678901";
pub const DEMO_PASSWORD: &str = "senha123";

const TOKEN_PREFIX: &str = "demo-token-";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoCustomer {
    user: User,
    password: String,
    balance: AccountBalance,
    credit_cards: Vec<CreditCard>,
    /// Newest first
    transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DemoState {
    customers: Vec<DemoCustomer>,
    /// Tokens rejected from now on (simulated expiry)
    #[serde(default)]
    revoked: Vec<String>,
}

/// In-process implementation of [`BankingApi`]
pub struct DemoBankingApi {
    state: Mutex<DemoState>,
    path: Option<PathBuf>,
}

impl DemoBankingApi {
    /// Fresh demo backend with the default customer
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DemoState {
                customers: vec![generate_demo_customer()],
                revoked: Vec::new(),
            }),
            path: None,
        }
    }

    /// Demo backend persisted to `path`, loading existing state if present
    pub fn persistent(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            DemoState {
                customers: vec![generate_demo_customer()],
                revoked: Vec::new(),
            }
        };
        Ok(Self {
            state: Mutex::new(state),
            path: Some(path.to_path_buf()),
        })
    }

    /// Reject every token issued so far, as if they had expired
    pub fn expire_all_tokens(&self) -> Result<()> {
        let mut state = self.lock()?;
        let tokens: Vec<String> = state
            .customers
            .iter()
            .map(|c| token_for(&c.user))
            .collect();
        state.revoked.extend(tokens);
        self.save(&state)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DemoState>> {
        self.state
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }

    fn save(&self, state: &DemoState) -> Result<()> {
        if let Some(path) = &self.path {
            std::fs::write(path, serde_json::to_string_pretty(state)?)?;
        }
        Ok(())
    }

    /// Run `f` against the customer owning `credential`
    fn with_customer<T>(
        &self,
        credential: &BearerCredential,
        f: impl FnOnce(&mut DemoCustomer) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.lock()?;
        let token = credential
            .token()
            .ok_or_else(|| Error::auth("Not authenticated"))?
            .to_string();
        if state.revoked.contains(&token) {
            return Err(Error::auth("Could not validate credentials"));
        }
        let customer = state
            .customers
            .iter_mut()
            .find(|c| token_for(&c.user) == token)
            .ok_or_else(|| Error::auth("Could not validate credentials"))?;
        let result = f(customer)?;
        self.save(&state)?;
        Ok(result)
    }
}

impl Default for DemoBankingApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens are derived from the user id so they survive a process restart
fn token_for(user: &User) -> String {
    format!("{}{}", TOKEN_PREFIX, user.id)
}

fn server_error(status: u16, message: &str) -> Error {
    Error::Server {
        status,
        message: message.to_string(),
    }
}

/// Book a transaction against the demo account
fn book(customer: &mut DemoCustomer, draft: &NewTransaction) -> Result<Transaction> {
    let amount = draft.amount;
    let inflow = draft.transaction_type.is_inflow();
    if !inflow && customer.balance.available_balance < amount {
        return Err(server_error(400, "Insufficient funds"));
    }

    let new_balance = if inflow {
        customer.balance.balance + amount
    } else {
        customer.balance.balance - amount
    };
    customer.balance.balance = new_balance;
    customer.balance.available_balance = new_balance;

    let tx = Transaction {
        id: Uuid::new_v4().to_string(),
        transaction_type: draft.transaction_type,
        category: draft.category,
        amount,
        description: draft.description.clone(),
        merchant_name: draft.merchant_name.clone(),
        recipient_name: draft.recipient_name.clone(),
        transaction_date: Utc::now().naive_utc(),
        status: "completed".to_string(),
        balance_after: Some(new_balance),
    };
    customer.transactions.insert(0, tx.clone());
    Ok(tx)
}

#[async_trait]
impl BankingApi for DemoBankingApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let state = self.lock()?;
        let customer = state
            .customers
            .iter()
            .find(|c| c.user.cpf == request.cpf && c.password == request.password)
            .ok_or_else(|| Error::auth("Invalid CPF or password"))?;
        Ok(LoginResponse {
            access_token: token_for(&customer.user),
            token_type: "bearer".to_string(),
            user: customer.user.clone(),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let mut state = self.lock()?;
        if state.customers.iter().any(|c| c.user.cpf == request.cpf) {
            return Err(server_error(400, "CPF already registered"));
        }
        if state.customers.iter().any(|c| c.user.email == request.email) {
            return Err(server_error(400, "Email already registered"));
        }
        let mut user = User::new(
            Uuid::new_v4().to_string(),
            request.cpf.clone(),
            request.full_name.clone(),
            request.email.clone(),
        );
        user.phone = request.phone.clone();
        user.created_at = Some(Utc::now().naive_utc());

        state.customers.push(DemoCustomer {
            user: user.clone(),
            password: request.password.clone(),
            balance: AccountBalance {
                balance: Decimal::new(100000, 2),
                available_balance: Decimal::new(100000, 2),
                account_number: format!("{}-1", &request.cpf[..5]),
            },
            credit_cards: Vec::new(),
            transactions: Vec::new(),
        });
        self.save(&state)?;
        Ok(user)
    }

    async fn current_user(&self, credential: &BearerCredential) -> Result<User> {
        self.with_customer(credential, |c| Ok(c.user.clone()))
    }

    async fn get_balance(&self, credential: &BearerCredential) -> Result<AccountBalance> {
        self.with_customer(credential, |c| Ok(c.balance.clone()))
    }

    async fn get_credit_cards(&self, credential: &BearerCredential) -> Result<Vec<CreditCard>> {
        self.with_customer(credential, |c| Ok(c.credit_cards.clone()))
    }

    async fn get_transactions(
        &self,
        credential: &BearerCredential,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>> {
        self.with_customer(credential, |c| {
            Ok(c.transactions
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }

    async fn create_transaction(
        &self,
        credential: &BearerCredential,
        draft: &NewTransaction,
    ) -> Result<Transaction> {
        self.with_customer(credential, |c| book(c, draft))
    }

    async fn send_pix(
        &self,
        credential: &BearerCredential,
        payment: &PixPayment,
    ) -> Result<Transaction> {
        let mut draft = NewTransaction::new(
            TransactionType::PixSent,
            payment.amount,
            payment.description.clone(),
        )
        .with_category(TransactionCategory::Transfer)
        .with_recipient(payment.recipient_name.clone());
        draft.pix_key = Some(payment.pix_key.clone());
        self.with_customer(credential, |c| book(c, &draft))
    }

    async fn get_analytics(
        &self,
        credential: &BearerCredential,
        months: u32,
    ) -> Result<TransactionAnalytics> {
        let since = Utc::now().naive_utc() - Duration::days(i64::from(months) * 30);
        self.with_customer(credential, |c| Ok(summarize(&c.transactions, since)))
    }

    async fn seed_sample_data(&self, credential: &BearerCredential) -> Result<String> {
        self.with_customer(credential, |c| {
            let samples = generate_sample_transactions();
            let count = samples.len();
            c.transactions.extend(samples);
            c.transactions
                .sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
            Ok(format!("Created {} sample transactions", count))
        })
    }
}

fn is_expense(t: &Transaction) -> bool {
    matches!(
        t.transaction_type,
        TransactionType::Debit | TransactionType::PixSent | TransactionType::BillPayment
    )
}

fn summarize(transactions: &[Transaction], since: NaiveDateTime) -> TransactionAnalytics {
    let in_window: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.transaction_date >= since)
        .collect();
    let total_income = in_window
        .iter()
        .filter(|t| t.transaction_type.is_inflow())
        .map(|t| t.amount)
        .sum();
    let total_expenses = in_window
        .iter()
        .filter(|t| is_expense(t))
        .map(|t| t.amount)
        .sum();

    let mut monthly: Vec<MonthlySpending> = Vec::new();
    let mut categories: Vec<CategorySpending> = Vec::new();
    let mut merchants: Vec<MerchantSpending> = Vec::new();
    for t in in_window.iter().filter(|t| is_expense(t)) {
        let month = t.transaction_date.format("%Y-%m").to_string();
        match monthly.iter_mut().find(|m| m.month == month) {
            Some(m) => m.amount += t.amount,
            None => monthly.push(MonthlySpending { month, amount: t.amount }),
        }
        let category = t.category.as_str().to_string();
        match categories.iter_mut().find(|c| c.category == category) {
            Some(c) => c.amount += t.amount,
            None => categories.push(CategorySpending { category, amount: t.amount }),
        }
        if let Some(merchant) = &t.merchant_name {
            match merchants.iter_mut().find(|m| &m.merchant == merchant) {
                Some(m) => m.amount += t.amount,
                None => merchants.push(MerchantSpending {
                    merchant: merchant.clone(),
                    amount: t.amount,
                }),
            }
        }
    }
    merchants.sort_by(|a, b| b.amount.cmp(&a.amount));
    merchants.truncate(5);

    TransactionAnalytics {
        total_income,
        total_expenses,
        monthly_spending: monthly,
        category_breakdown: categories,
        top_merchants: merchants,
    }
}

/// Generate the demo customer
fn generate_demo_customer() -> DemoCustomer {
    let now = Utc::now().naive_utc();
    let mut user = User::new(
        "demo-user-001",
        DEMO_CPF,
        "Maria Silva Santos",
        "maria.silva@email.com",
    );
    user.phone = "+55 11 98765-4321".to_string();
    user.biometric_enabled = true;
    user.created_at = Some(now - Duration::days(365));

    DemoCustomer {
        user,
        password: DEMO_PASSWORD.to_string(),
        balance: AccountBalance {
            balance: Decimal::new(542050, 2),
            available_balance: Decimal::new(542050, 2),
            account_number: "12345-6".to_string(),
        },
        credit_cards: vec![
            CreditCard {
                id: "demo-card-001".to_string(),
                card_number: "**** **** **** 4532".to_string(),
                card_name: "BankSys Platinum".to_string(),
                credit_limit: Decimal::new(800000, 2),
                available_limit: Decimal::new(645030, 2),
                current_balance: Decimal::new(154970, 2),
                due_date: now + Duration::days(12),
                minimum_payment: Decimal::new(15497, 2),
            },
            CreditCard {
                id: "demo-card-002".to_string(),
                card_number: "**** **** **** 8891".to_string(),
                card_name: "BankSys Gold".to_string(),
                credit_limit: Decimal::new(300000, 2),
                available_limit: Decimal::new(300000, 2),
                current_balance: Decimal::ZERO,
                due_date: now + Duration::days(20),
                minimum_payment: Decimal::ZERO,
            },
        ],
        transactions: Vec::new(),
    }
}

/// Sample transactions populated by the seed endpoint
fn generate_sample_transactions() -> Vec<Transaction> {
    use TransactionCategory as C;
    use TransactionType as T;

    let now = Utc::now().naive_utc();
    let samples: [(T, C, i64, &str, Option<&str>, Option<&str>, i64); 10] = [
        (T::Debit, C::Food, 4550, "Lunch at Restaurant ABC", Some("Restaurant ABC"), None, 1),
        (T::PixSent, C::Transfer, 20000, "Payment to friend", None, Some("João Silva"), 2),
        (T::BillPayment, C::Bills, 15000, "Electricity bill", Some("Light Company"), None, 3),
        (T::Debit, C::Transport, 2500, "Uber ride", Some("Uber"), None, 4),
        (T::Credit, C::Other, 150000, "Salary deposit", Some("Company XYZ"), None, 5),
        (T::Debit, C::Shopping, 8990, "Online shopping", Some("Amazon"), None, 6),
        (T::PixReceived, C::Transfer, 10000, "Payment received", None, Some("Maria Santos"), 7),
        (T::Debit, C::Entertainment, 3500, "Movie tickets", Some("Cinema 123"), None, 8),
        (T::BillPayment, C::Bills, 8000, "Internet bill", Some("ISP Provider"), None, 10),
        (T::Debit, C::Health, 12000, "Pharmacy", Some("Pharmacy ABC"), None, 12),
    ];

    samples
        .iter()
        .map(|(kind, category, cents, description, merchant, recipient, days_ago)| Transaction {
            id: Uuid::new_v4().to_string(),
            transaction_type: *kind,
            category: *category,
            amount: Decimal::new(*cents, 2),
            description: description.to_string(),
            merchant_name: merchant.map(str::to_string),
            recipient_name: recipient.map(str::to_string),
            transaction_date: now - Duration::days(*days_ago),
            status: "completed".to_string(),
            balance_after: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn login(api: &DemoBankingApi) -> BearerCredential {
        let resp = api
            .login(&LoginRequest::new(DEMO_CPF, DEMO_PASSWORD).unwrap())
            .await
            .unwrap();
        BearerCredential::new(resp.access_token)
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let api = DemoBankingApi::new();
        let err = api
            .login(&LoginRequest::new(DEMO_CPF, "wrong").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Authentication error: Invalid CPF or password");
    }

    #[tokio::test]
    async fn test_seed_then_list_newest_first() {
        let api = DemoBankingApi::new();
        let cred = login(&api).await;

        let msg = api.seed_sample_data(&cred).await.unwrap();
        assert_eq!(msg, "Created 10 sample transactions");

        let page = api.get_transactions(&cred, 5, 0).await.unwrap();
        assert_eq!(page.len(), 5);
        assert!(page
            .windows(2)
            .all(|w| w[0].transaction_date >= w[1].transaction_date));
        assert_eq!(page[0].description, "Lunch at Restaurant ABC");
    }

    #[tokio::test]
    async fn test_create_debit_rejects_overdraft() {
        let api = DemoBankingApi::new();
        let cred = login(&api).await;
        let draft = NewTransaction::new(TransactionType::Debit, Decimal::new(1_000_000, 2), "Car");
        let err = api.create_transaction(&cred, &draft).await.unwrap_err();
        assert_eq!(err.to_string(), "Insufficient funds");
    }

    #[tokio::test]
    async fn test_expired_tokens_are_rejected() {
        let api = DemoBankingApi::new();
        let cred = login(&api).await;
        api.expire_all_tokens().unwrap();
        assert!(api.get_balance(&cred).await.unwrap_err().is_auth());
        assert!(api
            .get_balance(&BearerCredential::empty())
            .await
            .unwrap_err()
            .is_auth());
    }

    #[tokio::test]
    async fn test_persistent_state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        {
            let api = DemoBankingApi::persistent(&path).unwrap();
            let cred = login(&api).await;
            api.seed_sample_data(&cred).await.unwrap();
        }
        let api = DemoBankingApi::persistent(&path).unwrap();
        let cred = login(&api).await;
        assert_eq!(api.get_transactions(&cred, 50, 0).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_analytics_totals() {
        let api = DemoBankingApi::new();
        let cred = login(&api).await;
        api.seed_sample_data(&cred).await.unwrap();
        let analytics = api.get_analytics(&cred, 6).await.unwrap();
        assert_eq!(analytics.total_income, Decimal::new(160000, 2));
        assert_eq!(analytics.total_expenses, Decimal::new(74540, 2));
        assert!(analytics.top_merchants.len() <= 5);
        assert_eq!(analytics.top_merchants[0].merchant, "Light Company");
    }
}
