//! BankSys REST API client
//!
//! Handles communication with the BankSys backend for authentication,
//! balances, cards and transactions. Error responses carry a FastAPI-style
//! `{"detail": ...}` body whose message is surfaced verbatim.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AccountBalance, BearerCredential, CreditCard, LoginRequest, LoginResponse, NewTransaction,
    PixPayment, RegisterRequest, Transaction, TransactionAnalytics, User,
};
use crate::ports::BankingApi;

/// Default bound on every outbound call
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default backend URL for local development
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Environment variable to override the backend base URL
pub const BANKSYS_API_URL_ENV: &str = "BANKSYS_API_URL";

#[derive(Debug, Deserialize)]
struct SeedResponse {
    message: String,
}

/// HTTP implementation of [`BankingApi`]
#[derive(Debug, Clone)]
pub struct HttpBankingApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBankingApi {
    /// Create a client with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Config("BankSys API URL cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request, attaching the bearer header when there is a token
    fn request(&self, method: Method, path: &str, credential: &BearerCredential) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, &url);
        match credential.header_value() {
            Some(value) => req.header(reqwest::header::AUTHORIZATION, value),
            None => req,
        }
    }

    /// Send a request and decode a successful body
    ///
    /// `fallback` is the message used when the server gives no `detail`.
    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder, fallback: &str) -> Result<T> {
        let response = req.send().await.map_err(|e| self.map_request_error(e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status, &body, fallback));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                self.map_request_error(e)
            } else {
                Error::MalformedResponse(format!("{}: {}", fallback, e))
            }
        })
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::network(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::network("Unable to connect to BankSys servers")
        } else if error.is_decode() {
            Error::MalformedResponse(error.to_string())
        } else {
            Error::network(format!("BankSys request failed: {}", error))
        }
    }
}

/// Pull the human-readable message out of an error body
///
/// `detail` is a string for handled errors and a list of `{msg, loc}` objects
/// for request validation failures.
fn extract_detail(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

/// Check response status and return the matching error
fn map_error_status(status: StatusCode, body: &str, fallback: &str) -> Error {
    let detail = extract_detail(body);
    match status.as_u16() {
        401 | 403 => Error::Auth(
            detail.unwrap_or_else(|| "Could not validate credentials".to_string()),
        ),
        code => Error::Server {
            status: code,
            message: detail.unwrap_or_else(|| fallback.to_string()),
        },
    }
}

#[async_trait]
impl BankingApi for HttpBankingApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let req = self
            .request(Method::POST, "/api/auth/login", &BearerCredential::empty())
            .json(request);
        self.execute(req, "Login failed").await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let req = self
            .request(Method::POST, "/api/auth/register", &BearerCredential::empty())
            .json(request);
        self.execute(req, "Registration failed").await
    }

    async fn current_user(&self, credential: &BearerCredential) -> Result<User> {
        let req = self.request(Method::GET, "/api/auth/me", credential);
        self.execute(req, "Failed to verify session").await
    }

    async fn get_balance(&self, credential: &BearerCredential) -> Result<AccountBalance> {
        let req = self.request(Method::GET, "/api/accounts/balance", credential);
        self.execute(req, "Failed to get account balance").await
    }

    async fn get_credit_cards(&self, credential: &BearerCredential) -> Result<Vec<CreditCard>> {
        let req = self.request(Method::GET, "/api/accounts/credit-cards", credential);
        self.execute(req, "Failed to get credit cards").await
    }

    async fn get_transactions(
        &self,
        credential: &BearerCredential,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>> {
        let req = self
            .request(Method::GET, "/api/transactions/", credential)
            .query(&[("limit", limit), ("skip", offset)]);
        self.execute(req, "Failed to get transactions").await
    }

    async fn create_transaction(
        &self,
        credential: &BearerCredential,
        draft: &NewTransaction,
    ) -> Result<Transaction> {
        let req = self
            .request(Method::POST, "/api/transactions/", credential)
            .json(draft);
        self.execute(req, "Failed to create transaction").await
    }

    async fn send_pix(
        &self,
        credential: &BearerCredential,
        payment: &PixPayment,
    ) -> Result<Transaction> {
        let req = self
            .request(Method::POST, "/api/transactions/pix", credential)
            .json(payment);
        self.execute(req, "Failed to send PIX").await
    }

    async fn get_analytics(
        &self,
        credential: &BearerCredential,
        months: u32,
    ) -> Result<TransactionAnalytics> {
        let req = self
            .request(Method::GET, "/api/transactions/analytics", credential)
            .query(&[("months", months)]);
        self.execute(req, "Failed to get analytics").await
    }

    async fn seed_sample_data(&self, credential: &BearerCredential) -> Result<String> {
        let req = self
            .request(Method::POST, "/api/transactions/seed-data", credential)
            .json(&serde_json::json!({}));
        let resp: SeedResponse = self.execute(req, "Failed to seed data").await?;
        Ok(resp.message)
    }
}

// =============================================================================
// Tests
// =============================================================================
