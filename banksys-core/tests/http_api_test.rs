//! HTTP adapter tests against a mock BankSys server
//!
//! Run with: cargo test --test http_api_test

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use banksys_core::adapters::http::HttpBankingApi;
use banksys_core::domain::LoginRequest;
use banksys_core::{
    BankingApi, BearerCredential, Error, NewTransaction, TransactionCategory, TransactionType,
};

fn user_json() -> serde_json::Value {
    json!({
        "id": "u1",
        "cpf": "12345678901",
        "full_name": "Maria Silva Santos",
        "email": "maria.silva@email.com",
        "phone": "+55 11 98765-4321",
        "profile_image": null,
        "biometric_enabled": false,
        "created_at": "2024-01-01T10:00:00.123456"
    })
}

async fn api(server: &MockServer) -> HttpBankingApi {
    HttpBankingApi::new(&server.uri()).unwrap()
}

#[tokio::test]
async fn test_login_posts_credentials_and_reads_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"cpf": "12345678901", "password": "senha123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "t1",
            "token_type": "bearer",
            "user": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = LoginRequest::new("123.456.789-01", "senha123").unwrap();
    let response = api(&server).await.login(&request).await.unwrap();

    assert_eq!(response.access_token, "t1");
    assert_eq!(response.user.full_name, "Maria Silva Santos");
    assert!(response.user.created_at.is_some());
}

#[tokio::test]
async fn test_bad_login_surfaces_detail_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid CPF or password"})),
        )
        .mount(&server)
        .await;

    let request = LoginRequest::new("12345678901", "wrong").unwrap();
    let err = api(&server).await.login(&request).await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(err.to_string(), "Authentication error: Invalid CPF or password");
}

#[tokio::test]
async fn test_authorized_calls_send_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/accounts/balance"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "balance": 5420.5,
            "available_balance": "5420.50",
            "account_number": "12345-6"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let balance = api(&server)
        .await
        .get_balance(&BearerCredential::new("t1"))
        .await
        .unwrap();

    assert_eq!(balance.balance, Decimal::new(54205, 1));
    assert_eq!(balance.available_balance, Decimal::new(542050, 2));
}

#[tokio::test]
async fn test_transactions_page_uses_limit_and_skip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .and(query_param("limit", "20"))
        .and(query_param("skip", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "t1",
            "transaction_type": "debit",
            "category": "food",
            "amount": 45.5,
            "description": "Lunch at Restaurant ABC",
            "merchant_name": "Restaurant ABC",
            "transaction_date": "2024-01-15T12:30:00",
            "status": "completed",
            "balance_after": null
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let page = api(&server)
        .await
        .get_transactions(&BearerCredential::new("t1"), 20, 40)
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].category, TransactionCategory::Food);
    assert_eq!(page[0].amount, Decimal::new(455, 1));
    assert_eq!(page[0].balance_after, None);
}

#[tokio::test]
async fn test_expired_token_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/accounts/credit-cards"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Could not validate credentials"})),
        )
        .mount(&server)
        .await;

    let err = api(&server)
        .await
        .get_credit_cards(&BearerCredential::new("expired"))
        .await
        .unwrap_err();

    assert!(err.is_auth());
}

#[tokio::test]
async fn test_server_error_message_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transactions/"))
        .and(body_json(json!({
            "transaction_type": "debit",
            "category": "food",
            "amount": 89.5,
            "description": "Groceries",
            "merchant_name": "Mercado Central"
        })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Insufficient funds"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let draft = NewTransaction::new(TransactionType::Debit, Decimal::new(8950, 2), "Groceries")
        .with_category(TransactionCategory::Food)
        .with_merchant("Mercado Central");
    let err = api(&server)
        .await
        .create_transaction(&BearerCredential::new("t1"), &draft)
        .await
        .unwrap_err();

    match err {
        Error::Server { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Insufficient funds");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_enum_value_is_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/transactions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "t1",
            "transaction_type": "teleport",
            "amount": 1,
            "description": "x",
            "transaction_date": "2024-01-15T12:30:00",
            "status": "completed"
        }])))
        .mount(&server)
        .await;

    let err = api(&server)
        .await
        .get_transactions(&BearerCredential::new("t1"), 20, 0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_json())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let api = HttpBankingApi::with_timeout(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = api
        .current_user(&BearerCredential::new("t1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on the discard port
    let api = HttpBankingApi::new("http://127.0.0.1:9").unwrap();
    let err = api
        .get_balance(&BearerCredential::new("t1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
}

#[tokio::test]
async fn test_seed_returns_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transactions/seed-data"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Created 10 sample transactions"})),
        )
        .mount(&server)
        .await;

    let message = api(&server)
        .await
        .seed_sample_data(&BearerCredential::new("t1"))
        .await
        .unwrap();

    assert_eq!(message, "Created 10 sample transactions");
}
