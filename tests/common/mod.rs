//! Common test utilities
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;

use transfer_ledger::api;
use transfer_ledger::store::MemoryStore;

/// Router over a fresh in-memory ledger, plus a handle on the store
pub fn memory_app() -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    (api::build_app(store.clone()), store)
}

/// Build a JSON POST request
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    post_raw(uri, body.to_string())
}

/// Build a POST request with a raw JSON body
pub fn post_raw(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send a request and return status plus parsed JSON body (`Null` when empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Create an account through the API and assert it succeeded
pub async fn create_account(app: &Router, account_id: i64, initial_balance: &str) {
    let (status, _) = send(
        app,
        post_json(
            "/accounts",
            serde_json::json!({ "account_id": account_id, "initial_balance": initial_balance }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "account {account_id} creation failed");
}

/// Balance string reported by `GET /accounts/{id}`
pub async fn balance(app: &Router, account_id: i64) -> String {
    let (status, json) = send(app, get(&format!("/accounts/{account_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    json["balance"].as_str().unwrap().to_string()
}

/// Setup test database - apply migrations and truncate tables
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    transfer_ledger::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean up DB for fresh state
    sqlx::query("TRUNCATE TABLE transactions, accounts RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}
