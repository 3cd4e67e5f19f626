//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::store::LedgerStore;

pub use routes::create_router;

/// Build the application router over `store`
pub fn build_app<S: LedgerStore>(store: S) -> Router {
    // Layers run in reverse order of addition: trace -> logging -> handler
    Router::new()
        .route("/health", get(health_check))
        .merge(create_router::<S>())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
