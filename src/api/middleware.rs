//! API Middleware
//!
//! Request logging with masked headers and correlation ids.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the caller's correlation id
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id attached to every request's extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "x-api-key",
    "authorization",
    "cookie",
    "set-cookie",
];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

/// Caller-supplied correlation id, or a fresh one
pub fn correlation_id_from(headers: &HeaderMap) -> Uuid {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4)
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());
    let correlation_id = correlation_id_from(request.headers());
    request
        .extensions_mut()
        .insert(CorrelationId(correlation_id));

    let span = tracing::info_span!(
        "request",
        method = %method,
        uri = %uri,
        correlation_id = %correlation_id,
    );

    async move {
        let start = std::time::Instant::now();

        tracing::info!(version = ?version, headers = ?headers, "Incoming request");

        let mut response = next.run(request).await;

        let duration = start.elapsed();
        let status = response.status();

        tracing::info!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}
