//! Per-request structured access log

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

/// Middleware: log method, route, status and latency for every request
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let started = Instant::now();
    let response = next.run(req).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    let status = response.status();
    if status.is_server_error() {
        tracing::warn!(%method, %route, status = status.as_u16(), latency_ms, "request failed");
    } else {
        tracing::info!(%method, %route, status = status.as_u16(), latency_ms, "request completed");
    }

    response
}
