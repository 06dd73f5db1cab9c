//! Logging middleware
//!
//! Complements the `TraceLayer` spans with one summary line per request and
//! a warning for slow ones.

use std::time::{Duration, Instant};

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info, warn};

const SLOW_REQUEST: Duration = Duration::from_millis(1000);

/// Log method, path, status and latency of every request
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    let duration_ms = elapsed.as_millis() as u64;

    if elapsed >= SLOW_REQUEST {
        warn!(method = %method, path = %path, status, duration_ms, "Slow request");
    } else {
        info!(method = %method, path = %path, status, duration_ms, "Request handled");
    }

    response
}
