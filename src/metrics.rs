// Prometheus metrics definitions for the score backend.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::Method,
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Score records accepted and stored.
    pub static ref SCORES_SUBMITTED_TOTAL: IntCounter = IntCounter::new(
        "math_game_scores_submitted_total",
        "Score records accepted and stored",
    )
    .unwrap();

    /// Score payloads rejected at the boundary.
    pub static ref SCORE_VALIDATION_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "math_game_score_validation_failures_total",
        "Score payloads that failed validation",
    )
    .unwrap();

    /// Requests that failed because the store was unavailable.
    pub static ref STORAGE_ERRORS_TOTAL: IntCounter = IntCounter::new(
        "math_game_storage_errors_total",
        "Requests failed by storage errors",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("math_game_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "math_game_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than once;
/// repeated registrations are ignored.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SCORES_SUBMITTED_TOTAL.clone()),
        Box::new(SCORE_VALIDATION_FAILURES_TOTAL.clone()),
        Box::new(STORAGE_ERRORS_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(API_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                tracing::warn!("Failed to register metric: {e}");
            }
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Label value for requests that matched no route.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Route template (e.g. `/scores`) for the metric label. Raw paths are never
/// used so that unknown URLs cannot create new series.
pub fn endpoint_label<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string())
}

/// Standard methods keep their name; extension methods share one label.
fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::PATCH => "PATCH",
        _ => "OTHER",
    }
}

/// Middleware recording request count and latency per endpoint.
pub async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let method = method_label(req.method());
    let endpoint = endpoint_label(&req);
    let start = Instant::now();

    let response = next.run(req).await;

    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(start.elapsed().as_secs_f64());
    API_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint.as_str(), response.status().as_str()])
        .inc();

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_label_without_route_is_unmatched() {
        let req = Request::builder()
            .uri("/wp-admin/setup.php")
            .body(Body::empty())
            .unwrap();
        assert_eq!(endpoint_label(&req), UNMATCHED_ENDPOINT);
    }

    #[test]
    fn test_method_label_collapses_extensions() {
        assert_eq!(method_label(&Method::POST), "POST");
        let custom = Method::from_bytes(b"SCANME").unwrap();
        assert_eq!(method_label(&custom), "OTHER");
    }

    #[test]
    fn test_register_twice_and_gather() {
        register_metrics();
        register_metrics();
        SCORES_SUBMITTED_TOTAL.inc();
        let output = gather_metrics();
        assert!(output.contains("math_game_scores_submitted_total"));
    }

    #[test]
    fn test_request_metrics_labels() {
        API_REQUESTS_TOTAL
            .with_label_values(&["GET", "/scores", "200"])
            .inc();
        assert!(
            API_REQUESTS_TOTAL
                .with_label_values(&["GET", "/scores", "200"])
                .get()
                >= 1
        );
        API_REQUEST_DURATION_SECONDS
            .with_label_values(&["/scores"])
            .observe(0.01);
    }
}
