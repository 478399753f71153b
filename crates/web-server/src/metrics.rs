use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

/// The collectors exposed on `/metrics`, held in a private registry.
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served, by route and status."),
            &["method", "path", "status"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Time spent producing a response, by route.",
            ),
            &["path"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency,
        })
    }

    pub fn observe(&self, method: &str, path: &str, status: u16, seconds: f64) {
        self.requests
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.latency.with_label_values(&[path]).observe(seconds);
    }

    /// Renders every collector in the Prometheus text format.
    pub fn render(&self) -> Result<(String, String), AppError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), String::from_utf8(buffer)?))
    }
}

/// Collapses request paths onto the routes that served them, so arbitrary
/// paths hitting the echo handler do not each mint a new time series.
pub fn route_label(path: &str) -> &'static str {
    match path {
        "/hi" => "/hi",
        "/metrics" => "/metrics",
        _ => "/",
    }
}

/// Middleware recording a count and a latency sample for every request.
pub async fn track(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let path = route_label(req.uri().path());
    let started = Instant::now();

    let response = next.run(req).await;

    state.metrics.observe(
        &method,
        path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
