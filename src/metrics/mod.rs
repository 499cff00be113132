//! Prometheus counters for the procurement lifecycle, exported at `/metrics`.

use axum::{http::header, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref ORDER_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "procurement_order_transitions_total",
            "Procurement order status transitions by action"
        ),
        &["action"]
    )
    .expect("metric can be created");
    pub static ref ORDER_TRANSITION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "procurement_order_transition_failures_total",
            "Rejected procurement order operations by action and error type"
        ),
        &["action", "error_type"]
    )
    .expect("metric can be created");
    pub static ref RECEIPTS_CONFIRMED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "procurement_receipts_confirmed_total",
            "Confirmed receipts by outcome"
        ),
        &["outcome"]
    )
    .expect("metric can be created");
    pub static ref ASSETS_GENERATED: IntCounter = IntCounter::new(
        "assets_generated_total",
        "Asset rows created from received procurement items"
    )
    .expect("metric can be created");
    pub static ref GATE_DENIALS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "authorization_gate_denials_total",
            "Actions refused by the authorization gate"
        ),
        &["action"]
    )
    .expect("metric can be created");
    pub static ref ASSET_WORKFLOW_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "asset_workflow_transitions_total",
            "Asset verification workflow transitions by target status"
        ),
        &["status"]
    )
    .expect("metric can be created");
}

/// Registers every collector once. Repeated calls are harmless.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ORDER_TRANSITIONS.clone()),
        Box::new(ORDER_TRANSITION_FAILURES.clone()),
        Box::new(RECEIPTS_CONFIRMED.clone()),
        Box::new(ASSETS_GENERATED.clone()),
        Box::new(GATE_DENIALS.clone()),
        Box::new(ASSET_WORKFLOW_TRANSITIONS.clone()),
    ];
    for collector in collectors {
        // AlreadyReg is expected on the second call
        let _ = REGISTRY.register(collector);
    }
}

/// Renders the registry in Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render(),
    )
}
