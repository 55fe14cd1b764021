//! Metrics for chat-service.
//!
//! HTTP metrics are recorded through the `metrics` facade by the shared
//! middleware; turn outcomes and understanding-service calls live in a
//! Prometheus registry. Both are rendered together on `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static CHAT_TURNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static UNDERSTANDING_CALLS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static UNDERSTANDING_CALL_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// How a turn was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered,
    Fallback,
    Rejected,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Answered => "answered",
            TurnOutcome::Fallback => "fallback",
            TurnOutcome::Rejected => "rejected",
        }
    }
}

/// Install the Prometheus recorder and register the domain collectors.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics already initialized");
    }

    let registry = Registry::new();

    let turns = IntCounterVec::new(
        Opts::new("chat_turns_total", "Chat turns by kind and outcome"),
        &["kind", "outcome"],
    )?;

    let calls = IntCounterVec::new(
        Opts::new(
            "understanding_calls_total",
            "Calls to the understanding service by kind and result",
        ),
        &["kind", "status"],
    )?;

    let duration = HistogramVec::new(
        HistogramOpts::new(
            "understanding_call_duration_seconds",
            "Latency of understanding service calls",
        ),
        &["kind"],
    )?;

    registry.register(Box::new(turns.clone()))?;
    registry.register(Box::new(calls.clone()))?;
    registry.register(Box::new(duration.clone()))?;

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = CHAT_TURNS_TOTAL.set(turns);
    let _ = UNDERSTANDING_CALLS_TOTAL.set(calls);
    let _ = UNDERSTANDING_CALL_DURATION_SECONDS.set(duration);

    Ok(())
}

/// Metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

pub fn record_turn(kind: &str, outcome: TurnOutcome) {
    if let Some(counter) = CHAT_TURNS_TOTAL.get() {
        counter.with_label_values(&[kind, outcome.as_str()]).inc();
    }
}

pub fn record_understanding_call(kind: &str, status: &str, elapsed: Duration) {
    if let Some(counter) = UNDERSTANDING_CALLS_TOTAL.get() {
        counter.with_label_values(&[kind, status]).inc();
    }
    if let Some(histogram) = UNDERSTANDING_CALL_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[kind])
            .observe(elapsed.as_secs_f64());
    }
}
