//! Observability infrastructure - Tracing and Metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_cas_conflict, record_http_request,
    record_provider_call, record_quota_decision, record_transient_failure, sanitize_path, PrometheusMetrics,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
