//! Metrics collection for the bot using Prometheus
//!
//! Tracks the dispatch engine's behavior:
//! - Update volume by kind (message/callback/synthetic)
//! - Command usage and access denials
//! - Continuations consumed and analyzer-synthesized invocations
//! - Dispatch errors and recursion-ceiling hits

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

/// Updates entering the dispatcher by kind
/// Labels: kind (message/callback/synthetic)
pub static UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bayun_updates_total",
        "Updates entering the dispatcher by kind",
        &["kind"]
    )
    .unwrap()
});

/// Command executions by canonical command id
pub static COMMAND_USAGE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bayun_command_usage_total",
        "Total number of command executions",
        &["command"]
    )
    .unwrap()
});

/// Denied invocations by canonical command id
pub static ACCESS_DENIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bayun_access_denied_total",
        "Command invocations rejected by the access gate",
        &["command"]
    )
    .unwrap()
});

/// Waiting-state continuations consumed
pub static CONTINUATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "bayun_continuations_total",
        "Waiting-state continuations consumed by the dispatcher"
    )
    .unwrap()
});

/// Synthetic invocations by analyzer name
pub static ANALYZER_SYNTH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bayun_analyzer_synth_total",
        "Synthetic invocations produced by analyzers",
        &["analyzer"]
    )
    .unwrap()
});

/// Dispatch errors by error kind
pub static DISPATCH_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bayun_dispatch_errors_total",
        "Errors surfaced at the dispatch boundary by kind",
        &["error_type"]
    )
    .unwrap()
});

/// Event chains dropped at the recursion ceiling
pub static DEPTH_EXCEEDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "bayun_depth_exceeded_total",
        "Event chains dropped at the dispatch recursion ceiling"
    )
    .unwrap()
});

/// Initialize metrics (call this at startup to register all metrics)
pub fn init_metrics() {
    log::info!("Initializing metrics registry...");

    // Touch every lazy static so the series exist with 0 values
    // before the first real event.
    UPDATES_TOTAL.with_label_values(&["message"]);
    UPDATES_TOTAL.with_label_values(&["callback"]);
    UPDATES_TOTAL.with_label_values(&["synthetic"]);

    let _ = &*COMMAND_USAGE_TOTAL;
    let _ = &*ACCESS_DENIED_TOTAL;
    let _ = &*CONTINUATIONS_TOTAL;
    let _ = &*ANALYZER_SYNTH_TOTAL;
    let _ = &*DEPTH_EXCEEDED_TOTAL;

    DISPATCH_ERRORS_TOTAL.with_label_values(&["database"]);
    DISPATCH_ERRORS_TOTAL.with_label_values(&["telegram"]);
    DISPATCH_ERRORS_TOTAL.with_label_values(&["invalid_input"]);
    DISPATCH_ERRORS_TOTAL.with_label_values(&["upstream"]);
    DISPATCH_ERRORS_TOTAL.with_label_values(&["depth_exceeded"]);
    DISPATCH_ERRORS_TOTAL.with_label_values(&["internal"]);

    log::info!("Metrics registry initialized successfully");
}

/// Helper function to record an update entering the dispatcher
pub fn record_update(kind: &str) {
    UPDATES_TOTAL.with_label_values(&[kind]).inc();
}

/// Helper function to record command usage
pub fn record_command(command: &str) {
    COMMAND_USAGE_TOTAL.with_label_values(&[command]).inc();
}

/// Helper function to record an access denial
pub fn record_access_denied(command: &str) {
    ACCESS_DENIED_TOTAL.with_label_values(&[command]).inc();
}

/// Helper function to record a consumed continuation
pub fn record_continuation() {
    CONTINUATIONS_TOTAL.inc();
}

/// Helper function to record an analyzer-synthesized invocation
pub fn record_analyzer_synth(analyzer: &str) {
    ANALYZER_SYNTH_TOTAL.with_label_values(&[analyzer]).inc();
}

/// Helper function to record a dispatch error
pub fn record_dispatch_error(error_type: &str) {
    DISPATCH_ERRORS_TOTAL.with_label_values(&[error_type]).inc();
    if error_type == "depth_exceeded" {
        DEPTH_EXCEEDED_TOTAL.inc();
    }
}
