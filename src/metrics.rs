//! Engine metrics
//!
//! Counters and histograms through the `metrics` facade. Embedders install
//! whatever recorder suits them; without one these are no-ops.

use crate::device::Backend;

/// Record the start of a load attempt
pub fn record_load_started() {
    metrics::counter!("muse_engine_loads_started_total").increment(1);
}

/// Record a successful load, including warm-up time
pub fn record_load_completed(backend: Backend, duration_secs: f64) {
    metrics::counter!("muse_engine_loads_total",
        "outcome" => "ok",
        "backend" => backend.to_string()
    )
    .increment(1);
    metrics::histogram!("muse_engine_load_duration_seconds").record(duration_secs);
}

/// Record a failed load attempt
pub fn record_load_failed() {
    metrics::counter!("muse_engine_loads_total", "outcome" => "error").increment(1);
}

/// Record one generation call
pub fn record_generation(tokens: u64, duration_secs: f64) {
    metrics::counter!("muse_engine_generated_tokens_total").increment(tokens);
    metrics::histogram!("muse_engine_generate_duration_seconds").record(duration_secs);
    if duration_secs > 0.0 {
        metrics::histogram!("muse_engine_tokens_per_second").record(tokens as f64 / duration_secs);
    }
}

/// Record a failed generation call on an established session
pub fn record_generation_failed() {
    metrics::counter!("muse_engine_generate_failures_total").increment(1);
}
