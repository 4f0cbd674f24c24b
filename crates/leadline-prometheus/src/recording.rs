// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use std::time::Duration;

use metrics::{describe_counter, describe_histogram};

/// Register all Leadline metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "leadline_webhooks_total",
        "Inbound webhooks handled, by terminal outcome"
    );
    describe_counter!(
        "leadline_replies_total",
        "Reply generation attempts, by result"
    );
    describe_counter!("leadline_dispatch_total", "Outbound sends, by result");
    describe_counter!(
        "leadline_status_callbacks_total",
        "Delivery status callbacks, by result"
    );
    describe_histogram!(
        "leadline_generation_latency_seconds",
        "Completion call latency in seconds"
    );
    describe_histogram!(
        "leadline_dispatch_latency_seconds",
        "Send API latency in seconds"
    );
}

/// Record a handled webhook by outcome label (e.g. `replied`, `lead_not_found`).
pub fn record_webhook(outcome: &'static str) {
    metrics::counter!("leadline_webhooks_total", "outcome" => outcome).increment(1);
}

/// Record a reply generation result (`generated`, `failed`, `timeout`).
pub fn record_reply(result: &'static str, latency: Duration) {
    metrics::counter!("leadline_replies_total", "result" => result).increment(1);
    metrics::histogram!("leadline_generation_latency_seconds").record(latency.as_secs_f64());
}

/// Record a dispatch result (`sent`, `failed`).
pub fn record_dispatch(result: &'static str, latency: Duration) {
    metrics::counter!("leadline_dispatch_total", "result" => result).increment(1);
    metrics::histogram!("leadline_dispatch_latency_seconds").record(latency.as_secs_f64());
}

/// Record a processed delivery status callback.
pub fn record_status_callback(result: &'static str) {
    metrics::counter!("leadline_status_callbacks_total", "result" => result).increment(1);
}
