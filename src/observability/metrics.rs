//! Client metrics.
//!
//! # Metrics
//! - `hashgraph_attempts_total` (counter): transport attempts by kind, disposition
//! - `hashgraph_calls_total` (counter): finished calls by kind, outcome
//! - `hashgraph_polls_total` (counter): finality polls by outcome
//! - `hashgraph_call_duration_seconds` (histogram): end-to-end call latency by kind

use std::time::Instant;

/// One transport attempt. `disposition` is a classification or `transport_error`.
pub fn record_attempt(kind: &'static str, disposition: &'static str) {
    ::metrics::counter!(
        "hashgraph_attempts_total",
        "kind" => kind,
        "disposition" => disposition
    )
    .increment(1);
}

/// A finished execute call and its latency.
pub fn record_call(kind: &'static str, outcome: &'static str, start_time: Instant) {
    ::metrics::counter!("hashgraph_calls_total", "kind" => kind, "outcome" => outcome).increment(1);
    ::metrics::histogram!("hashgraph_call_duration_seconds", "kind" => kind)
        .record(start_time.elapsed().as_secs_f64());
}

/// One finality poll: `final`, `pending`, `rejected` or `transport_error`.
pub fn record_poll(outcome: &'static str) {
    ::metrics::counter!("hashgraph_polls_total", "outcome" => outcome).increment(1);
}
