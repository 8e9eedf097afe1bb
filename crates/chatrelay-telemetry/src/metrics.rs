//! Metric names and the chat instrument set

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub const CHAT_REQUEST_COUNT: &str = "chat.request.count";
pub const CHAT_STREAM_CHUNKS: &str = "chat.stream.chunks";
pub const CHAT_UPSTREAM_ERRORS: &str = "chat.upstream.errors";
pub const CHAT_TIME_TO_FIRST_CHUNK: &str = "chat.time_to_first_chunk";

/// Instruments recorded by the chat endpoint
///
/// Bound to the global meter provider; when no exporter is configured the
/// global provider is a no-op and recording costs nothing.
#[derive(Clone)]
pub struct ChatMetrics {
    requests: Counter<u64>,
    chunks: Counter<u64>,
    upstream_errors: Counter<u64>,
    time_to_first_chunk: Histogram<f64>,
}

impl ChatMetrics {
    pub fn new() -> Self {
        let meter = global::meter("chatrelay");

        Self {
            requests: meter
                .u64_counter(CHAT_REQUEST_COUNT)
                .with_description("Chat requests accepted")
                .build(),
            chunks: meter
                .u64_counter(CHAT_STREAM_CHUNKS)
                .with_description("Upstream chunks relayed to clients")
                .build(),
            upstream_errors: meter
                .u64_counter(CHAT_UPSTREAM_ERRORS)
                .with_description("Upstream failures surfaced to clients")
                .build(),
            time_to_first_chunk: meter
                .f64_histogram(CHAT_TIME_TO_FIRST_CHUNK)
                .with_unit("s")
                .with_description("Delay between the request and the first relayed chunk")
                .build(),
        }
    }

    pub fn record_request(&self, mode: &'static str) {
        self.requests.add(1, &[KeyValue::new("mode", mode)]);
    }

    pub fn record_chunk(&self) {
        self.chunks.add(1, &[]);
    }

    pub fn record_upstream_error(&self, error_type: &str) {
        self.upstream_errors
            .add(1, &[KeyValue::new("error.type", error_type.to_owned())]);
    }

    pub fn record_first_chunk(&self, start: Instant) {
        self.time_to_first_chunk.record(start.elapsed().as_secs_f64(), &[]);
    }
}

impl Default for ChatMetrics {
    fn default() -> Self {
        Self::new()
    }
}
