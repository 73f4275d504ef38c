//! Chunk builders and a capturing telemetry sink shared by unit tests.

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::metadata::MetadataEnvelope;
use crate::model::ChatChunk;
use crate::telemetry::{AggregationLog, TelemetrySink};
use crate::usage::Usage;

pub fn chunk(text: &str) -> ChatChunk {
    ChatChunk::delta(text)
}

pub fn envelope_chunk(text: &str, envelope: MetadataEnvelope) -> ChatChunk {
    ChatChunk::delta(text).with_envelope(envelope)
}

/// A chunk with no text, only a usage report (what OpenAI sends last with `stream_options.include_usage`).
pub fn usage_chunk(prompt: Option<u32>, completion: Option<u32>) -> ChatChunk {
    ChatChunk::new(Default::default())
        .with_envelope(MetadataEnvelope::new().with_usage(Usage::new(prompt, completion)))
}

static AGGREGATION_LOGS: Lazy<Mutex<Vec<AggregationLog>>> = Lazy::new(|| Mutex::new(Vec::new()));

struct CollectingSink;

impl TelemetrySink for CollectingSink {
    fn record_aggregation(&self, log: AggregationLog) {
        AGGREGATION_LOGS.lock().unwrap().push(log);
    }
}

pub fn ensure_sink_installed() {
    let _ = crate::telemetry::set_telemetry_sink(Arc::new(CollectingSink));
}

/// Logs recorded so far for `model`. Tests pick unique model names to stay isolated.
pub fn logs_for_model(model: &str) -> Vec<AggregationLog> {
    AGGREGATION_LOGS
        .lock()
        .unwrap()
        .iter()
        .filter(|l| l.model.as_deref() == Some(model))
        .cloned()
        .collect()
}
