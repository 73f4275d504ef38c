//! Telemetry primitives for stream aggregation.
//! By default, no telemetry is emitted unless a sink is installed via `set_telemetry_sink`.

pub mod keys;
pub mod types;
#[cfg(test)]
pub mod test_span;

pub use keys::*;
pub use types::*;

use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Implement this to receive telemetry events.
///
/// Requirements:
/// - Implementations must be thread-safe (`Send + Sync`) and `'static`.
/// - `record_aggregation` **may** be called from any thread, including from
///   inside a stream poll; implementations should not block or panic.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record_aggregation(&self, log: crate::telemetry::AggregationLog);
}

static TELEMETRY_SINK: OnceCell<Arc<dyn TelemetrySink>> = OnceCell::new();

// In tests, gate emission to only the calling test thread to avoid cross-test interference.
#[cfg(test)]
thread_local! {
    static TEST_CAPTURE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Install a global telemetry sink. Returns `false` if a sink is already installed.
///
/// This is a write-once global for the process lifetime (backed by `OnceCell`).
pub fn set_telemetry_sink(sink: Arc<dyn TelemetrySink>) -> bool {
    TELEMETRY_SINK.set(sink).is_ok()
}

/// Emit an aggregation record if a sink is installed.
///
/// In tests, emission is suppressed unless explicitly enabled via `test_set_capture_enabled`.
#[inline]
pub(crate) fn emit_aggregation(log: crate::telemetry::AggregationLog) {
    #[cfg(test)]
    {
        if !TEST_CAPTURE.with(|c| c.get()) {
            return;
        }
    }
    if let Some(sink) = TELEMETRY_SINK.get() {
        sink.record_aggregation(log);
    }
}

#[cfg(test)]
/// Test-only helper: enable or disable capture for the current test thread.
///
/// Spawned threads in a test must call this as well if they should emit.
pub fn test_set_capture_enabled(enabled: bool) {
    TEST_CAPTURE.with(|c| c.set(enabled));
}
