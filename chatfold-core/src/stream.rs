//! Streaming primitives consumed by chatfold.
//!
//! Contract:
//! - A provider stream yields 0..n `Ok(ChatChunk)` items in delivery order.
//! - It ends in exactly one of three ways: end-of-stream (completed), an `Err`
//!   item (failed), or the consumer dropping it early (cancelled).
//! - Items after an `Err` may still arrive; they are not part of a successful response.

use crate::error::CoreResult;
use crate::model::ChatChunk;

/// Boxed stream of chunks. Providers that support streaming return this.
pub type ChunkStream = futures::stream::BoxStream<'static, CoreResult<ChatChunk>>;

/// How one stream ended, from the aggregator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl StreamOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Build a `ChunkStream` from already-materialized items, e.g. a recording.
pub fn from_items(items: Vec<CoreResult<ChatChunk>>) -> ChunkStream {
    Box::pin(futures::stream::iter(items))
}
