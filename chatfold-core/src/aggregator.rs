//! Folding a chunked chat response into one message while it is being streamed.
//!
//! [`ResponseAggregator::aggregate`] wraps a provider stream in a tap. The
//! consumer (typically a UI rendering deltas as they arrive) polls the tap
//! exactly as it would poll the provider stream: every item comes out
//! unchanged and in order. Behind the scenes the tap folds each chunk into a
//! per-stream accumulation context and, once the upstream ends cleanly, hands a
//! single [`AggregateMessage`] to the completion callback.
//!
//! The accumulation context lives inside the tap, so it is mutated only through
//! `poll_next(&mut self)`: one writer per stream, no locks, and no state shared
//! between two streams attached to the same aggregator.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::{Stream, StreamExt};
use tracing::{debug, error, info_span, warn};

use crate::config::{AggregationCfg, CounterDecreasePolicy};
use crate::error::{ChatfoldError, CoreResult};
use crate::metadata::MetadataEnvelopeBuilder;
use crate::model::{AggregateMessage, ChatChunk, ChatMessage};
use crate::stream::StreamOutcome;
use crate::telemetry::{self, AggregationLog};

type CompletionCallback = Box<dyn FnOnce(AggregateMessage) + Send>;

/// Where a tapped stream is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationState {
    /// No accumulation in progress: the stream has ended (any way) and its context is gone.
    Idle,
    Accumulating,
}

/// Attaches to chat response streams and reports one aggregate per completed stream.
///
/// The aggregator itself holds only policy; each call to [`aggregate`](Self::aggregate)
/// starts a fresh accumulation context, so one instance can serve any number
/// of streams, one after another or concurrently.
#[derive(Debug, Clone, Default)]
pub struct ResponseAggregator {
    on_counter_decrease: CounterDecreasePolicy,
}

impl ResponseAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &AggregationCfg) -> Self {
        Self {
            on_counter_decrease: cfg.on_counter_decrease,
        }
    }

    pub fn with_decrease_policy(mut self, policy: CounterDecreasePolicy) -> Self {
        self.on_counter_decrease = policy;
        self
    }

    /// Tap `upstream`. `on_complete` runs once, after the last chunk, if and
    /// only if the upstream ends without yielding an error.
    pub fn aggregate<S, F>(&self, upstream: S, on_complete: F) -> Aggregating<S>
    where
        S: Stream<Item = CoreResult<ChatChunk>> + Unpin,
        F: FnOnce(AggregateMessage) + Send + 'static,
    {
        debug!("aggregation attached to new stream");
        Aggregating {
            upstream,
            context: Some(AccumulationContext::default()),
            on_complete: Some(Box::new(on_complete)),
            on_counter_decrease: self.on_counter_decrease,
        }
    }

    /// Drain `upstream` and return its aggregate, or the first error it yielded.
    pub async fn collect<S>(&self, upstream: S) -> CoreResult<AggregateMessage>
    where
        S: Stream<Item = CoreResult<ChatChunk>> + Unpin,
    {
        let (tx, rx) = oneshot::channel();
        let mut tap = self.aggregate(upstream, move |aggregate| {
            let _ = tx.send(aggregate);
        });
        let mut first_err = None;
        while let Some(item) = tap.next().await {
            if let Err(e) = item
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        drop(tap);
        if let Some(e) = first_err {
            return Err(e);
        }
        rx.await.map_err(|_| {
            ChatfoldError::Validation("stream ended without producing an aggregate".into())
        })
    }
}

/// Text, generation metadata and envelope gathered so far for one stream.
#[derive(Debug, Default)]
struct AccumulationContext {
    text: String,
    metadata: HashMap<String, serde_json::Value>,
    envelope: MetadataEnvelopeBuilder,
    chunks: u64,
}

impl AccumulationContext {
    fn apply(&mut self, chunk: &ChatChunk) {
        let Some(result) = &chunk.result else {
            return;
        };
        self.chunks += 1;
        if let Some(delta) = &result.text {
            self.text.push_str(delta);
        }
        if let Some(map) = &result.metadata {
            for (k, v) in map {
                self.metadata.insert(k.clone(), v.clone());
            }
        }
        if let Some(envelope) = &chunk.metadata {
            self.envelope.accept(envelope);
        }
    }

    fn log(&self, outcome: StreamOutcome) -> AggregationLog {
        let usage = self.envelope.usage();
        let model = Some(self.envelope.model()).filter(|s| !s.is_empty());
        let id = Some(self.envelope.id()).filter(|s| !s.is_empty());
        AggregationLog::new()
            .outcome(outcome.as_str())
            .model_opt(model)
            .response_id_opt(id)
            .chunks(self.chunks)
            .text_len(self.text.len() as u64)
            .tokens(
                Some(usage.prompt_tokens()),
                Some(usage.completion_tokens()),
                usage.prompt_tokens().checked_add(usage.completion_tokens()),
            )
            .tokens_decreases(usage.decreases())
    }

    fn finish(self) -> AggregateMessage {
        let mut message = ChatMessage::assistant(self.text);
        message.metadata = self.metadata;
        AggregateMessage {
            message,
            metadata: self.envelope.build(),
        }
    }
}

/// Stream returned by [`ResponseAggregator::aggregate`]; yields the upstream items unchanged.
pub struct Aggregating<S> {
    upstream: S,
    context: Option<AccumulationContext>,
    on_complete: Option<CompletionCallback>,
    on_counter_decrease: CounterDecreasePolicy,
}

impl<S> Aggregating<S> {
    pub fn state(&self) -> AggregationState {
        if self.context.is_some() {
            AggregationState::Accumulating
        } else {
            AggregationState::Idle
        }
    }

    fn complete(&mut self) {
        let Some(ctx) = self.context.take() else {
            return;
        };
        let log = ctx.log(StreamOutcome::Completed);
        let decreases = ctx.envelope.usage().decreases();
        let aggregate = ctx.finish();

        let usage = aggregate.metadata.usage.clone().unwrap_or_default();
        let span = info_span!(
            "chatfold.aggregate",
            stream.outcome = StreamOutcome::Completed.as_str(),
            llm.model = %aggregate.metadata.model,
            llm.response_id = %aggregate.metadata.id,
            stream.chunks = log.chunks,
            stream.text_len = aggregate.message.content.len() as u64,
            tokens.prompt = usage.prompt_tokens.unwrap_or(0),
            tokens.completion = usage.completion_tokens.unwrap_or(0),
            tokens.total = usage.total_tokens(),
            tokens.decreases = decreases,
        );
        let _entered = span.enter();

        if decreases > 0 && self.on_counter_decrease == CounterDecreasePolicy::Warn {
            warn!(
                decreases,
                "provider reported decreasing token counts; keeping the maximum"
            );
        }
        telemetry::emit_aggregation(log);
        if let Some(callback) = self.on_complete.take() {
            callback(aggregate);
        }
        debug!("aggregation complete");
    }

    fn fail(&mut self, err: &ChatfoldError) {
        // Dropping the callback guarantees it can no longer fire for this stream.
        self.on_complete = None;
        let Some(ctx) = self.context.take() else {
            return;
        };
        error!(
            stream.outcome = StreamOutcome::Failed.as_str(),
            error.kind = err.kind(),
            error.message = %err,
            stream.chunks = ctx.chunks,
            "aggregation error"
        );
        telemetry::emit_aggregation(
            ctx.log(StreamOutcome::Failed).error(err.kind(), &err.to_string()),
        );
    }
}

impl<S> Stream for Aggregating<S>
where
    S: Stream<Item = CoreResult<ChatChunk>> + Unpin,
{
    type Item = CoreResult<ChatChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.upstream.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(ctx) = this.context.as_mut() {
                    ctx.apply(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.fail(&err);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.upstream.size_hint()
    }
}

impl<S> Drop for Aggregating<S> {
    fn drop(&mut self) {
        if let Some(ctx) = self.context.take() {
            debug!(
                stream.outcome = StreamOutcome::Cancelled.as_str(),
                stream.chunks = ctx.chunks,
                "aggregation cancelled before stream completed"
            );
            telemetry::emit_aggregation(ctx.log(StreamOutcome::Cancelled));
        }
    }
}
