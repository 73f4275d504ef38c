//! Response-level metadata and the builder that merges it across chunks.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::usage::{Usage, UsageAggregator};

/// Rate limit information a provider attached to a response.
///
/// `RateLimit::default()` (every field `None`) stands for "no rate limit
/// information"; see [`RateLimit::is_empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default)]
    pub requests_limit: Option<u64>,
    #[serde(default)]
    pub requests_remaining: Option<u64>,
    #[serde(default)]
    pub requests_reset: Option<Duration>,
    #[serde(default)]
    pub tokens_limit: Option<u64>,
    #[serde(default)]
    pub tokens_remaining: Option<u64>,
    #[serde(default)]
    pub tokens_reset: Option<Duration>,
}

impl RateLimit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-prompt metadata, e.g. content filter verdicts for each prompt in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptFilterMetadata {
    pub prompt_index: u32,
    #[serde(default)]
    pub content_filter: serde_json::Value,
}

pub type PromptMetadata = Vec<PromptFilterMetadata>;

/// Non-text metadata accompanying a response: id, model, rate limit, usage,
/// prompt metadata and free-form entries.
///
/// Empty `id` / `model` strings mean "absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataEnvelope {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub rate_limit: RateLimit,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub prompt_metadata: PromptMetadata,
    #[serde(default)]
    pub entries: HashMap<String, serde_json::Value>,
}

impl MetadataEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_prompt_metadata(mut self, prompt_metadata: PromptMetadata) -> Self {
        self.prompt_metadata = prompt_metadata;
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }
}

/// Folds the envelopes of one stream's chunks into a single envelope.
#[derive(Debug, Default)]
pub struct MetadataEnvelopeBuilder {
    id: String,
    model: String,
    rate_limit: RateLimit,
    prompt_metadata: PromptMetadata,
    entries: HashMap<String, serde_json::Value>,
    usage: UsageAggregator,
}

impl MetadataEnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, envelope: &MetadataEnvelope) {
        for (k, v) in &envelope.entries {
            self.entries.insert(k.clone(), v.clone());
        }
        // Later chunks may refresh id/model, but never blank them.
        if !envelope.id.is_empty() {
            self.id.clone_from(&envelope.id);
        }
        if !envelope.model.is_empty() {
            self.model.clone_from(&envelope.model);
        }
        self.usage.accept(envelope.usage.as_ref());
        if !envelope.prompt_metadata.is_empty() {
            self.prompt_metadata.clone_from(&envelope.prompt_metadata);
        }
        if !envelope.rate_limit.is_empty() {
            self.rate_limit.clone_from(&envelope.rate_limit);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Usage merged so far.
    pub fn usage(&self) -> &UsageAggregator {
        &self.usage
    }

    /// Materialize the merged envelope. The builder is left as is.
    pub fn build(&self) -> MetadataEnvelope {
        MetadataEnvelope {
            id: self.id.clone(),
            model: self.model.clone(),
            rate_limit: self.rate_limit.clone(),
            usage: Some(self.usage.to_snapshot()),
            prompt_metadata: self.prompt_metadata.clone(),
            entries: self.entries.clone(),
        }
    }
}
