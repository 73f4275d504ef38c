use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::metadata::MetadataEnvelope;
use crate::provider::ChatOptions;

/// Marker prepended to a message whose head was cut off.
const ELLIPSIS: &str = "[...]";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Same message with `content` swapped in; role and metadata are kept.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            role: self.role,
            content: content.into(),
            metadata: self.metadata.clone(),
        }
    }

    /// Keep the content from char `from` onwards, prefixed with `"[...] "`.
    pub fn tail_from(&self, from: usize) -> Self {
        let tail: String = self.content.chars().skip(from).collect();
        self.with_content(format!("{ELLIPSIS} {tail}"))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: ChatOptions,
}

/// One generated increment: an optional text delta plus optional
/// generation-local metadata (finish reason, index, ...).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Generation {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Generation {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            text: Some(delta.into()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// A single streamed unit of a chat response.
///
/// A chunk without `result` carries nothing the aggregator uses, its
/// envelope included.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ChatChunk {
    #[serde(default)]
    pub result: Option<Generation>,
    #[serde(default)]
    pub metadata: Option<MetadataEnvelope>,
}

impl ChatChunk {
    pub fn new(result: Generation) -> Self {
        Self {
            result: Some(result),
            metadata: None,
        }
    }

    /// Shorthand for a chunk carrying only a text delta.
    pub fn delta(text: impl Into<String>) -> Self {
        Self::new(Generation::text(text))
    }

    pub fn with_envelope(mut self, envelope: MetadataEnvelope) -> Self {
        self.metadata = Some(envelope);
        self
    }

    pub fn as_text_delta(&self) -> Option<&str> {
        self.result.as_ref().and_then(|g| g.text.as_deref())
    }
}

/// The single message synthesized from every chunk of a completed stream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregateMessage {
    pub message: ChatMessage,
    pub metadata: MetadataEnvelope,
}

impl AggregateMessage {
    pub fn text(&self) -> &str {
        &self.message.content
    }
}
