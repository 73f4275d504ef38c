use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::catalog::ModelFamily;
use crate::error::{ChatfoldError, CoreResult};
use crate::model::{ChatChunk, ChatRequest};
use crate::stream::{self, ChunkStream};

/// Sampling options passed to a provider client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct ChatOptions {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl ChatOptions {
    /// Fields set in `over` replace ours; unset fields keep ours.
    pub fn apply_override(self, over: Option<&ChatOptions>) -> Self {
        match over {
            Some(o) => Self {
                temperature: o.temperature.or(self.temperature),
                top_p: o.top_p.or(self.top_p),
            },
            None => self,
        }
    }
}

/// User-supplied settings for one model family.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Custom endpoint; `None` means the family default.
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    /// Azure only: deployment to route requests to.
    pub deployment: Option<String>,
    pub options: ChatOptions,
}

/// Everything a provider client constructor needs for one model.
#[derive(Debug, Clone)]
pub struct ClientParams {
    pub family: ModelFamily,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub deployment: Option<String>,
    pub options: ChatOptions,
}

impl ClientParams {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }
}

/// A source of streamed chat responses.
#[async_trait]
pub trait ChatStreamSource: Send + Sync {
    fn name(&self) -> &str;
    async fn stream(&self, req: ChatRequest) -> CoreResult<ChunkStream>;
}

/// Replays a fixed sequence of chunks for every request.
/// Useful for tests and for replaying recorded streams.
pub struct ScriptedSource {
    name: String,
    chunks: Vec<ChatChunk>,
    fail_with: Option<String>,
}

impl ScriptedSource {
    pub fn new(name: impl Into<String>, chunks: Vec<ChatChunk>) -> Self {
        Self {
            name: name.into(),
            chunks,
            fail_with: None,
        }
    }

    /// After the scripted chunks, end the stream with an upstream error instead of completing.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }
}

#[async_trait]
impl ChatStreamSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, req: ChatRequest) -> CoreResult<ChunkStream> {
        if req.messages.is_empty() {
            return Err(ChatfoldError::Validation("request has no messages".into()));
        }
        let mut items: Vec<CoreResult<ChatChunk>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.fail_with {
            items.push(Err(ChatfoldError::Upstream {
                provider: self.name.clone(),
                message: message.clone(),
            }));
        }
        Ok(stream::from_items(items))
    }
}
