use serde::Serialize;

/// Structured record of how one aggregated stream ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationLog {
    /// "completed", "failed" or "cancelled".
    pub outcome: Option<String>,
    pub model: Option<String>,
    pub response_id: Option<String>,

    /// Chunks applied before the stream ended (chunks without a result are not counted).
    pub chunks: u64,
    pub text_len: Option<u64>,

    pub tokens_prompt: Option<u32>,
    pub tokens_completion: Option<u32>,
    pub tokens_total: Option<u32>,
    pub tokens_decreases: Option<u32>,

    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl AggregationLog {
    pub fn new() -> Self { Self::default() }
    pub fn outcome(mut self, v: &str) -> Self { self.outcome = Some(v.to_string()); self }
    pub fn model_opt(mut self, v: Option<&str>) -> Self { self.model = v.map(|s| s.to_string()); self }
    pub fn response_id_opt(mut self, v: Option<&str>) -> Self { self.response_id = v.map(|s| s.to_string()); self }
    pub fn chunks(mut self, v: u64) -> Self { self.chunks = v; self }
    pub fn text_len(mut self, v: u64) -> Self { self.text_len = Some(v); self }
    pub fn tokens(mut self, p: Option<u32>, c: Option<u32>, t: Option<u32>) -> Self {
        self.tokens_prompt = p; self.tokens_completion = c; self.tokens_total = t; self
    }
    pub fn tokens_decreases(mut self, v: u32) -> Self { self.tokens_decreases = Some(v); self }
    pub fn error(mut self, kind: &str, message: &str) -> Self {
        self.error_kind = Some(kind.to_string());
        self.error_message = Some(message.to_string());
        self
    }
}
