/// Span/Log attribute keys for stream aggregation.
/// Keep these stable; changing them is a breaking change for dashboards.
pub const KEY_MODEL: &str = "llm.model";
pub const KEY_RESPONSE_ID: &str = "llm.response_id";

pub const KEY_OUTCOME: &str = "stream.outcome";
pub const KEY_CHUNKS: &str = "stream.chunks";
pub const KEY_TEXT_LEN: &str = "stream.text_len";
pub const KEY_TOKENS_PROMPT: &str = "tokens.prompt";
pub const KEY_TOKENS_COMPLETION: &str = "tokens.completion";
pub const KEY_TOKENS_TOTAL: &str = "tokens.total";
pub const KEY_TOKENS_DECREASES: &str = "tokens.decreases";

/// Error-related (if applicable)
pub const KEY_ERROR_KIND: &str = "error.kind";
pub const KEY_ERROR_MESSAGE: &str = "error.message";
