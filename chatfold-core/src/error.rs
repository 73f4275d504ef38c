use thiserror::Error;

use crate::catalog::ModelFamily;

/// Core error type for chatfold.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum ChatfoldError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("model `{0}` not found")]
    UnknownModel(String),

    #[error("api key required for {family}")]
    MissingApiKey { family: ModelFamily },

    #[error("upstream error from {provider}: {message}")]
    Upstream { provider: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatfoldError {
    /// Short, stable name of the variant; used as the `error.kind` telemetry attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownModel(_) => "unknown_model",
            Self::MissingApiKey { .. } => "missing_api_key",
            Self::Upstream { .. } => "upstream",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, ChatfoldError>;
