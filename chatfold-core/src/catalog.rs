//! Known model families and the standard model table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChatfoldError, CoreResult};
use crate::provider::ChatOptions;

pub const GEMINI_OPENAI_COMPATIBLE_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";

/// Provider family a model belongs to. Decides how a client for it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    OpenAi,
    AzureOpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 5] = [
        Self::OpenAi,
        Self::AzureOpenAi,
        Self::Anthropic,
        Self::Gemini,
        Self::Ollama,
    ];

    /// Stable key used in config files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Self::OpenAi => "open_ai",
            Self::AzureOpenAi => "azure_open_ai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    /// Empty for Azure: every Azure resource has its own endpoint.
    pub fn default_endpoint_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::AzureOpenAi => "",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Gemini => GEMINI_OPENAI_COMPATIBLE_BASE_URL,
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// Third-party endpoints that speak this family's API.
    pub fn compatible_endpoint_urls(&self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &[
                "https://api.groq.com/openai",
                "https://api.mistral.ai",
                "https://openrouter.ai/api",
            ],
            _ => &[],
        }
    }

    pub fn api_keys_homepage(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://platform.openai.com/api-keys",
            Self::AzureOpenAi => "https://portal.azure.com/",
            Self::Anthropic => "https://console.anthropic.com/settings/keys",
            Self::Gemini => "https://aistudio.google.com/app/apikey",
            Self::Ollama => "",
        }
    }

    /// Families without a key homepage run locally and need no key.
    pub fn is_api_key_optional(&self) -> bool {
        self.api_keys_homepage().is_empty()
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelFamily {
    type Err = ChatfoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match norm.as_str() {
            "open_ai" | "openai" => Ok(Self::OpenAi),
            "azure_open_ai" | "azure_openai" | "azure" => Ok(Self::AzureOpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ChatfoldError::Validation(format!("unknown model family '{s}'"))),
        }
    }
}

/// o1/o3 reasoning models reject anything but the default sampling parameters.
const REASONING_OVERRIDE: ChatOptions = ChatOptions {
    temperature: Some(1.0),
    top_p: Some(1.0),
};

/// One entry of the standard model table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardModel {
    pub id: &'static str,
    pub family: ModelFamily,
    pub input_token_limit: u32,
    pub supports_streaming: bool,
    pub supports_system_message: bool,
    /// Options forced for this model regardless of user settings.
    pub options_override: Option<ChatOptions>,
}

const fn model(id: &'static str, family: ModelFamily, input_token_limit: u32) -> StandardModel {
    StandardModel {
        id,
        family,
        input_token_limit,
        supports_streaming: true,
        supports_system_message: true,
        options_override: None,
    }
}

const fn reasoning(id: &'static str, input_token_limit: u32) -> StandardModel {
    StandardModel {
        id,
        family: ModelFamily::OpenAi,
        input_token_limit,
        supports_streaming: false,
        supports_system_message: false,
        options_override: Some(REASONING_OVERRIDE),
    }
}

use ModelFamily::{Anthropic, Gemini, OpenAi};

static STANDARD_MODELS: &[StandardModel] = &[
    model("claude-3-7-sonnet-latest", Anthropic, 200_000),
    model("claude-3-7-sonnet-20250219", Anthropic, 200_000),
    model("claude-3-5-sonnet-latest", Anthropic, 200_000),
    model("claude-3-5-sonnet-20241022", Anthropic, 200_000),
    model("claude-3-5-sonnet-20240620", Anthropic, 200_000),
    model("claude-3-opus-20240229", Anthropic, 200_000),
    model("claude-3-sonnet-20240229", Anthropic, 200_000),
    model("claude-3-haiku-20240307", Anthropic, 200_000),
    model("gemini-1.5-pro-latest", Gemini, 2_097_152),
    model("gemini-1.5-flash-latest", Gemini, 1_048_576),
    model("gemini-2.0-flash", Gemini, 1_048_576),
    model("gpt-3.5-turbo", OpenAi, 16_385),
    model("gpt-3.5-turbo-0301", OpenAi, 4_096),
    model("gpt-3.5-turbo-0613", OpenAi, 4_096),
    model("gpt-3.5-turbo-16k", OpenAi, 16_384),
    model("gpt-3.5-turbo-16k-0613", OpenAi, 16_384),
    model("gpt-3.5-turbo-1106", OpenAi, 16_385),
    model("gpt-3.5-turbo-0125", OpenAi, 16_385),
    model("gpt-4o", OpenAi, 128_000),
    model("gpt-4o-mini", OpenAi, 128_000),
    model("gpt-4-turbo", OpenAi, 128_000),
    model("gpt-4", OpenAi, 8_192),
    model("gpt-4-turbo-preview", OpenAi, 128_000),
    model("gpt-4-0314", OpenAi, 8_192),
    model("gpt-4-0613", OpenAi, 8_192),
    model("gpt-4-32k", OpenAi, 32_768),
    model("gpt-4-32k-0314", OpenAi, 32_768),
    model("gpt-4-32k-0613", OpenAi, 32_768),
    model("gpt-4-1106-preview", OpenAi, 128_000),
    model("gpt-4-0125-preview", OpenAi, 128_000),
    reasoning("o3-mini", 200_000),
    reasoning("o3-mini-2025-01-31", 200_000),
    reasoning("o1", 200_000),
    reasoning("o1-2024-12-17", 200_000),
    reasoning("o1-mini", 128_000),
    reasoning("o1-mini-2024-09-12", 128_000),
    reasoning("o1-preview", 128_000),
    reasoning("o1-preview-2024-09-12", 128_000),
];

impl StandardModel {
    pub fn all() -> &'static [StandardModel] {
        STANDARD_MODELS
    }

    pub fn ids() -> impl Iterator<Item = &'static str> {
        STANDARD_MODELS.iter().map(|m| m.id)
    }

    pub fn find(id: &str) -> Option<&'static StandardModel> {
        STANDARD_MODELS.iter().find(|m| m.id == id)
    }

    pub fn of(id: &str) -> CoreResult<&'static StandardModel> {
        Self::find(id).ok_or_else(|| ChatfoldError::UnknownModel(id.to_string()))
    }

    pub fn in_family(family: ModelFamily) -> impl Iterator<Item = &'static StandardModel> {
        STANDARD_MODELS.iter().filter(move |m| m.family == family)
    }

    pub fn first_in_family(family: ModelFamily) -> Option<&'static StandardModel> {
        Self::in_family(family).next()
    }
}
