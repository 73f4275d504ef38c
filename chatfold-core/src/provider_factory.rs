use std::collections::HashMap;

use crate::catalog::{GEMINI_OPENAI_COMPATIBLE_BASE_URL, ModelFamily, StandardModel};
use crate::error::{ChatfoldError, CoreResult};
use crate::provider::{ClientParams, ProviderSettings};

/// Builds client parameters for one family from user settings and a model id.
pub type ClientFactory = fn(&ProviderSettings, &str) -> CoreResult<ClientParams>;

/// Gemini's bare host; only its OpenAI-compatible path accepts chat completion requests.
const GEMINI_BARE_HOST: &str = "https://generativelanguage.googleapis.com";

/// Registry of client factories by model family.
pub struct ProviderRegistry {
    factories: HashMap<ModelFamily, ClientFactory>,
}

impl ProviderRegistry {
    /// An empty registry; use `register` to add families.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with a factory for every known family.
    pub fn standard() -> Self {
        let mut reg = Self::empty();
        reg.register(ModelFamily::OpenAi, open_ai);
        reg.register(ModelFamily::AzureOpenAi, azure_open_ai);
        reg.register(ModelFamily::Anthropic, anthropic);
        reg.register(ModelFamily::Gemini, gemini);
        reg.register(ModelFamily::Ollama, ollama);
        reg
    }

    /// Register (or replace) the factory for `family`.
    pub fn register(&mut self, family: ModelFamily, factory: ClientFactory) {
        self.factories.insert(family, factory);
    }

    pub fn contains(&self, family: ModelFamily) -> bool {
        self.factories.contains_key(&family)
    }

    /// Build client parameters for `model` in `family`.
    pub fn client_params(
        &self,
        family: ModelFamily,
        settings: &ProviderSettings,
        model: &str,
    ) -> CoreResult<ClientParams> {
        let factory = self.factories.get(&family).ok_or_else(|| {
            ChatfoldError::Validation(format!("no client factory registered for '{family}'"))
        })?;
        factory(settings, model)
    }
}

fn endpoint_or_default(settings: &ProviderSettings, family: ModelFamily) -> String {
    settings
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(family.default_endpoint_url())
        .to_string()
}

fn base_params(family: ModelFamily, settings: &ProviderSettings, model: &str) -> CoreResult<ClientParams> {
    let params = ClientParams {
        family,
        model: model.to_string(),
        base_url: endpoint_or_default(settings, family),
        api_key: settings.api_key.clone(),
        deployment: None,
        options: settings
            .options
            .apply_override(StandardModel::find(model).and_then(|m| m.options_override.as_ref())),
    };
    if !family.is_api_key_optional() && !params.has_api_key() {
        return Err(ChatfoldError::MissingApiKey { family });
    }
    Ok(params)
}

fn open_ai(settings: &ProviderSettings, model: &str) -> CoreResult<ClientParams> {
    base_params(ModelFamily::OpenAi, settings, model)
}

fn azure_open_ai(settings: &ProviderSettings, model: &str) -> CoreResult<ClientParams> {
    let mut params = base_params(ModelFamily::AzureOpenAi, settings, model)?;
    if params.base_url.is_empty() {
        return Err(ChatfoldError::Validation(
            "azure_open_ai requires an endpoint".to_string(),
        ));
    }
    let deployment = settings
        .deployment
        .clone()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| {
            ChatfoldError::Validation("azure_open_ai requires a deployment name".to_string())
        })?;
    params.deployment = Some(deployment);
    Ok(params)
}

fn anthropic(settings: &ProviderSettings, model: &str) -> CoreResult<ClientParams> {
    base_params(ModelFamily::Anthropic, settings, model)
}

fn gemini(settings: &ProviderSettings, model: &str) -> CoreResult<ClientParams> {
    let mut params = base_params(ModelFamily::Gemini, settings, model)?;
    if params.base_url.trim_end_matches('/') == GEMINI_BARE_HOST {
        params.base_url = GEMINI_OPENAI_COMPATIBLE_BASE_URL.to_string();
    }
    Ok(params)
}

fn ollama(settings: &ProviderSettings, model: &str) -> CoreResult<ClientParams> {
    base_params(ModelFamily::Ollama, settings, model)
}
