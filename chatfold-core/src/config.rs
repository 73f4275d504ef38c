use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use secrecy::SecretString;

use crate::catalog::ModelFamily;
use crate::error::{ChatfoldError, CoreResult};
use crate::provider::{ChatOptions, ProviderSettings};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProviderCfg {
    /// Custom endpoint; omitted means the family default.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable that contains the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    /// Regex applied to the model name, e.g. ^gpt-.*
    pub model: String,
    /// Family to route to when this rule matches
    pub family: ModelFamily,
}

fn default_family() -> ModelFamily {
    ModelFamily::OpenAi
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoutingCfg {
    #[serde(default = "default_family")]
    pub default_family: ModelFamily,
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl Default for RoutingCfg {
    fn default() -> Self {
        Self {
            default_family: default_family(),
            rules: Vec::new(),
        }
    }
}

/// What to do when a usage counter reported later in a stream is lower than one reported earlier.
/// The merged value is the maximum either way.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CounterDecreasePolicy {
    #[default]
    Ignore,
    Warn,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AggregationCfg {
    #[serde(default)]
    pub on_counter_decrease: CounterDecreasePolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingCfg,
    /// Keyed by family key (`open_ai`, `anthropic`, ...).
    #[serde(default)]
    pub providers: HashMap<String, ProviderCfg>,
    #[serde(default)]
    pub aggregation: AggregationCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(ChatfoldError::from)?;
        let s = std::str::from_utf8(&bytes).map_err(|e| ChatfoldError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str::<Self>(s).map_err(|e| ChatfoldError::Other(e.into()))?
            }
            Some("toml") => toml::from_str::<Self>(s).map_err(|e| ChatfoldError::Other(e.into()))?,
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| ChatfoldError::Other(e.into()))
                .or_else(|_| toml::from_str::<Self>(s).map_err(|e| ChatfoldError::Other(e.into())))?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every provider key must name a known family, and each family at most once
    /// (`openai` and `open_ai` are the same family).
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        for key in self.providers.keys() {
            let family = key.parse::<ModelFamily>()?;
            if !seen.insert(family) {
                return Err(ChatfoldError::Validation(format!(
                    "duplicate provider entry for '{family}'"
                )));
            }
        }
        Ok(())
    }

    /// The entry for `family`; the canonical key wins over other spellings.
    pub fn provider(&self, family: ModelFamily) -> Option<&ProviderCfg> {
        self.providers.get(family.key()).or_else(|| {
            self.providers
                .iter()
                .find(|(k, _)| k.parse::<ModelFamily>().ok() == Some(family))
                .map(|(_, v)| v)
        })
    }

    /// Settings for `family`, reading the API key from the process environment.
    pub fn settings_for(&self, family: ModelFamily) -> ProviderSettings {
        self.settings_with_env(family, |name| std::env::var(name).ok())
    }

    /// Like `settings_for`, with an explicit environment lookup.
    pub fn settings_with_env<F>(&self, family: ModelFamily, env: F) -> ProviderSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(p) = self.provider(family) else {
            return ProviderSettings::default();
        };
        let api_key = p
            .api_key_env
            .as_deref()
            .and_then(|name| env(name))
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::new(k.into()));
        ProviderSettings {
            endpoint: p.endpoint.clone(),
            api_key,
            deployment: p.deployment.clone(),
            options: ChatOptions {
                temperature: p.temperature,
                top_p: p.top_p,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_from_json() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("chatfold.json");
        let json = r#"{
          "providers": {
            "open_ai": {"api_key_env":"OPENAI_API_KEY", "temperature": 0.2},
            "anthropic": {"api_key_env":"ANTHROPIC_API_KEY"}
          },
          "routing": {
            "default_family": "anthropic",
            "rules": [
              {"model":"^gpt-.*","family":"open_ai"},
              {"model":"^llama.*","family":"ollama"}
            ]
          },
          "aggregation": {"on_counter_decrease": "warn"}
        }"#;
        fs::write(&file, json).unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.routing.default_family, ModelFamily::Anthropic);
        assert_eq!(cfg.routing.rules.len(), 2);
        assert_eq!(cfg.routing.rules[1].family, ModelFamily::Ollama);
        assert_eq!(cfg.aggregation.on_counter_decrease, CounterDecreasePolicy::Warn);
        assert_eq!(cfg.provider(ModelFamily::OpenAi).unwrap().temperature, Some(0.2));
    }

    #[test]
    fn empty_object_uses_defaults() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.json");
        fs::write(&file, "{}").unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.routing.default_family, ModelFamily::OpenAi);
        assert_eq!(cfg.aggregation.on_counter_decrease, CounterDecreasePolicy::Ignore);
    }

    #[test]
    fn missing_file_returns_io_error() {
        let missing = std::path::PathBuf::from("/definitely/not/here/chatfold-missing.json");
        let err = Config::from_path(&missing).unwrap_err();
        match err {
            ChatfoldError::Io(_) => {}
            other => panic!("expected Io error, got: {:?}", other),
        }
    }

    #[test]
    fn bad_utf8_returns_other_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.bin");
        fs::write(&file, vec![0xff, 0xfe, 0xfd, 0x00, 0x80]).unwrap();
        let err = Config::from_path(&file).unwrap_err();
        match err {
            ChatfoldError::Other(_) => {}
            other => panic!("expected Other(utf8) error, got: {:?}", other),
        }
    }

    #[test]
    fn bad_json_returns_other_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.json");
        let json = r#"{ "providers": { "open_ai": { "api_key_env": 123 } }"#;
        fs::write(&file, json).unwrap();
        let err = Config::from_path(&file).unwrap_err();
        match err {
            ChatfoldError::Other(_) => {}
            other => panic!("expected Other(json parse) error, got: {:?}", other),
        }
    }

    #[test]
    fn unknown_provider_key_is_validation_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("typo.json");
        fs::write(&file, r#"{"providers": {"opena": {}}}"#).unwrap();
        let err = Config::from_path(&file).unwrap_err();
        match err {
            ChatfoldError::Validation(msg) => assert!(msg.contains("opena")),
            other => panic!("expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn duplicate_family_spellings_are_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("dupe.json");
        fs::write(&file, r#"{"providers":{"openai":{},"open_ai":{}}}"#).unwrap();
        let err = Config::from_path(&file).unwrap_err();
        match err {
            ChatfoldError::Validation(msg) => {
                assert!(msg.contains("duplicate provider entry for 'open_ai'"), "{msg}")
            }
            other => panic!("expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn canonical_key_is_preferred_when_built_in_code() {
        let mut cfg = Config::default();
        for (key, endpoint) in [("openai", "https://a.example"), ("open_ai", "https://b.example")] {
            cfg.providers.insert(
                key.into(),
                ProviderCfg { endpoint: Some(endpoint.into()), ..Default::default() },
            );
        }
        assert!(cfg.validate().is_err());
        for _ in 0..16 {
            let picked = cfg.clone().provider(ModelFamily::OpenAi).and_then(|p| p.endpoint.clone());
            assert_eq!(picked.as_deref(), Some("https://b.example"));
        }
    }

    #[test]
    fn load_from_toml() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("chatfold.toml");
        let toml = r#"
[providers.azure_open_ai]
endpoint = "https://my-resource.openai.azure.com"
api_key_env = "AZURE_OPENAI_KEY"
deployment = "gpt4o-prod"

[routing]
default_family = "azure_open_ai"
[[routing.rules]]
model = "^claude-.*"
family = "anthropic"
"#;
        fs::write(&file, toml).unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.routing.default_family, ModelFamily::AzureOpenAi);
        let azure = cfg.provider(ModelFamily::AzureOpenAi).unwrap();
        assert_eq!(azure.deployment.as_deref(), Some("gpt4o-prod"));
        assert_eq!(cfg.aggregation, AggregationCfg::default());
    }

    #[test]
    fn unknown_extension_falls_back_to_json_then_toml() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("chatfold.conf");
        fs::write(&json_path, r#"{"routing":{"default_family":"gemini","rules":[]}}"#).unwrap();
        let cfg = Config::from_path(&json_path).unwrap();
        assert_eq!(cfg.routing.default_family, ModelFamily::Gemini);

        let toml_path = dir.path().join("chatfold2.conf");
        let toml = r#"
[routing]
default_family = "ollama"
rules = []

[aggregation]
on_counter_decrease = "warn"
"#;
        fs::write(&toml_path, toml).unwrap();
        let cfg = Config::from_path(&toml_path).unwrap();
        assert_eq!(cfg.routing.default_family, ModelFamily::Ollama);
        assert_eq!(cfg.aggregation.on_counter_decrease, CounterDecreasePolicy::Warn);
    }

    #[test]
    fn settings_resolve_key_from_env() {
        let mut cfg = Config::default();
        cfg.providers.insert(
            "open_ai".into(),
            ProviderCfg {
                endpoint: Some("https://openrouter.ai/api".into()),
                api_key_env: Some("CHATFOLD_TEST_KEY".into()),
                top_p: Some(0.8),
                ..Default::default()
            },
        );
        let env = |name: &str| (name == "CHATFOLD_TEST_KEY").then(|| "sk-live".to_string());

        let s = cfg.settings_with_env(ModelFamily::OpenAi, env);
        assert_eq!(s.endpoint.as_deref(), Some("https://openrouter.ai/api"));
        assert_eq!(s.api_key.as_ref().map(|k| k.expose_secret().to_string()), Some("sk-live".into()));
        assert_eq!(s.options, ChatOptions { temperature: None, top_p: Some(0.8) });

        let none = cfg.settings_with_env(ModelFamily::Anthropic, env);
        assert!(none.api_key.is_none());
        assert!(none.endpoint.is_none());

        let unset = cfg.settings_with_env(ModelFamily::OpenAi, |_| None);
        assert!(unset.api_key.is_none());
    }
}
