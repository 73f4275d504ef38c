use regex::Regex;

use crate::catalog::{ModelFamily, StandardModel};
use crate::config::{Config, RoutingRule};
use crate::error::{ChatfoldError, CoreResult};

/// Compiled routing rule
#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    family: ModelFamily,
}

/// Resolves a model id to the family whose client should serve it.
///
/// Catalog models resolve to their own family; anything else goes through
/// the configured rules in order, then the default family.
#[derive(Debug)]
pub struct ModelResolver {
    rules: Vec<CompiledRule>,
    default_family: ModelFamily,
}

impl ModelResolver {
    /// Build a resolver by compiling regexes from config.
    pub fn new(cfg: &Config) -> CoreResult<Self> {
        let mut rules = Vec::new();
        for RoutingRule { model, family } in &cfg.routing.rules {
            let regex = Regex::new(model).map_err(|e| {
                ChatfoldError::Validation(format!("invalid routing regex '{model}': {e}"))
            })?;
            rules.push(CompiledRule {
                regex,
                family: *family,
            });
        }
        Ok(Self {
            rules,
            default_family: cfg.routing.default_family,
        })
    }

    pub fn resolve(&self, model: &str) -> ModelFamily {
        if let Some(m) = StandardModel::find(model) {
            return m.family;
        }
        self.rules
            .iter()
            .find(|r| r.regex.is_match(model))
            .map(|r| r.family)
            .unwrap_or(self.default_family)
    }
}
