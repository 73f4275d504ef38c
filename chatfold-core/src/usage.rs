//! Token usage accounting for streamed responses.
//!
//! Providers that stream usage tend to resend cumulative-to-date totals with
//! every chunk, some send a single total at the end, and some send partial
//! records where one of the counters is missing. [`UsageAggregator`] folds all
//! of these into one value with a per-counter "max so far" rule.

use serde::{Deserialize, Serialize};

/// Token counts reported by a provider for one response (or one chunk of it).
///
/// A `None` counter means the provider said nothing about it, which is not the
/// same as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    /// Provider-specific payload, carried through untouched. Never merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_usage: Option<serde_json::Value>,
}

impl Usage {
    pub fn new(prompt_tokens: Option<u32>, completion_tokens: Option<u32>) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            native_usage: None,
        }
    }

    /// Sum of the counters that are present.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens
            .unwrap_or(0)
            .saturating_add(self.completion_tokens.unwrap_or(0))
    }
}

/// Running usage total for one stream.
#[derive(Debug, Clone, Default)]
pub struct UsageAggregator {
    prompt_tokens: u32,
    completion_tokens: u32,
    decreases: u32,
}

impl UsageAggregator {
    /// Starts at zero prompt and zero completion tokens.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt_tokens(&self) -> u32 {
        self.prompt_tokens
    }

    pub fn completion_tokens(&self) -> u32 {
        self.completion_tokens
    }

    /// Number of incoming counters seen so far that were lower than the running value.
    pub fn decreases(&self) -> u32 {
        self.decreases
    }

    /// Merge `usage` into the running total.
    ///
    /// Each present counter becomes `max(current, incoming)`; absent counters
    /// and an absent `usage` leave the total unchanged.
    pub fn accept(&mut self, usage: Option<&Usage>) {
        let Some(usage) = usage else {
            return;
        };
        self.prompt_tokens = self.max_or_current(self.prompt_tokens, usage.prompt_tokens);
        self.completion_tokens =
            self.max_or_current(self.completion_tokens, usage.completion_tokens);
    }

    fn max_or_current(&mut self, current: u32, incoming: Option<u32>) -> u32 {
        match incoming {
            Some(n) if n < current => {
                self.decreases += 1;
                current
            }
            Some(n) => n,
            None => current,
        }
    }

    /// Immutable copy of the current counters. `native_usage` is always `None`.
    pub fn to_snapshot(&self) -> Usage {
        Usage::new(Some(self.prompt_tokens), Some(self.completion_tokens))
    }
}
