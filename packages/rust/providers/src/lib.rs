//! Answer-engine provider contract and implementations.
//!
//! Every provider exposes the uniform `ask(prompt, options) → AskResponse`
//! contract; the rest of the system is agnostic to how many providers exist
//! or what they are. Ships:
//! - [`ChatCompletionProvider`] — OpenAI-compatible chat-completions over HTTP
//! - [`StaticProvider`] — deterministic canned responses for tests/dry runs
//! - [`ProviderRegistry`] — enabled-provider enumeration, cheapest-first pick
//! - [`ProbeGate`] — the cost/volume budget consulted before each call
//! - prompt templates per probe category

mod gate;
mod http;
mod prompts;
mod statics;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use citelens_shared::{AppConfig, Result};

pub use gate::{CostBudget, GateDecision, OpenGate, ProbeGate};
pub use http::ChatCompletionProvider;
pub use prompts::prompt_for;
pub use statics::StaticProvider;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Options forwarded with one `ask` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
            system_prompt: None,
        }
    }
}

/// Uniform response shape from any answer-engine provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
}

/// The uniform answer-service contract.
///
/// Timeout policy lives inside implementations (the HTTP client carries a
/// request timeout); callers treat a timeout as an ordinary failure.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Provider name used in events, analytics, and logs.
    fn name(&self) -> &str;

    /// Cost preference order; lower is cheaper.
    fn cost_rank(&self) -> u32;

    /// Send one prompt and return the generated answer.
    async fn ask(&self, prompt: &str, options: &AskOptions) -> Result<AskResponse>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds the configured providers; probes consult `enabled()` and citation
/// validation picks `cheapest(n)`.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AnswerProvider>>,
}

impl ProviderRegistry {
    /// Build a registry from explicit provider instances.
    pub fn new(providers: Vec<Arc<dyn AnswerProvider>>) -> Self {
        Self { providers }
    }

    /// Build HTTP providers for every enabled `[[providers]]` config entry.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut providers: Vec<Arc<dyn AnswerProvider>> = Vec::new();
        for entry in config.providers.iter().filter(|p| p.enabled) {
            providers.push(Arc::new(ChatCompletionProvider::new(entry)?));
        }
        Ok(Self { providers })
    }

    /// All enabled providers, in configuration order.
    pub fn enabled(&self) -> Vec<Arc<dyn AnswerProvider>> {
        self.providers.clone()
    }

    /// Up to `n` providers, cheapest first (cost rank ascending, name as the
    /// deterministic tiebreak).
    pub fn cheapest(&self, n: usize) -> Vec<Arc<dyn AnswerProvider>> {
        let mut sorted = self.providers.clone();
        sorted.sort_by(|a, b| {
            a.cost_rank()
                .cmp(&b.cost_rank())
                .then_with(|| a.name().cmp(b.name()))
        });
        sorted.truncate(n);
        sorted
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cheapest_orders_by_rank_then_name() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(StaticProvider::with_rank("zeta", "", 1)),
            Arc::new(StaticProvider::with_rank("alpha", "", 2)),
            Arc::new(StaticProvider::with_rank("beta", "", 1)),
        ]);

        let picked = registry.cheapest(2);
        let names: Vec<&str> = picked.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["beta", "zeta"]);
    }

    #[test]
    fn cheapest_handles_small_registries() {
        let registry = ProviderRegistry::new(vec![Arc::new(StaticProvider::new("only", ""))]);
        assert_eq!(registry.cheapest(3).len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
    }
}
