//! Deterministic canned-response provider for tests and `--dry-run`.

use async_trait::async_trait;

use citelens_shared::{CiteLensError, Result};

use crate::{AnswerProvider, AskOptions, AskResponse};

/// A provider that answers every prompt with a fixed text (or a fixed
/// failure). No network, no cost.
pub struct StaticProvider {
    name: String,
    text: String,
    cost_rank: u32,
    failure: Option<String>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            cost_rank: 0,
            failure: None,
        }
    }

    pub fn with_rank(name: impl Into<String>, text: impl Into<String>, cost_rank: u32) -> Self {
        Self {
            cost_rank,
            ..Self::new(name, text)
        }
    }

    /// A provider whose every call fails with `reason`.
    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            cost_rank: 0,
            failure: Some(reason.into()),
        }
    }
}

#[async_trait]
impl AnswerProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_rank(&self) -> u32 {
        self.cost_rank
    }

    async fn ask(&self, _prompt: &str, _options: &AskOptions) -> Result<AskResponse> {
        if let Some(reason) = &self.failure {
            return Err(CiteLensError::provider(&self.name, reason.clone()));
        }
        Ok(AskResponse {
            text: self.text.clone(),
            model: "static".into(),
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: 0.0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_canned_text() {
        let provider = StaticProvider::new("canned", "Acme is the best CRM.");
        let response = provider
            .ask("anything", &AskOptions::default())
            .await
            .expect("ask");
        assert_eq!(response.text, "Acme is the best CRM.");
        assert_eq!(response.cost_usd, 0.0);
    }

    #[tokio::test]
    async fn failing_variant_always_errors() {
        let provider = StaticProvider::failing("down", "simulated outage");
        let err = provider
            .ask("anything", &AskOptions::default())
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("simulated outage"));
    }
}
