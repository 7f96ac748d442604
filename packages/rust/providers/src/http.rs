//! OpenAI-compatible chat-completions provider over HTTP.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use citelens_shared::{CiteLensError, ProviderConfig, Result};

use crate::{AnswerProvider, AskOptions, AskResponse};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("CiteLens/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout. Timeouts surface as ordinary provider failures.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One answer-engine backend speaking the OpenAI chat-completions protocol.
pub struct ChatCompletionProvider {
    name: String,
    base_url: String,
    model: String,
    api_key_env: String,
    cost_rank: u32,
    cost_per_1k_input: f64,
    cost_per_1k_output: f64,
    client: Client,
}

impl ChatCompletionProvider {
    /// Build a provider from its config entry.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CiteLensError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            cost_rank: config.cost_rank,
            cost_per_1k_input: config.cost_per_1k_input,
            cost_per_1k_output: config.cost_per_1k_output,
            client,
        })
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            CiteLensError::provider(
                &self.name,
                format!("API key env var {} is not set", self.api_key_env),
            )
        })
    }

    fn cost_for(&self, tokens_in: u64, tokens_out: u64) -> f64 {
        (tokens_in as f64 / 1000.0) * self.cost_per_1k_input
            + (tokens_out as f64 / 1000.0) * self.cost_per_1k_output
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl AnswerProvider for ChatCompletionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_rank(&self) -> u32 {
        self.cost_rank
    }

    #[instrument(skip_all, fields(provider = %self.name, model = %self.model))]
    async fn ask(&self, prompt: &str, options: &AskOptions) -> Result<AskResponse> {
        let api_key = self.api_key()?;
        let started = Instant::now();

        let mut messages = Vec::new();
        if let Some(system) = &options.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CiteLensError::provider(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CiteLensError::provider(
                &self.name,
                format!("HTTP {status}: {}", detail.chars().take(200).collect::<String>()),
            ));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CiteLensError::provider(&self.name, format!("bad payload: {e}")))?;

        let text = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| CiteLensError::provider(&self.name, "response has no choices"))?;

        let usage = parsed.usage.unwrap_or_default();
        let latency_ms = started.elapsed().as_millis() as u64;

        debug!(
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            latency_ms,
            "provider answered"
        );

        Ok(AskResponse {
            text,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            cost_usd: self.cost_for(usage.prompt_tokens, usage.completion_tokens),
            latency_ms,
        })
    }
}
