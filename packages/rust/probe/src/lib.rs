//! Probe orchestrator: concurrent provider fan-out with isolated failures.
//!
//! One probe sends one query to every enabled provider concurrently, runs
//! citation detection over each response, and collects per-provider results.
//! A provider failure (or a budget veto) never cancels sibling calls; it is
//! recorded in the batch's failure accounting instead.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use citelens_detection::analyze_response;
use citelens_providers::{
    AnswerProvider, AskOptions, GateDecision, OpenGate, ProbeGate, ProviderRegistry, prompt_for,
};
use citelens_shared::{
    CiteLensError, EntitySpec, ProbeCategory, ProbeResult, ProviderFailure, Result,
};

/// Default concurrent provider calls per batch.
const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome of one probe across a provider set: per-provider results plus an
/// explicit accounting of providers that produced no data.
#[derive(Debug, Clone, Default)]
pub struct ProbeBatch {
    pub results: Vec<ProbeResult>,
    pub failures: Vec<ProviderFailure>,
}

impl ProbeBatch {
    /// Providers that returned a response in this batch.
    pub fn providers(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.provider.as_str()).collect()
    }
}

/// Fans one query out to N providers and applies citation detection to each
/// response.
pub struct ProbeOrchestrator {
    registry: ProviderRegistry,
    gate: Arc<dyn ProbeGate>,
    options: AskOptions,
    concurrency: usize,
}

impl ProbeOrchestrator {
    /// Create an orchestrator with an open gate and default options.
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            gate: Arc::new(OpenGate),
            options: AskOptions::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Install a budget gate consulted before each provider call.
    pub fn with_gate(mut self, gate: Arc<dyn ProbeGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Override ask options for all provider calls.
    pub fn with_options(mut self, options: AskOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the per-batch concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Providers available to this orchestrator.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Probe every enabled provider with one query.
    ///
    /// Errors only when no providers are enabled; individual provider
    /// failures land in the batch's failure list.
    #[instrument(skip_all, fields(query = %query, category = %category))]
    pub async fn probe(
        &self,
        query: &str,
        category: ProbeCategory,
        brand: &EntitySpec,
        competitors: &[EntitySpec],
    ) -> Result<ProbeBatch> {
        let providers = self.registry.enabled();
        if providers.is_empty() {
            return Err(CiteLensError::NoProvidersEnabled);
        }
        Ok(self
            .probe_with(&providers, query, category, brand, competitors)
            .await)
    }

    /// Probe a caller-selected provider subset (citation validation's
    /// cheapest-first pick uses this).
    pub async fn probe_with(
        &self,
        providers: &[Arc<dyn AnswerProvider>],
        query: &str,
        category: ProbeCategory,
        brand: &EntitySpec,
        competitors: &[EntitySpec],
    ) -> ProbeBatch {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let prompt = Arc::new(prompt_for(category, query));
        let brand = Arc::new(brand.clone());
        let competitors: Arc<Vec<EntitySpec>> = Arc::new(competitors.to_vec());
        let options = Arc::new(self.options.clone());
        let query: Arc<str> = Arc::from(query);

        let mut handles = Vec::with_capacity(providers.len());
        for provider in providers {
            let provider = provider.clone();
            let gate = self.gate.clone();
            let sem = semaphore.clone();
            let prompt = prompt.clone();
            let brand = brand.clone();
            let competitors = competitors.clone();
            let options = options.clone();
            let query = query.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                let name = provider.name().to_string();

                if let GateDecision::Veto(reason) = gate.admit(&name) {
                    return Err(ProviderFailure {
                        provider: name,
                        query: query.to_string(),
                        reason,
                    });
                }

                match provider.ask(&prompt, &options).await {
                    Ok(response) => {
                        gate.record_cost(&name, response.cost_usd);
                        let analysis = analyze_response(&response.text, &brand, &competitors);
                        Ok(ProbeResult {
                            query: query.to_string(),
                            category,
                            provider: name,
                            response_text: response.text,
                            model: response.model,
                            cost_usd: response.cost_usd,
                            latency_ms: response.latency_ms,
                            brand: analysis.brand,
                            competitors: analysis.competitors,
                        })
                    }
                    Err(e) => Err(ProviderFailure {
                        provider: name,
                        query: query.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }));
        }

        let mut batch = ProbeBatch::default();
        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => batch.results.push(result),
                Ok(Err(failure)) => {
                    warn!(
                        provider = %failure.provider,
                        reason = %failure.reason,
                        "provider produced no result"
                    );
                    batch.failures.push(failure);
                }
                Err(e) => {
                    warn!(error = %e, "probe task panicked");
                    batch.failures.push(ProviderFailure {
                        provider: "unknown".into(),
                        query: query.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            results = batch.results.len(),
            failures = batch.failures.len(),
            "probe complete"
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citelens_providers::{CostBudget, StaticProvider};

    fn brand() -> EntitySpec {
        EntitySpec::with_domain("Acme", "acme.example")
    }

    fn competitors() -> Vec<EntitySpec> {
        vec![EntitySpec::new("Salesforce"), EntitySpec::new("HubSpot")]
    }

    fn registry(providers: Vec<Arc<dyn AnswerProvider>>) -> ProviderRegistry {
        ProviderRegistry::new(providers)
    }

    #[tokio::test]
    async fn fans_out_to_all_providers() {
        let orchestrator = ProbeOrchestrator::new(registry(vec![
            Arc::new(StaticProvider::new("alpha", "1. Acme\n2. Salesforce")),
            Arc::new(StaticProvider::new("beta", "HubSpot is popular.")),
        ]));

        let batch = orchestrator
            .probe("CRM tools", ProbeCategory::BestOf, &brand(), &competitors())
            .await
            .expect("probe");

        assert_eq!(batch.results.len(), 2);
        assert!(batch.failures.is_empty());

        let alpha = batch
            .results
            .iter()
            .find(|r| r.provider == "alpha")
            .expect("alpha result");
        assert!(alpha.brand.cited);
        assert_eq!(alpha.brand.position, Some(1));

        let beta = batch
            .results
            .iter()
            .find(|r| r.provider == "beta")
            .expect("beta result");
        assert!(!beta.brand.cited);
        assert!(beta.competitors["HubSpot"].cited);
    }

    #[tokio::test]
    async fn provider_failure_is_isolated() {
        let orchestrator = ProbeOrchestrator::new(registry(vec![
            Arc::new(StaticProvider::new("up", "Acme leads the market.")),
            Arc::new(StaticProvider::failing("down", "simulated outage")),
        ]));

        let batch = orchestrator
            .probe("CRM tools", ProbeCategory::BestOf, &brand(), &competitors())
            .await
            .expect("probe");

        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].provider, "up");
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].provider, "down");
        assert!(batch.failures[0].reason.contains("simulated outage"));
    }

    #[tokio::test]
    async fn no_providers_is_an_explicit_error() {
        let orchestrator = ProbeOrchestrator::new(registry(vec![]));
        let err = orchestrator
            .probe("CRM tools", ProbeCategory::BestOf, &brand(), &[])
            .await
            .expect_err("should fail");
        assert!(matches!(err, CiteLensError::NoProvidersEnabled));
    }

    #[tokio::test]
    async fn budget_veto_is_recorded_like_a_failure() {
        let gate = Arc::new(CostBudget::new(1, 10.0));
        let orchestrator = ProbeOrchestrator::new(registry(vec![
            Arc::new(StaticProvider::new("first", "Acme.")),
            Arc::new(StaticProvider::new("second", "Acme.")),
        ]))
        .with_gate(gate)
        .with_concurrency(1);

        let batch = orchestrator
            .probe("CRM tools", ProbeCategory::BestOf, &brand(), &[])
            .await
            .expect("probe");

        assert_eq!(batch.results.len() + batch.failures.len(), 2);
        assert_eq!(batch.results.len(), 1);
        assert!(batch.failures[0].reason.contains("budget"));
    }

    #[tokio::test]
    async fn probe_with_respects_the_subset() {
        let all: Vec<Arc<dyn AnswerProvider>> = vec![
            Arc::new(StaticProvider::with_rank("cheap", "Acme!", 1)),
            Arc::new(StaticProvider::with_rank("pricey", "Acme!", 9)),
        ];
        let orchestrator = ProbeOrchestrator::new(registry(all));
        let subset = orchestrator.registry().cheapest(1);

        let batch = orchestrator
            .probe_with(&subset, "CRM tools", ProbeCategory::BestOf, &brand(), &[])
            .await;

        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].provider, "cheap");
    }
}
