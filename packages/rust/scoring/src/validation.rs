//! Citation-validation score: an explicit two-phase extract → probe
//! pipeline. Queries are extracted from the content, probed against the
//! cheapest enabled providers, and the citation evidence is folded into a
//! bonus/penalty score.

use std::collections::HashMap;

use tracing::{info, instrument};

use citelens_extraction::extract_queries;
use citelens_probe::ProbeOrchestrator;
use citelens_shared::{CITATION_WEIGHT, CitationValidationScore, EntitySpec, Sentiment};

/// Limits for one validation run.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum queries extracted from the content.
    pub max_queries: usize,
    /// Providers probed per query, cheapest first.
    pub max_providers: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_queries: 5,
            max_providers: 3,
        }
    }
}

/// Run the citation-validation pipeline for `content`.
///
/// Zero extracted queries or zero enabled providers degrade to score 0 with
/// an empty probe-result set; neither is an error.
#[instrument(skip_all, fields(brand = %brand.name))]
pub async fn score_citation_validation(
    content: &str,
    keywords: &[String],
    brand: &EntitySpec,
    competitors: &[EntitySpec],
    orchestrator: &ProbeOrchestrator,
    config: &ValidationConfig,
) -> CitationValidationScore {
    // Phase 1: extract.
    let queries = extract_queries(content, keywords, config.max_queries);
    let providers = orchestrator.registry().cheapest(config.max_providers);

    if queries.is_empty() || providers.is_empty() {
        info!(
            queries = queries.len(),
            providers = providers.len(),
            "nothing to validate"
        );
        return CitationValidationScore {
            score: 0.0,
            weight: CITATION_WEIGHT,
            probe_results: Vec::new(),
            failures: Vec::new(),
        };
    }

    // Phase 2: probe. Providers fan out concurrently within each query.
    let total_pairs = queries.len() * providers.len();
    let mut probe_results = Vec::new();
    let mut failures = Vec::new();
    for query in &queries {
        let batch = orchestrator
            .probe_with(&providers, &query.text, query.category, brand, competitors)
            .await;
        probe_results.extend(batch.results);
        failures.extend(batch.failures);
    }

    let score = validation_score(&probe_results, total_pairs);

    info!(
        score,
        results = probe_results.len(),
        failures = failures.len(),
        "citation validation complete"
    );

    CitationValidationScore {
        score,
        weight: CITATION_WEIGHT,
        probe_results,
        failures,
    }
}

/// Fold probe evidence into the validation score: base rate plus sentiment,
/// position, and consensus bonuses, minus per-competitor penalties.
pub fn validation_score(results: &[citelens_shared::ProbeResult], total_pairs: usize) -> f64 {
    if total_pairs == 0 {
        return 0.0;
    }

    let citations = results.iter().filter(|r| r.brand.cited).count();
    let mut score = (citations as f64 / total_pairs as f64) * 100.0;

    let any_positive = results
        .iter()
        .any(|r| r.brand.cited && r.brand.sentiment == Sentiment::Positive);
    if any_positive {
        score += 10.0;
    }

    let any_top_position = results
        .iter()
        .any(|r| r.brand.cited && r.brand.position.is_some_and(|p| p <= 3));
    if any_top_position {
        score += 15.0;
    }

    // Consensus: the same query cited by two or more providers.
    let mut per_query: HashMap<&str, usize> = HashMap::new();
    for r in results.iter().filter(|r| r.brand.cited) {
        *per_query.entry(r.query.as_str()).or_default() += 1;
    }
    if per_query.values().any(|&count| count >= 2) {
        score += 10.0;
    }

    // Penalty per competitor out-citing the brand across the whole run.
    let mut competitor_totals: HashMap<&str, usize> = HashMap::new();
    for r in results {
        for (name, analysis) in &r.competitors {
            if analysis.cited {
                *competitor_totals.entry(name.as_str()).or_default() += 1;
            }
        }
    }
    let leaders = competitor_totals
        .values()
        .filter(|&&total| total > citations)
        .count();
    score -= 10.0 * leaders as f64;

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use citelens_providers::{AnswerProvider, ProviderRegistry, StaticProvider};
    use citelens_shared::{CitationAnalysis, CitationType, ProbeCategory, ProbeResult};

    fn result(
        query: &str,
        provider: &str,
        cited: bool,
        position: Option<u32>,
        sentiment: Sentiment,
    ) -> ProbeResult {
        ProbeResult {
            query: query.into(),
            category: ProbeCategory::BestOf,
            provider: provider.into(),
            response_text: String::new(),
            model: "static".into(),
            cost_usd: 0.0,
            latency_ms: 0,
            brand: CitationAnalysis {
                cited,
                citation_type: cited.then_some(CitationType::Name),
                confidence: if cited { 0.9 } else { 0.0 },
                sentiment,
                position,
                competitors_cited: Vec::new(),
            },
            competitors: BTreeMap::new(),
        }
    }

    #[test]
    fn base_rate_with_sentiment_and_position_bonuses() {
        // One citation out of two probe×provider pairs: base 50,
        // +10 positive sentiment, +15 top-3 position.
        let results = vec![
            result("best CRM tools", "alpha", true, Some(1), Sentiment::Positive),
            result("best CRM tools", "beta", false, None, Sentiment::Neutral),
        ];
        assert_eq!(validation_score(&results, 2), 75.0);
    }

    #[test]
    fn consensus_bonus_for_multi_provider_citation() {
        let results = vec![
            result("q1", "alpha", true, None, Sentiment::Neutral),
            result("q1", "beta", true, None, Sentiment::Neutral),
        ];
        // Base 100 clamps the consensus bonus away; shrink the rate instead.
        assert_eq!(validation_score(&results, 4), 50.0 + 10.0);
    }

    #[test]
    fn competitor_penalty_applies_per_leader() {
        let mut cited = result("q1", "alpha", false, None, Sentiment::Neutral);
        cited.competitors.insert(
            "Salesforce".into(),
            CitationAnalysis {
                cited: true,
                citation_type: Some(CitationType::Name),
                confidence: 0.9,
                sentiment: Sentiment::Neutral,
                position: None,
                competitors_cited: Vec::new(),
            },
        );
        let results = vec![cited];
        // Brand 0/1, Salesforce 1 > 0: base 0 − 10 clamps to 0.
        assert_eq!(validation_score(&results, 1), 0.0);
    }

    #[test]
    fn zero_pairs_is_zero() {
        assert_eq!(validation_score(&[], 0), 0.0);
    }

    #[tokio::test]
    async fn empty_content_degrades_to_zero_without_probing() {
        let registry = ProviderRegistry::new(vec![Arc::new(StaticProvider::new(
            "alpha",
            "Acme is everywhere.",
        )) as Arc<dyn AnswerProvider>]);
        let orchestrator = ProbeOrchestrator::new(registry);

        let score = score_citation_validation(
            "",
            &[],
            &EntitySpec::new("Acme"),
            &[],
            &orchestrator,
            &ValidationConfig::default(),
        )
        .await;

        assert_eq!(score.score, 0.0);
        assert!(score.probe_results.is_empty());
        assert!(score.failures.is_empty());
    }

    #[tokio::test]
    async fn zero_providers_degrades_to_zero() {
        let orchestrator = ProbeOrchestrator::new(ProviderRegistry::new(vec![]));
        let score = score_citation_validation(
            "## Best CRM tools\n\nBody.",
            &[],
            &EntitySpec::new("Acme"),
            &[],
            &orchestrator,
            &ValidationConfig::default(),
        )
        .await;
        assert_eq!(score.score, 0.0);
        assert!(score.probe_results.is_empty());
    }

    #[tokio::test]
    async fn end_to_end_with_static_providers() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(StaticProvider::with_rank("cheap", "1. Acme is the best pick.", 1))
                as Arc<dyn AnswerProvider>,
            Arc::new(StaticProvider::with_rank("mid", "Nothing relevant here.", 2)),
        ]);
        let orchestrator = ProbeOrchestrator::new(registry);

        let content = "## Best CRM tools\n\nSome body text that is long enough to matter.";
        let score = score_citation_validation(
            content,
            &[],
            &EntitySpec::new("Acme"),
            &[],
            &orchestrator,
            &ValidationConfig::default(),
        )
        .await;

        // Two queries (heading + lead paragraph) × two providers; "cheap"
        // cites with position 1 and positive sentiment both times.
        assert!(score.score > 0.0);
        assert_eq!(score.probe_results.len(), 4);
        assert!(score.failures.is_empty());
    }
}
