//! Competitive intelligence: probe a query set, profile the brand and each
//! competitor from the evidence, and derive SWOT-style insights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use citelens_probe::ProbeOrchestrator;
use citelens_shared::{
    CitationAnalysis, EntitySpec, ProbeCategory, ProbeResult, ProviderFailure, Query, Result,
    Sentiment,
};

/// A category counts as strong in a profile above this citation rate.
const STRONG_RATE: f64 = 0.6;
/// A category is weak at or below this citation rate.
const WEAK_RATE: f64 = 0.2;
/// The strength insight requires a higher bar than the profile listing.
const STRENGTH_INSIGHT_RATE: f64 = 0.7;
/// A competitor whose rate exceeds the brand's by more than this margin is
/// a threat.
const THREAT_MARGIN: f64 = 0.2;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Aggregate citation behavior of one entity across a probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityProfile {
    pub name: String,
    /// Cited probes over total probes, in [0, 1].
    pub citation_rate: f64,
    /// Mean 1-based list position over cited probes that had one, rounded
    /// to one decimal.
    pub avg_position: Option<f64>,
    /// Majority sentiment over cited probes; ties break positive, then
    /// neutral.
    pub dominant_sentiment: Sentiment,
    /// Categories where this entity's citation rate is at least 0.6.
    pub strong_categories: Vec<ProbeCategory>,
    /// Categories with probes where the rate is at most 0.2.
    pub weak_categories: Vec<ProbeCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Opportunity,
    Threat,
    Strength,
    Weakness,
}

/// One derived observation about the competitive landscape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Full output of one competitive run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitiveReport {
    pub brand: EntityProfile,
    pub competitors: Vec<EntityProfile>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<String>,
    /// Providers that produced no data, carried through from the probes.
    pub failures: Vec<ProviderFailure>,
    /// Total probe results the report was built from.
    pub total_probes: usize,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Probe every query against all enabled providers and build the report.
///
/// Errors only when no providers are enabled; provider failures within a
/// probe are accounted for in the report instead.
#[instrument(skip_all, fields(brand = %brand.name, queries = queries.len()))]
pub async fn run(
    brand: &EntitySpec,
    competitors: &[EntitySpec],
    queries: &[Query],
    orchestrator: &ProbeOrchestrator,
) -> Result<CompetitiveReport> {
    let (results, failures) = collect(brand, competitors, queries, orchestrator).await?;
    let report = build_report(&results, failures, &brand.name, competitors);
    info!(
        probes = report.total_probes,
        insights = report.insights.len(),
        "competitive run complete"
    );
    Ok(report)
}

/// Probe every query and return the raw evidence, for callers that record
/// the results elsewhere before reporting on them.
pub async fn collect(
    brand: &EntitySpec,
    competitors: &[EntitySpec],
    queries: &[Query],
    orchestrator: &ProbeOrchestrator,
) -> Result<(Vec<ProbeResult>, Vec<ProviderFailure>)> {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for query in queries {
        let batch = orchestrator
            .probe(&query.text, query.category, brand, competitors)
            .await?;
        results.extend(batch.results);
        failures.extend(batch.failures);
    }
    Ok((results, failures))
}

/// Build a report from already-collected probe evidence.
pub fn build_report(
    results: &[ProbeResult],
    failures: Vec<ProviderFailure>,
    brand_name: &str,
    competitors: &[EntitySpec],
) -> CompetitiveReport {
    let brand_profile = profile(brand_name, results, |r| Some(&r.brand));
    let competitor_profiles: Vec<EntityProfile> = competitors
        .iter()
        .map(|c| profile(&c.name, results, |r| r.competitors.get(&c.name)))
        .collect();

    let insights = derive_insights(results, &brand_profile, &competitor_profiles);
    let recommendations = derive_recommendations(&insights, &competitor_profiles);

    CompetitiveReport {
        brand: brand_profile,
        competitors: competitor_profiles,
        insights,
        recommendations,
        failures,
        total_probes: results.len(),
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

fn profile<'a>(
    name: &str,
    results: &'a [ProbeResult],
    analysis_of: impl Fn(&'a ProbeResult) -> Option<&'a CitationAnalysis>,
) -> EntityProfile {
    let analyses: Vec<(&ProbeResult, &CitationAnalysis)> = results
        .iter()
        .filter_map(|r| analysis_of(r).map(|a| (r, a)))
        .collect();

    let total = analyses.len();
    let cited: Vec<&(&ProbeResult, &CitationAnalysis)> =
        analyses.iter().filter(|(_, a)| a.cited).collect();

    let citation_rate = if total == 0 {
        0.0
    } else {
        cited.len() as f64 / total as f64
    };

    let positions: Vec<u32> = cited.iter().filter_map(|(_, a)| a.position).collect();
    let avg_position = if positions.is_empty() {
        None
    } else {
        let mean = positions.iter().sum::<u32>() as f64 / positions.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    let dominant_sentiment = dominant_sentiment(cited.iter().map(|(_, a)| a.sentiment));

    // Per-category rates over this entity's probes.
    let mut per_category: BTreeMap<&'static str, (usize, usize)> = BTreeMap::new();
    for (result, analysis) in &analyses {
        let entry = per_category.entry(result.category.as_str()).or_default();
        entry.0 += 1;
        if analysis.cited {
            entry.1 += 1;
        }
    }

    let mut strong_categories = Vec::new();
    let mut weak_categories = Vec::new();
    for (category, (probes, cited)) in &per_category {
        let rate = *cited as f64 / *probes as f64;
        let category = ProbeCategory::parse(category);
        if rate >= STRONG_RATE {
            strong_categories.push(category);
        } else if rate <= WEAK_RATE {
            weak_categories.push(category);
        }
    }

    EntityProfile {
        name: name.to_string(),
        citation_rate,
        avg_position,
        dominant_sentiment,
        strong_categories,
        weak_categories,
    }
}

/// Majority sentiment over cited mentions; ties break toward positive,
/// then neutral. No citations at all reads as neutral.
fn dominant_sentiment(sentiments: impl Iterator<Item = Sentiment>) -> Sentiment {
    let (mut positive, mut neutral, mut negative) = (0usize, 0usize, 0usize);
    for s in sentiments {
        match s {
            Sentiment::Positive => positive += 1,
            Sentiment::Neutral => neutral += 1,
            Sentiment::Negative => negative += 1,
        }
    }
    if positive >= neutral && positive >= negative && positive > 0 {
        Sentiment::Positive
    } else if neutral >= negative {
        Sentiment::Neutral
    } else {
        Sentiment::Negative
    }
}

// ---------------------------------------------------------------------------
// Insights and recommendations
// ---------------------------------------------------------------------------

fn derive_insights(
    results: &[ProbeResult],
    brand: &EntityProfile,
    competitors: &[EntityProfile],
) -> Vec<Insight> {
    let mut insights = Vec::new();

    // Opportunities: a query no entity was cited for, across all providers.
    let mut per_query: BTreeMap<&str, bool> = BTreeMap::new();
    for result in results {
        let anyone = result.brand.cited || result.competitors.values().any(|a| a.cited);
        let entry = per_query.entry(result.query.as_str()).or_insert(false);
        *entry |= anyone;
    }
    for (query, anyone_cited) in &per_query {
        if !anyone_cited {
            insights.push(Insight {
                kind: InsightKind::Opportunity,
                message: format!("No one is cited for \"{query}\" yet."),
            });
        }
    }

    // Threats: a competitor out-citing the brand by a clear margin.
    for competitor in competitors {
        if competitor.citation_rate > brand.citation_rate + THREAT_MARGIN {
            insights.push(Insight {
                kind: InsightKind::Threat,
                message: format!(
                    "{} is cited in {:.0}% of probes versus your {:.0}%.",
                    competitor.name,
                    competitor.citation_rate * 100.0,
                    brand.citation_rate * 100.0
                ),
            });
        }
    }

    // Strengths and weaknesses over the brand's per-category rates.
    let mut per_category: BTreeMap<&'static str, (usize, usize)> = BTreeMap::new();
    for result in results {
        let entry = per_category.entry(result.category.as_str()).or_default();
        entry.0 += 1;
        if result.brand.cited {
            entry.1 += 1;
        }
    }
    for (category, (probes, cited)) in &per_category {
        let rate = *cited as f64 / *probes as f64;
        if rate >= STRENGTH_INSIGHT_RATE {
            insights.push(Insight {
                kind: InsightKind::Strength,
                message: format!("Your brand reliably appears in {category} answers."),
            });
        } else if *probes >= 2 && *cited == 0 {
            insights.push(Insight {
                kind: InsightKind::Weakness,
                message: format!(
                    "Your brand was never cited across {probes} {category} probes."
                ),
            });
        }
    }

    insights
}

fn derive_recommendations(insights: &[Insight], competitors: &[EntityProfile]) -> Vec<String> {
    let mut recs = Vec::new();

    for insight in insights.iter().filter(|i| i.kind == InsightKind::Opportunity) {
        recs.push(format!(
            "Publish content that answers the open question: {}",
            insight.message
        ));
    }
    for insight in insights.iter().filter(|i| i.kind == InsightKind::Threat) {
        recs.push(format!(
            "Counter a competitor that dominates answers: {}",
            insight.message
        ));
    }
    for insight in insights.iter().filter(|i| i.kind == InsightKind::Weakness) {
        recs.push(format!("Build coverage where you are absent: {}", insight.message));
    }

    let top = competitors
        .iter()
        .max_by(|a, b| {
            a.citation_rate
                .partial_cmp(&b.citation_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .filter(|c| c.citation_rate > 0.5);
    if let Some(top) = top {
        recs.push(format!(
            "Study how {} is framed in answers; it appears in {:.0}% of probes.",
            top.name,
            top.citation_rate * 100.0
        ));
    }

    recs
}
