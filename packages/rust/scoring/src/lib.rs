//! Citability scoring: three weighted sub-scores composed into one 0-100
//! AEO score with prioritized recommendations.
//!
//! - structural (0.2): synchronous heuristics over the content body
//! - citation validation (0.5): live extract → probe evidence
//! - competitive gap (0.3): brand versus competitor citation rates

mod gap;
mod structural;
mod validation;

pub use gap::{GapInput, score_competitive_gap};
pub use structural::score_structural;
pub use validation::{ValidationConfig, score_citation_validation, validation_score};

use tracing::{info, instrument};

use citelens_probe::ProbeOrchestrator;
use citelens_shared::{
    AeoScore, CITATION_WEIGHT, COMPETITIVE_WEIGHT, CitationValidationScore, CompetitiveGapScore,
    EntitySpec, Priority, Recommendation, STRUCTURAL_WEIGHT, StructuralScore,
};

/// Combine the three sub-scores with their fixed weights, rounded to the
/// nearest integer.
pub fn combine(structural: f64, citation: f64, competitive: f64) -> u32 {
    let weighted = structural * STRUCTURAL_WEIGHT
        + citation * CITATION_WEIGHT
        + competitive * COMPETITIVE_WEIGHT;
    weighted.round().clamp(0.0, 100.0) as u32
}

/// Score `content` end to end: structural heuristics, then the live
/// citation-validation pipeline, then the competitive gap over that same
/// probe evidence.
#[instrument(skip_all, fields(brand = %brand.name))]
pub async fn score_content(
    content: &str,
    keywords: &[String],
    brand: &EntitySpec,
    competitors: &[EntitySpec],
    orchestrator: &ProbeOrchestrator,
    config: &ValidationConfig,
) -> AeoScore {
    let structural = score_structural(content, keywords, &brand.name);
    let citation =
        score_citation_validation(content, keywords, brand, competitors, orchestrator, config)
            .await;

    let gap_inputs: Vec<GapInput> = citation.probe_results.iter().map(GapInput::from).collect();
    let competitive = score_competitive_gap(&gap_inputs);

    let overall = combine(structural.score, citation.score, competitive.score);
    let recommendations = recommendations(&structural, &citation, &competitive);

    info!(
        overall,
        structural = structural.score,
        citation = citation.score,
        competitive = competitive.score,
        "scoring complete"
    );

    AeoScore {
        overall,
        structural,
        citation,
        competitive,
        recommendations,
    }
}

/// Derive prioritized recommendations from the three sub-scores, most
/// urgent first.
pub fn recommendations(
    structural: &StructuralScore,
    citation: &CitationValidationScore,
    competitive: &CompetitiveGapScore,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if citation.score < 30.0 {
        recs.push(Recommendation {
            priority: Priority::Critical,
            category: "content".into(),
            message: "AI engines rarely cite this content. Rework it to answer the \
                      questions it raises directly and authoritatively."
                .into(),
        });
    }

    for factor in &structural.factors {
        match factor.name.as_str() {
            "schema_markup" if factor.points == 0.0 => recs.push(Recommendation {
                priority: Priority::High,
                category: "schema".into(),
                message: "Add structured data (JSON-LD) so engines can parse the page's \
                          claims without guessing."
                    .into(),
            }),
            "keyword_density" if factor.points == 0.0 => recs.push(Recommendation {
                priority: Priority::High,
                category: "content".into(),
                message: "Target keywords never appear in the body. Work them into \
                          headings and opening sentences."
                    .into(),
            }),
            "keyword_density" if factor.points < factor.max_points => recs.push(Recommendation {
                priority: Priority::Medium,
                category: "content".into(),
                message: format!(
                    "Keyword density is off the 1-3% band ({}).",
                    factor.detail
                ),
            }),
            "word_count" if factor.points < factor.max_points => recs.push(Recommendation {
                priority: Priority::Medium,
                category: "content".into(),
                message: format!(
                    "Content length is outside the 800-2000 word band ({}).",
                    factor.detail
                ),
            }),
            "readability" if factor.points < factor.max_points => recs.push(Recommendation {
                priority: Priority::Low,
                category: "content".into(),
                message: format!(
                    "Reading level is outside the grade 8-12 band ({}).",
                    factor.detail
                ),
            }),
            _ => {}
        }
    }

    if competitive.competitor_avg_rate > competitive.your_rate {
        let target = competitive
            .top_competitor
            .as_deref()
            .unwrap_or("the leading competitor");
        recs.push(Recommendation {
            priority: Priority::High,
            category: "competitive".into(),
            message: format!(
                "Competitors are cited more often than your brand. Study how {target} \
                 is presented in answers and close the gap."
            ),
        });
    }

    recs.sort_by_key(|r| r.priority);
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use citelens_providers::{AnswerProvider, ProviderRegistry, StaticProvider};
    use citelens_shared::ScoreFactor;

    fn structural_with(factors: Vec<ScoreFactor>, score: f64) -> StructuralScore {
        StructuralScore {
            score,
            weight: STRUCTURAL_WEIGHT,
            factors,
        }
    }

    fn citation_with(score: f64) -> CitationValidationScore {
        CitationValidationScore {
            score,
            weight: CITATION_WEIGHT,
            probe_results: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn competitive_with(score: f64, yours: f64, avg: f64) -> CompetitiveGapScore {
        CompetitiveGapScore {
            score,
            weight: COMPETITIVE_WEIGHT,
            your_rate: yours,
            competitor_avg_rate: avg,
            top_competitor: Some("Salesforce".into()),
            gap_analysis: String::new(),
        }
    }

    fn factor(name: &str, points: f64, max: f64) -> ScoreFactor {
        ScoreFactor {
            name: name.into(),
            points,
            max_points: max,
            detail: "test".into(),
        }
    }

    #[test]
    fn combine_applies_the_documented_weights() {
        // 80×0.2 + 60×0.5 + 40×0.3 = 16 + 30 + 12 = 58.
        assert_eq!(combine(80.0, 60.0, 40.0), 58);
        assert_eq!(combine(0.0, 0.0, 0.0), 0);
        assert_eq!(combine(100.0, 100.0, 100.0), 100);
    }

    #[test]
    fn combine_rounds_to_nearest() {
        // 50×0.2 + 50×0.5 + 51×0.3 = 10 + 25 + 15.3 = 50.3 → 50.
        assert_eq!(combine(50.0, 50.0, 51.0), 50);
        // 50×0.2 + 51×0.5 + 51×0.3 = 10 + 25.5 + 15.3 = 50.8 → 51.
        assert_eq!(combine(50.0, 51.0, 51.0), 51);
    }

    #[test]
    fn combine_stays_in_range_for_any_sub_scores() {
        for s in [0.0, 25.0, 50.0, 75.0, 100.0] {
            for c in [0.0, 33.0, 67.0, 100.0] {
                for g in [0.0, 50.0, 100.0] {
                    let overall = combine(s, c, g);
                    assert!(overall <= 100);
                }
            }
        }
    }

    #[test]
    fn low_citation_score_is_critical() {
        let recs = recommendations(
            &structural_with(vec![], 90.0),
            &citation_with(10.0),
            &competitive_with(100.0, 50.0, 20.0),
        );
        assert_eq!(recs[0].priority, Priority::Critical);
        assert_eq!(recs[0].category, "content");
    }

    #[test]
    fn missing_schema_and_competitor_lead_rank_high() {
        let recs = recommendations(
            &structural_with(vec![factor("schema_markup", 0.0, 15.0)], 50.0),
            &citation_with(60.0),
            &competitive_with(40.0, 20.0, 60.0),
        );
        assert!(recs.iter().all(|r| r.priority != Priority::Critical));
        let highs: Vec<&str> = recs
            .iter()
            .filter(|r| r.priority == Priority::High)
            .map(|r| r.category.as_str())
            .collect();
        assert!(highs.contains(&"schema"));
        assert!(highs.contains(&"competitive"));
        let competitive_rec = recs
            .iter()
            .find(|r| r.category == "competitive")
            .expect("competitive recommendation");
        assert!(competitive_rec.message.contains("Salesforce"));
    }

    #[test]
    fn recommendations_are_sorted_most_urgent_first() {
        let recs = recommendations(
            &structural_with(
                vec![
                    factor("readability", 4.0, 10.0),
                    factor("schema_markup", 0.0, 15.0),
                    factor("word_count", 7.5, 15.0),
                ],
                40.0,
            ),
            &citation_with(10.0),
            &competitive_with(100.0, 60.0, 30.0),
        );
        let priorities: Vec<Priority> = recs.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert_eq!(priorities[0], Priority::Critical);
        assert_eq!(*priorities.last().expect("non-empty"), Priority::Low);
    }

    #[test]
    fn healthy_scores_produce_no_recommendations() {
        let recs = recommendations(
            &structural_with(
                vec![
                    factor("schema_markup", 15.0, 15.0),
                    factor("keyword_density", 10.0, 10.0),
                    factor("word_count", 15.0, 15.0),
                    factor("readability", 10.0, 10.0),
                ],
                95.0,
            ),
            &citation_with(85.0),
            &competitive_with(100.0, 70.0, 40.0),
        );
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn score_content_composes_all_three_parts() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(StaticProvider::with_rank(
                "cheap",
                "1. Acme is the best pick for most teams.",
                1,
            )) as Arc<dyn AnswerProvider>,
        ]);
        let orchestrator = ProbeOrchestrator::new(registry);

        let content = "## Best CRM tools\n\nAcme is a crm platform teams rely on every day.";
        let score = score_content(
            content,
            &["crm".into()],
            &EntitySpec::new("Acme"),
            &[EntitySpec::new("Salesforce")],
            &orchestrator,
            &ValidationConfig::default(),
        )
        .await;

        assert!(score.overall > 0);
        assert!(!score.citation.probe_results.is_empty());
        // Every probe cites the brand and no competitor, so the gap part
        // reports a lead.
        assert_eq!(score.competitive.score, 100.0);
        assert_eq!(
            score.competitive.your_rate, 100.0,
            "brand cited in every probe"
        );
    }
}
