//! Core domain types for CiteLens citation intelligence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weight of the structural sub-score in the composite AEO score.
pub const STRUCTURAL_WEIGHT: f64 = 0.2;
/// Weight of the citation-validation sub-score in the composite AEO score.
pub const CITATION_WEIGHT: f64 = 0.5;
/// Weight of the competitive-gap sub-score in the composite AEO score.
pub const COMPETITIVE_WEIGHT: f64 = 0.3;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for canonical entity identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a new time-sortable entity identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Kind of a resolved canonical entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Brand,
    Product,
    Feature,
    Category,
}

impl EntityKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Product => "product",
            Self::Feature => "feature",
            Self::Category => "category",
        }
    }

    /// Parse the storage representation; unknown kinds fall back to `Brand`.
    pub fn parse(s: &str) -> Self {
        match s {
            "product" => Self::Product,
            "feature" => Self::Feature,
            "category" => Self::Category,
            _ => Self::Brand,
        }
    }
}

/// A resolved canonical entity in the citation graph. Created on first
/// mention, never deleted; naming variants attach as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub canonical_name: String,
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// A brand or competitor as described to the probe layer, before graph
/// resolution has assigned it a canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
        }
    }

    pub fn with_domain(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Some(domain.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Probe category, controlling the prompt template sent to providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeCategory {
    BestOf,
    Comparison,
    Recommendation,
    HowTo,
    General,
}

impl ProbeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestOf => "best-of",
            Self::Comparison => "comparison",
            Self::Recommendation => "recommendation",
            Self::HowTo => "how-to",
            Self::General => "general",
        }
    }

    /// Parse the kebab-case form; unknown categories fall back to `General`.
    pub fn parse(s: &str) -> Self {
        match s {
            "best-of" => Self::BestOf,
            "comparison" => Self::Comparison,
            "recommendation" => Self::Recommendation,
            "how-to" => Self::HowTo,
            _ => Self::General,
        }
    }
}

impl std::fmt::Display for ProbeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A natural-language probe question. The text is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub category: ProbeCategory,
}

impl Query {
    pub fn new(text: impl Into<String>, category: ProbeCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

// ---------------------------------------------------------------------------
// Citation detection results
// ---------------------------------------------------------------------------

/// How an entity mention was detected in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationType {
    Url,
    Name,
    Domain,
    Partial,
}

impl CitationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Name => "name",
            Self::Domain => "domain",
            Self::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "url" => Some(Self::Url),
            "name" => Some(Self::Name),
            "domain" => Some(Self::Domain),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// Sentiment of the sentence window around a brand mention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

/// Full detection result for one entity against one response text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationAnalysis {
    /// Whether the entity was detected at all.
    pub cited: bool,
    /// Detection tier that produced the citation (`None` when not cited).
    pub citation_type: Option<CitationType>,
    /// Confidence from the winning detection tier, 0.0 when not cited.
    pub confidence: f64,
    /// Sentiment of the sentence window around the mention.
    pub sentiment: Sentiment,
    /// 1-based position within an ordered list, when the response has one.
    pub position: Option<u32>,
    /// Other known entities also cited in the same response.
    pub competitors_cited: Vec<String>,
}

impl CitationAnalysis {
    /// The degenerate "not cited" result used for empty/malformed input.
    pub fn not_cited() -> Self {
        Self {
            cited: false,
            citation_type: None,
            confidence: 0.0,
            sentiment: Sentiment::Neutral,
            position: None,
            competitors_cited: Vec::new(),
        }
    }
}

/// The immutable, append-only record of one detection result, as ingested
/// into the citation graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationEvent {
    /// Event identifier (UUID v7).
    pub id: String,
    /// Observed entity name as the provider produced it (pre-resolution).
    pub entity_name: String,
    /// Provider that generated the response.
    pub provider: String,
    /// The probe that produced the response.
    pub query: Query,
    pub cited: bool,
    pub citation_type: Option<CitationType>,
    pub sentiment: Sentiment,
    pub position: Option<u32>,
    pub confidence: f64,
    pub occurred_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Probe results
// ---------------------------------------------------------------------------

/// Output of one provider call within a probe: the raw response plus
/// detection results for the brand and every competitor. Transient — not
/// persisted as-is; its detections become [`CitationEvent`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub query: String,
    pub category: ProbeCategory,
    pub provider: String,
    pub response_text: String,
    pub model: String,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub brand: CitationAnalysis,
    pub competitors: BTreeMap<String, CitationAnalysis>,
}

/// A provider that failed to produce a result for one probe. Failures are
/// accounted for, never surfaced as batch errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub query: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// AEO score
// ---------------------------------------------------------------------------

/// One rubric line in the structural score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub points: f64,
    pub max_points: f64,
    pub detail: String,
}

/// Structural-heuristics sub-score (synchronous, no external calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralScore {
    pub score: f64,
    pub weight: f64,
    pub factors: Vec<ScoreFactor>,
}

/// Citation-validation sub-score, with the probe evidence it was derived
/// from and an accounting of providers that produced no data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationValidationScore {
    pub score: f64,
    pub weight: f64,
    pub probe_results: Vec<ProbeResult>,
    pub failures: Vec<ProviderFailure>,
}

/// Competitive-gap sub-score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitiveGapScore {
    pub score: f64,
    pub weight: f64,
    /// Brand citation rate over the input results, in percent.
    pub your_rate: f64,
    /// Average competitor citation rate, in percent.
    pub competitor_avg_rate: f64,
    /// Competitor with the highest citation rate, if any were cited.
    pub top_competitor: Option<String>,
    /// Natural-language explanation of the gap.
    pub gap_analysis: String,
}

/// Recommendation priority, ordered from most to least urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A prioritized, rule-derived recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub message: String,
}

/// The composite citability score: three weighted sub-scores plus
/// prioritized recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AeoScore {
    /// `round(structural × 0.2 + citation × 0.5 + competitive × 0.3)`.
    pub overall: u32,
    pub structural: StructuralScore,
    pub citation: CitationValidationScore,
    pub competitive: CompetitiveGapScore,
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_roundtrip() {
        let id = EntityId::new();
        let s = id.to_string();
        let parsed: EntityId = s.parse().expect("parse EntityId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn score_weights_sum_to_one() {
        assert!((STRUCTURAL_WEIGHT + CITATION_WEIGHT + COMPETITIVE_WEIGHT - 1.0).abs() < 1e-9);
    }

    #[test]
    fn probe_category_roundtrip() {
        for cat in [
            ProbeCategory::BestOf,
            ProbeCategory::Comparison,
            ProbeCategory::Recommendation,
            ProbeCategory::HowTo,
            ProbeCategory::General,
        ] {
            assert_eq!(ProbeCategory::parse(cat.as_str()), cat);
        }
        assert_eq!(ProbeCategory::parse("unknown"), ProbeCategory::General);
    }

    #[test]
    fn priority_orders_critical_first() {
        let mut priorities = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn citation_analysis_serialization() {
        let analysis = CitationAnalysis {
            cited: true,
            citation_type: Some(CitationType::Name),
            confidence: 0.9,
            sentiment: Sentiment::Positive,
            position: Some(2),
            competitors_cited: vec!["HubSpot".into()],
        };
        let json = serde_json::to_string(&analysis).expect("serialize");
        let parsed: CitationAnalysis = serde_json::from_str(&json).expect("deserialize");
        assert!(parsed.cited);
        assert_eq!(parsed.citation_type, Some(CitationType::Name));
        assert_eq!(parsed.position, Some(2));
    }

    #[test]
    fn not_cited_is_zero_confidence() {
        let analysis = CitationAnalysis::not_cited();
        assert!(!analysis.cited);
        assert_eq!(analysis.confidence, 0.0);
        assert!(analysis.citation_type.is_none());
    }
}
