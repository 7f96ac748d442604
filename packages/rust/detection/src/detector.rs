//! Whole-response citation detection.
//!
//! Applies the tiered matcher to the brand and every competitor over one
//! response text, then derives sentiment, ordered-list position, and the
//! set of co-cited competitors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use citelens_shared::{CitationAnalysis, EntitySpec, Sentiment};

use crate::matcher::match_entity;
use crate::sentiment::sentence_sentiment;

/// Ordered (numbered) markdown list items: `1. Entry` or `2) Entry`.
static ORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\d+)[.)]\s+(.+)$").expect("valid list regex"));

/// Detection results for one full response: the brand plus every competitor,
/// evaluated against the same text.
#[derive(Debug, Clone)]
pub struct ResponseAnalysis {
    pub brand: CitationAnalysis,
    pub competitors: BTreeMap<String, CitationAnalysis>,
}

/// Analyze one response for the brand and all competitors.
///
/// Each competitor run excludes itself from the other-entities list and
/// includes the brand, so a competitor cannot self-shadow and brand-shaped
/// substrings are disambiguated symmetrically. Total over arbitrary text.
pub fn analyze_response(
    text: &str,
    brand: &EntitySpec,
    competitors: &[EntitySpec],
) -> ResponseAnalysis {
    let competitor_names: Vec<String> = competitors.iter().map(|c| c.name.clone()).collect();

    let brand_analysis = detect_entity(text, brand, &competitor_names);

    let mut competitor_results = BTreeMap::new();
    for competitor in competitors {
        let others: Vec<String> = std::iter::once(brand.name.clone())
            .chain(
                competitors
                    .iter()
                    .filter(|c| c.name != competitor.name)
                    .map(|c| c.name.clone()),
            )
            .collect();
        let analysis = detect_entity(text, competitor, &others);
        competitor_results.insert(competitor.name.clone(), analysis);
    }

    // Record which competitors were co-cited with the brand.
    let co_cited: Vec<String> = competitor_results
        .iter()
        .filter(|(_, a)| a.cited)
        .map(|(name, _)| name.clone())
        .collect();

    let mut brand_analysis = brand_analysis;
    brand_analysis.competitors_cited = co_cited;

    debug!(
        brand = %brand.name,
        brand_cited = brand_analysis.cited,
        competitors_cited = brand_analysis.competitors_cited.len(),
        "response analyzed"
    );

    ResponseAnalysis {
        brand: brand_analysis,
        competitors: competitor_results,
    }
}

/// Detect one entity in `text`, with sentiment and list position.
/// Returns the not-cited result for empty or malformed input.
pub fn detect_entity(text: &str, target: &EntitySpec, others: &[String]) -> CitationAnalysis {
    let m = match_entity(text, &target.name, target.domain.as_deref(), others);
    if !m.cited {
        return CitationAnalysis::not_cited();
    }

    let sentiment = mention_offset(text, &target.name)
        .map(|at| sentence_sentiment(text, at))
        .unwrap_or(Sentiment::Neutral);

    CitationAnalysis {
        cited: true,
        citation_type: m.citation_type,
        confidence: m.confidence,
        sentiment,
        position: list_position(text, &target.name),
        competitors_cited: Vec::new(),
    }
}

/// Byte offset of the first case-insensitive occurrence of `name`.
///
/// Matched on the original text, never a lowercased copy: case folding can
/// change byte lengths (Turkish `İ` folds to two chars), so offsets from a
/// folded string do not index the original.
fn mention_offset(text: &str, name: &str) -> Option<usize> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let pattern = format!("(?i){}", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.start())
}

/// 1-based index of the ordered-list entry mentioning `name`, if the
/// response contains a numbered list with such an entry.
pub fn list_position(text: &str, name: &str) -> Option<u32> {
    let name_lc = name.trim().to_lowercase();
    if name_lc.is_empty() {
        return None;
    }

    for caps in ORDERED_ITEM_RE.captures_iter(text) {
        let entry = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if entry.to_lowercase().contains(&name_lc) {
            if let Ok(index) = caps[1].parse::<u32>() {
                return Some(index);
            }
        }
    }
    None
}
