//! Competitive-gap score: brand citation rate versus competitor rates over
//! a shared set of prior probe results. Synchronous and pure.

use std::collections::HashMap;

use citelens_shared::{COMPETITIVE_WEIGHT, CompetitiveGapScore, ProbeResult};

/// One prior result, reduced to the facts the gap score needs.
#[derive(Debug, Clone)]
pub struct GapInput {
    pub brand_cited: bool,
    pub competitors_cited: Vec<String>,
}

impl From<&ProbeResult> for GapInput {
    fn from(result: &ProbeResult) -> Self {
        Self {
            brand_cited: result.brand.cited,
            competitors_cited: result
                .competitors
                .iter()
                .filter(|(_, a)| a.cited)
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }
}

/// Score the competitive gap over `results`.
///
/// An empty result set scores 50 ("insufficient data") rather than 0 or
/// 100. With data, the brand scores 100 whenever its rate meets the
/// competitor average, and `max(0, 100 − gap × 1.5)` otherwise.
pub fn score_competitive_gap(results: &[GapInput]) -> CompetitiveGapScore {
    if results.is_empty() {
        return CompetitiveGapScore {
            score: 50.0,
            weight: COMPETITIVE_WEIGHT,
            your_rate: 0.0,
            competitor_avg_rate: 0.0,
            top_competitor: None,
            gap_analysis: "Insufficient data: no probe results to compare yet.".into(),
        };
    }

    let total = results.len() as f64;
    let brand_rate = results.iter().filter(|r| r.brand_cited).count() as f64 / total * 100.0;

    let mut competitor_counts: HashMap<&str, usize> = HashMap::new();
    for result in results {
        for name in &result.competitors_cited {
            *competitor_counts.entry(name.as_str()).or_default() += 1;
        }
    }

    let competitor_rates: Vec<(&str, f64)> = competitor_counts
        .iter()
        .map(|(name, count)| (*name, *count as f64 / total * 100.0))
        .collect();

    let competitor_avg_rate = if competitor_rates.is_empty() {
        0.0
    } else {
        competitor_rates.iter().map(|(_, r)| r).sum::<f64>() / competitor_rates.len() as f64
    };

    // Highest rate wins; name as the deterministic tiebreak.
    let top_competitor = competitor_rates
        .iter()
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        })
        .map(|(name, _)| name.to_string());

    let score = if brand_rate >= competitor_avg_rate {
        100.0
    } else {
        (100.0 - (competitor_avg_rate - brand_rate) * 1.5).max(0.0)
    };

    let gap_analysis = gap_narrative(brand_rate, competitor_avg_rate, top_competitor.as_deref());

    CompetitiveGapScore {
        score,
        weight: COMPETITIVE_WEIGHT,
        your_rate: brand_rate,
        competitor_avg_rate,
        top_competitor,
        gap_analysis,
    }
}

/// Four narrative cases: leading, greenfield, urgent, trailing.
fn gap_narrative(brand_rate: f64, competitor_avg: f64, top_competitor: Option<&str>) -> String {
    if brand_rate >= competitor_avg && brand_rate > 0.0 {
        format!(
            "Your brand leads: cited in {brand_rate:.0}% of probes versus a \
             {competitor_avg:.0}% competitor average."
        )
    } else if brand_rate == 0.0 && competitor_avg == 0.0 {
        "Neither your brand nor competitors are being cited yet — a greenfield \
         opportunity to own these answers."
            .into()
    } else if brand_rate == 0.0 {
        format!(
            "Urgent: your brand is never cited while competitors average \
             {competitor_avg:.0}%{}.",
            top_competitor
                .map(|name| format!(" (led by {name})"))
                .unwrap_or_default()
        )
    } else {
        format!(
            "Your brand trails by {:.0} points{}.",
            competitor_avg - brand_rate,
            top_competitor
                .map(|name| format!("; {name} is cited most often"))
                .unwrap_or_default()
        )
    }
}
