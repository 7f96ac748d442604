//! Probe-question extraction from content bodies.
//!
//! Derives candidate probe questions from a markdown/plain-text content
//! body: H2/H3 headings reworded as questions, FAQ `Q:` lines, the first
//! substantive paragraph's leading clause, and configured keywords. Each
//! source carries a fixed confidence weight; candidates are deduplicated by
//! normalized text, ranked by confidence, and truncated to `max_queries`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use citelens_shared::{ProbeCategory, Query};

/// Default cap on extracted queries.
pub const DEFAULT_MAX_QUERIES: usize = 5;

/// Confidence weight for heading-derived questions.
const HEADING_CONFIDENCE: f64 = 0.8;
/// Confidence weight for FAQ `Q:` lines.
const FAQ_CONFIDENCE: f64 = 0.9;
/// Confidence weight for the lead-paragraph question.
const LEAD_CONFIDENCE: f64 = 0.7;
/// Confidence weight for keyword-derived questions.
const KEYWORD_CONFIDENCE: f64 = 0.6;

/// Markdown H2/H3 headings.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+(.+?)\s*#*\s*$").expect("valid heading regex"));

/// FAQ-style question lines (`Q:` / `Q.` prefixes).
static FAQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*q[:.]\s*(.+)$").expect("valid FAQ regex"));

/// Leading question words that make a heading interrogative as-is.
const QUESTION_WORDS: &[&str] = &[
    "what", "how", "why", "when", "where", "which", "who", "can", "should", "is", "are", "does",
    "do",
];

/// Where a candidate query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Heading,
    Faq,
    LeadParagraph,
    Keyword,
}

/// One candidate probe question, before truncation.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub text: String,
    pub category: ProbeCategory,
    pub confidence: f64,
    pub source: QuerySource,
}

impl CandidateQuery {
    /// Convert into the shared [`Query`] shape.
    pub fn into_query(self) -> Query {
        Query::new(self.text, self.category)
    }
}

/// Extract up to `max_queries` candidate probe questions from `content`.
///
/// Zero candidates is a valid outcome for thin content, not an error.
pub fn extract_queries(
    content: &str,
    keywords: &[String],
    max_queries: usize,
) -> Vec<CandidateQuery> {
    let mut candidates: Vec<CandidateQuery> = Vec::new();

    for caps in HEADING_RE.captures_iter(content) {
        let heading = caps[1].trim();
        if heading.is_empty() {
            continue;
        }
        let text = heading_to_question(heading);
        candidates.push(CandidateQuery {
            category: infer_category(&text),
            text,
            confidence: HEADING_CONFIDENCE,
            source: QuerySource::Heading,
        });
    }

    for caps in FAQ_RE.captures_iter(content) {
        let question = caps[1].trim();
        if question.is_empty() {
            continue;
        }
        let text = ensure_question_mark(question);
        candidates.push(CandidateQuery {
            category: infer_category(&text),
            text,
            confidence: FAQ_CONFIDENCE,
            source: QuerySource::Faq,
        });
    }

    if let Some(clause) = lead_paragraph_clause(content) {
        candidates.push(CandidateQuery {
            text: format!("What is {clause}?"),
            category: ProbeCategory::General,
            confidence: LEAD_CONFIDENCE,
            source: QuerySource::LeadParagraph,
        });
    }

    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            continue;
        }
        candidates.push(CandidateQuery {
            text: format!("What is the best {keyword}?"),
            category: ProbeCategory::BestOf,
            confidence: KEYWORD_CONFIDENCE,
            source: QuerySource::Keyword,
        });
    }

    // Rank before dedup so the higher-confidence duplicate survives. The
    // sort is stable, so equal confidences keep source order.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(normalize(&c.text)));
    candidates.truncate(max_queries);

    debug!(count = candidates.len(), "extracted probe queries");
    candidates
}

/// Convert a heading into interrogative form.
fn heading_to_question(heading: &str) -> String {
    let trimmed = heading.trim_end_matches([':', ' ']);

    if trimmed.ends_with('?') {
        return trimmed.to_string();
    }

    let lower = trimmed.to_lowercase();

    if lower.starts_with("how to ") {
        return format!("{trimmed}?");
    }

    if lower.starts_with("why ") && lower.ends_with(" matters") {
        // Preserve the original casing of the subject.
        let subject = &trimmed["why ".len()..trimmed.len() - " matters".len()];
        return format!("Why does {subject} matter?");
    }

    let first_word = lower.split_whitespace().next().unwrap_or_default();
    if QUESTION_WORDS.contains(&first_word) {
        return format!("{trimmed}?");
    }

    if heading_is_plural(trimmed) {
        format!("What are {trimmed}?")
    } else {
        format!("What is {trimmed}?")
    }
}

/// A heading reads plural when its last word ends in `s`, except `ss`/`us`
/// endings ("business", "consensus").
fn heading_is_plural(heading: &str) -> bool {
    let last = heading
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_lowercase();
    last.ends_with('s') && !last.ends_with("ss") && !last.ends_with("us")
}

fn ensure_question_mark(text: &str) -> String {
    if text.ends_with('?') {
        text.to_string()
    } else {
        format!("{text}?")
    }
}

/// Rough category inference from the question's phrasing.
fn infer_category(question: &str) -> ProbeCategory {
    let lower = question.to_lowercase();
    if lower.starts_with("how ") {
        ProbeCategory::HowTo
    } else if lower.contains(" vs ") || lower.contains("compare") {
        ProbeCategory::Comparison
    } else if lower.contains("best ") {
        ProbeCategory::BestOf
    } else {
        ProbeCategory::General
    }
}

/// The first substantive paragraph's leading clause, capped at 12 words.
fn lead_paragraph_clause(content: &str) -> Option<String> {
    for block in content.split("\n\n") {
        let block = block.trim();
        if block.is_empty() || !is_prose(block) || block.len() < 40 {
            continue;
        }

        let first_line = block.lines().next().unwrap_or_default();
        let clause = first_line
            .split_once(['.', ','])
            .map(|(head, _)| head)
            .unwrap_or(first_line);
        let clause: Vec<&str> = clause.split_whitespace().take(12).collect();
        if clause.is_empty() {
            continue;
        }
        return Some(clause.join(" "));
    }
    None
}

/// Prose paragraphs only: not headings, lists, quotes, or code fences.
fn is_prose(block: &str) -> bool {
    let first = block.trim_start();
    !(first.starts_with('#')
        || first.starts_with('-')
        || first.starts_with('*')
        || first.starts_with('>')
        || first.starts_with("```")
        || first
            .chars()
            .next()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
            && first.contains(". "))
}

/// Lowercase, punctuation-stripped, whitespace-collapsed dedup key.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
