//! Tiered lexical entity matcher.
//!
//! Four independent detection tiers, highest confidence wins:
//! URL (1.0) > exact name (0.9) > partial substring (0.7) > domain text (0.5).

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use citelens_shared::CitationType;

/// Confidence reported for a hyperlink whose host matches the entity domain.
pub const URL_CONFIDENCE: f64 = 1.0;
/// Confidence reported for a whole-word, case-insensitive name match.
pub const NAME_CONFIDENCE: f64 = 0.9;
/// Confidence reported for a substring match without word boundaries.
pub const PARTIAL_CONFIDENCE: f64 = 0.7;
/// Confidence reported for the domain string appearing without a link.
pub const DOMAIN_CONFIDENCE: f64 = 0.5;

/// Matches http(s) URLs in free text.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("valid URL regex")
});

/// Outcome of matching one entity against one response text.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMatch {
    pub cited: bool,
    pub citation_type: Option<CitationType>,
    pub confidence: f64,
}

impl EntityMatch {
    fn not_cited() -> Self {
        Self {
            cited: false,
            citation_type: None,
            confidence: 0.0,
        }
    }

    fn cited(citation_type: CitationType, confidence: f64) -> Self {
        Self {
            cited: true,
            citation_type: Some(citation_type),
            confidence,
        }
    }
}

/// Score whether `name` (optionally backed by `domain`) is referenced in
/// `text`. Total over arbitrary input: malformed or empty text yields the
/// not-cited result, never an error.
///
/// `other_entities` lists the remaining known entity names; a substring
/// occurrence of the target that exists only inside a longer known name
/// (e.g. "Salesforce" inside "Salesforce Tower") does not count for the
/// partial tier.
pub fn match_entity(
    text: &str,
    name: &str,
    domain: Option<&str>,
    other_entities: &[String],
) -> EntityMatch {
    if text.trim().is_empty() || name.trim().is_empty() {
        return EntityMatch::not_cited();
    }

    let domain = domain.map(normalize_domain).filter(|d| !d.is_empty());

    // Tier 1: hyperlink whose host matches the entity domain.
    if let Some(dom) = domain.as_deref() {
        if has_matching_link(text, dom) {
            return EntityMatch::cited(CitationType::Url, URL_CONFIDENCE);
        }
    }

    // Tier 2: whole-word, case-insensitive name match.
    if has_exact_name(text, name) {
        return EntityMatch::cited(CitationType::Name, NAME_CONFIDENCE);
    }

    // Tier 3: substring without word boundaries, disambiguated against
    // longer known entity names.
    if has_partial_name(text, name, other_entities) {
        return EntityMatch::cited(CitationType::Partial, PARTIAL_CONFIDENCE);
    }

    // Tier 4: domain string in prose, without an accompanying link.
    if let Some(dom) = domain.as_deref() {
        if has_domain_text(text, dom) {
            return EntityMatch::cited(CitationType::Domain, DOMAIN_CONFIDENCE);
        }
    }

    EntityMatch::not_cited()
}

/// Lowercase a configured domain and strip scheme/`www.` prefixes and any
/// trailing path so comparisons are host-to-host.
fn normalize_domain(domain: &str) -> String {
    let mut d = domain.trim().to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = d.strip_prefix(prefix) {
            d = rest.to_string();
        }
    }
    if let Some(rest) = d.strip_prefix("www.") {
        d = rest.to_string();
    }
    match d.split_once('/') {
        Some((host, _)) => host.to_string(),
        None => d,
    }
}

/// True when some hyperlink in `text` points at `domain` (exact host or a
/// subdomain of it).
fn has_matching_link(text: &str, domain: &str) -> bool {
    for m in URL_RE.find_iter(text) {
        // Trailing punctuation commonly trails URLs in prose.
        let raw = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        let Ok(parsed) = Url::parse(raw) else {
            continue;
        };
        let Some(host) = parsed.host_str() else {
            continue;
        };
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        if host == domain || host.ends_with(&format!(".{domain}")) {
            return true;
        }
    }
    false
}

/// Whole-word, case-insensitive match of `name`.
fn has_exact_name(text: &str, name: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(name.trim()));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        // Names made entirely of symbols defeat \b; fall back to substring.
        Err(_) => text.to_lowercase().contains(&name.trim().to_lowercase()),
    }
}

/// Substring match without word boundaries. An occurrence that lies inside a
/// longer known entity name does not count.
fn has_partial_name(text: &str, name: &str, other_entities: &[String]) -> bool {
    let text_lc = text.to_lowercase();
    let name_lc = name.trim().to_lowercase();
    if name_lc.is_empty() {
        return false;
    }

    let occurrences = occurrence_spans(&text_lc, &name_lc);
    if occurrences.is_empty() {
        return false;
    }

    // Spans of longer entity names that contain the target as a substring.
    let shadow_spans: Vec<(usize, usize)> = other_entities
        .iter()
        .map(|other| other.to_lowercase())
        .filter(|other| other.len() > name_lc.len() && other.contains(&name_lc))
        .flat_map(|other| occurrence_spans(&text_lc, &other))
        .collect();

    occurrences
        .iter()
        .any(|&(start, end)| !shadow_spans.iter().any(|&(s, e)| s <= start && end <= e))
}

/// The domain string appears in prose with no `scheme://` immediately before it.
fn has_domain_text(text: &str, domain: &str) -> bool {
    let text_lc = text.to_lowercase();
    for (start, end) in occurrence_spans(&text_lc, domain) {
        let prefix = &text_lc[..start];
        // Skip occurrences that are part of a URL or a longer hostname.
        let linked = prefix.ends_with("://") || prefix.ends_with('.');
        let in_path = text_lc[end..].starts_with('/') && prefix.ends_with("://");
        if !linked && !in_path {
            return true;
        }
    }
    false
}

/// Byte spans of every non-overlapping occurrence of `needle` in `haystack`.
fn occurrence_spans(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        spans.push((start, end));
        from = end;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_tier_wins_for_exact_https_substring() {
        // Byte-exact `https://{domain}` must always report the URL tier.
        let text = "See https://acme.example for details. Acme is great.";
        let m = match_entity(text, "Acme", Some("acme.example"), &[]);
        assert!(m.cited);
        assert_eq!(m.citation_type, Some(CitationType::Url));
        assert_eq!(m.confidence, URL_CONFIDENCE);
    }

    #[test]
    fn url_tier_matches_subdomain_and_www() {
        let m = match_entity(
            "Docs at https://www.docs.acme.example/start.",
            "Acme",
            Some("acme.example"),
            &[],
        );
        assert_eq!(m.citation_type, Some(CitationType::Url));
    }

    #[test]
    fn exact_name_whole_word() {
        let m = match_entity("We compared Acme against others.", "Acme", None, &[]);
        assert!(m.cited);
        assert_eq!(m.citation_type, Some(CitationType::Name));
        assert_eq!(m.confidence, NAME_CONFIDENCE);
    }

    #[test]
    fn exact_name_is_case_insensitive() {
        let m = match_entity("ACME leads the category.", "Acme", None, &[]);
        assert_eq!(m.citation_type, Some(CitationType::Name));
    }

    #[test]
    fn partial_match_without_boundaries() {
        let m = match_entity("Try AcmeCloud for hosting.", "Acme", None, &[]);
        assert!(m.cited);
        assert_eq!(m.citation_type, Some(CitationType::Partial));
        assert_eq!(m.confidence, PARTIAL_CONFIDENCE);
    }

    #[test]
    fn partial_shadowed_by_longer_entity_name() {
        let others = vec!["Salesforce Tower".to_string()];
        let m = match_entity(
            "The Salesforce Tower dominates the skyline.",
            "Salesforce",
            None,
            &others,
        );
        // "Salesforce" appears as a whole word here, so the exact tier fires.
        assert_eq!(m.citation_type, Some(CitationType::Name));

        let m = match_entity(
            "Visit SalesforceTowerTours for tickets.",
            "Salesforce",
            None,
            &["SalesforceTowerTours".to_string()],
        );
        assert!(!m.cited, "occurrence only inside a longer known name");
    }

    #[test]
    fn domain_text_without_link() {
        let m = match_entity(
            "People often mention acme.example in reviews.",
            "SomethingElse",
            Some("acme.example"),
            &[],
        );
        assert!(m.cited);
        assert_eq!(m.citation_type, Some(CitationType::Domain));
        assert_eq!(m.confidence, DOMAIN_CONFIDENCE);
    }

    #[test]
    fn absent_entity_reports_not_cited() {
        let m = match_entity(
            "A response about unrelated things.",
            "Acme",
            Some("acme.example"),
            &[],
        );
        assert!(!m.cited);
        assert_eq!(m.confidence, 0.0);
        assert!(m.citation_type.is_none());
    }

    #[test]
    fn empty_and_malformed_input_is_total() {
        assert!(!match_entity("", "Acme", None, &[]).cited);
        assert!(!match_entity("text", "", None, &[]).cited);
        assert!(!match_entity("\u{0000}\u{fffd} garbage \x07", "Acme", None, &[]).cited);
    }

    #[test]
    fn domain_normalization_strips_scheme_and_path() {
        assert_eq!(normalize_domain("https://www.Acme.Example/docs"), "acme.example");
        assert_eq!(normalize_domain("acme.example"), "acme.example");
    }
}
