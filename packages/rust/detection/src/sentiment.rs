//! Sentence-window sentiment for brand mentions.
//!
//! Lexicon-based: positive/negative marker words within the sentence that
//! contains the mention. Defaults to neutral.

use citelens_shared::Sentiment;

const POSITIVE_MARKERS: &[&str] = &[
    "best",
    "leading",
    "excellent",
    "top",
    "great",
    "recommended",
    "popular",
    "powerful",
    "reliable",
    "trusted",
    "outstanding",
    "favorite",
    "strong",
    "robust",
    "innovative",
];

const NEGATIVE_MARKERS: &[&str] = &[
    "worst",
    "avoid",
    "poor",
    "weak",
    "expensive",
    "outdated",
    "limited",
    "lacking",
    "difficult",
    "complicated",
    "unreliable",
    "disappointing",
    "overpriced",
    "clunky",
];

/// Sentiment of the sentence containing byte offset `mention_at` in `text`.
/// Out-of-range offsets degrade to neutral.
pub fn sentence_sentiment(text: &str, mention_at: usize) -> Sentiment {
    if text.is_empty() || mention_at >= text.len() || !text.is_char_boundary(mention_at) {
        return Sentiment::Neutral;
    }

    let start = text[..mention_at]
        .rfind(['.', '!', '?', '\n'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = text[mention_at..]
        .find(['.', '!', '?', '\n'])
        .map(|i| mention_at + i + 1)
        .unwrap_or(text.len());

    let sentence = text[start..end].to_lowercase();
    let positives = POSITIVE_MARKERS
        .iter()
        .filter(|m| sentence.contains(*m))
        .count();
    let negatives = NEGATIVE_MARKERS
        .iter()
        .filter(|m| sentence.contains(*m))
        .count();

    if positives > negatives {
        Sentiment::Positive
    } else if negatives > positives {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_markers_in_sentence() {
        let text = "Acme is the best CRM for small teams. Others exist too.";
        let at = text.find("Acme").expect("mention");
        assert_eq!(sentence_sentiment(text, at), Sentiment::Positive);
    }

    #[test]
    fn negative_markers_in_sentence() {
        let text = "Many find Acme overpriced and clunky. The rest is fine.";
        let at = text.find("Acme").expect("mention");
        assert_eq!(sentence_sentiment(text, at), Sentiment::Negative);
    }

    #[test]
    fn neutral_by_default() {
        let text = "Acme was founded in 2004. It sells software.";
        let at = text.find("Acme").expect("mention");
        assert_eq!(sentence_sentiment(text, at), Sentiment::Neutral);
    }

    #[test]
    fn window_is_limited_to_the_sentence() {
        let text = "The best tools vary. Acme ships a CRM. Avoid vendor lock-in.";
        let at = text.find("Acme").expect("mention");
        // "best" and "avoid" live in neighboring sentences.
        assert_eq!(sentence_sentiment(text, at), Sentiment::Neutral);
    }

    #[test]
    fn out_of_range_offset_is_neutral() {
        assert_eq!(sentence_sentiment("", 0), Sentiment::Neutral);
        assert_eq!(sentence_sentiment("short", 99), Sentiment::Neutral);
    }

    #[test]
    fn mid_character_offset_is_neutral_not_a_panic() {
        // Offset 1 is inside the two-byte `é`.
        assert_eq!(sentence_sentiment("élan is the best", 1), Sentiment::Neutral);
    }
}
