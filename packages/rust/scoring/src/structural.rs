//! Structural-heuristics score: a synchronous, point-based rubric over the
//! content body. Pure function of the text content — every check scans the
//! whole body, so reordering markdown sections cannot change the score.

use std::sync::LazyLock;

use regex::Regex;

use citelens_shared::{STRUCTURAL_WEIGHT, ScoreFactor, StructuralScore};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+\S").expect("valid heading regex"));

static FAQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)(^#{1,6}\s+.*(faq|frequently asked))|(^\s*q[:.]\s)").expect("valid FAQ regex")
});

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*([-*]|\d+[.)])\s+\S").expect("valid list regex"));

static DIRECT_ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(is|are|refers to|means|helps)\b").expect("valid answer regex")
});

/// Compute the structural sub-score for `content`, clamped to [0, 100].
pub fn score_structural(content: &str, keywords: &[String], brand_name: &str) -> StructuralScore {
    let words = word_count(content);
    let mut factors = Vec::with_capacity(9);

    // Schema markup presence.
    let has_schema = ["application/ld+json", "schema.org", "itemscope"]
        .iter()
        .any(|marker| content.contains(marker));
    factors.push(flag_factor("schema_markup", has_schema, 15.0));

    // FAQ section.
    factors.push(flag_factor("faq_section", FAQ_RE.is_match(content), 10.0));

    // H2/H3 headings, +5 each, capped at 3.
    let headings = HEADING_RE.find_iter(content).count();
    factors.push(ScoreFactor {
        name: "headings".into(),
        points: (headings.min(3) as f64) * 5.0,
        max_points: 15.0,
        detail: format!("{headings} H2/H3 headings"),
    });

    // A paragraph that opens with a direct, definitional answer.
    factors.push(flag_factor(
        "direct_answer",
        has_direct_answer(content),
        15.0,
    ));

    // Structured list presence.
    factors.push(flag_factor("list", LIST_RE.is_match(content), 5.0));

    // Keyword density, ideal band 1–3%.
    let density = keyword_density(content, keywords, words);
    factors.push(ScoreFactor {
        name: "keyword_density".into(),
        points: density_points(density),
        max_points: 10.0,
        detail: format!("{density:.2}% (ideal 1-3%)"),
    });

    // Brand mentions, ideal band 2–6, +2.5 per mention capped at +5.
    let mentions = whole_word_count(content, brand_name);
    factors.push(ScoreFactor {
        name: "brand_mentions".into(),
        points: (mentions as f64 * 2.5).min(5.0),
        max_points: 5.0,
        detail: format!("{mentions} mentions (ideal 2-6)"),
    });

    // Word count, ideal band 800–2000.
    factors.push(ScoreFactor {
        name: "word_count".into(),
        points: word_count_points(words),
        max_points: 15.0,
        detail: format!("{words} words (ideal 800-2000)"),
    });

    // Flesch-Kincaid grade, ideal band 8–12.
    let grade = fk_grade(content);
    factors.push(ScoreFactor {
        name: "readability".into(),
        points: readability_points(grade),
        max_points: 10.0,
        detail: format!("grade {grade:.1} (ideal 8-12)"),
    });

    let score = factors
        .iter()
        .map(|f| f.points)
        .sum::<f64>()
        .clamp(0.0, 100.0);

    StructuralScore {
        score,
        weight: STRUCTURAL_WEIGHT,
        factors,
    }
}

fn flag_factor(name: &str, present: bool, max_points: f64) -> ScoreFactor {
    ScoreFactor {
        name: name.into(),
        points: if present { max_points } else { 0.0 },
        max_points,
        detail: if present { "present" } else { "missing" }.into(),
    }
}

/// Some prose paragraph opens with a definitional first sentence.
fn has_direct_answer(content: &str) -> bool {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty() && is_prose(block))
        .any(|block| {
            let first_sentence = block
                .split_once(['.', '!', '?'])
                .map(|(head, _)| head)
                .unwrap_or(block);
            let opening: Vec<&str> = first_sentence.split_whitespace().take(30).collect();
            DIRECT_ANSWER_RE.is_match(&opening.join(" "))
        })
}

fn is_prose(block: &str) -> bool {
    let first = block.trim_start();
    !(first.starts_with('#')
        || first.starts_with('-')
        || first.starts_with('*')
        || first.starts_with('>')
        || first.starts_with("```"))
}

fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Case-insensitive whole-word occurrences of `name`.
fn whole_word_count(content: &str, name: &str) -> usize {
    let name = name.trim();
    if name.is_empty() {
        return 0;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.find_iter(content).count(),
        Err(_) => 0,
    }
}

/// Total keyword occurrences as a percentage of total words.
fn keyword_density(content: &str, keywords: &[String], words: usize) -> f64 {
    if words == 0 || keywords.is_empty() {
        return 0.0;
    }
    let content_lc = content.to_lowercase();
    let occurrences: usize = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .map(|k| content_lc.matches(&k).count())
        .sum();
    (occurrences as f64 / words as f64) * 100.0
}

/// +10 inside the 1–3% band, linear partial credit outside.
fn density_points(density: f64) -> f64 {
    if (1.0..=3.0).contains(&density) {
        10.0
    } else if density < 1.0 {
        10.0 * density
    } else {
        (10.0 - (density - 3.0) * 2.5).max(0.0)
    }
}

/// +15 inside the 800–2000 band, linear partial credit outside.
fn word_count_points(words: usize) -> f64 {
    let words = words as f64;
    if (800.0..=2000.0).contains(&words) {
        15.0
    } else if words < 800.0 {
        15.0 * (words / 800.0)
    } else {
        (15.0 * (1.0 - (words - 2000.0) / 2000.0)).max(0.0)
    }
}

/// +10 inside the grade 8–12 band, −2 per grade of distance outside.
fn readability_points(grade: f64) -> f64 {
    if (8.0..=12.0).contains(&grade) {
        10.0
    } else {
        let distance = if grade < 8.0 { 8.0 - grade } else { grade - 12.0 };
        (10.0 - 2.0 * distance).max(0.0)
    }
}

/// Flesch-Kincaid grade level over the whole body.
fn fk_grade(content: &str) -> f64 {
    let words: Vec<&str> = content
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    let sentences = content
        .split(['.', '!', '?'])
        .filter(|s| s.split_whitespace().any(|w| w.chars().any(char::is_alphabetic)))
        .count()
        .max(1);

    let syllables: usize = words.iter().map(|w| syllable_estimate(w)).sum();

    0.39 * (words.len() as f64 / sentences as f64)
        + 11.8 * (syllables as f64 / words.len() as f64)
        - 15.59
}

/// Vowel-group syllable estimate; every word counts at least one.
fn syllable_estimate(word: &str) -> usize {
    let mut count = 0;
    let mut prev_vowel = false;
    for c in word.to_lowercase().chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    count.max(1)
}
