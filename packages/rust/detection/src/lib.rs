//! Lexical citation detection for answer-engine responses.
//!
//! Two layers:
//! - [`match_entity`] — the tiered matcher scoring one entity against one text
//! - [`analyze_response`] — brand + competitors over a whole response, with
//!   sentiment, ordered-list position, and co-citation tracking
//!
//! Detection is lexical/heuristic by design; both layers are total functions
//! over arbitrary text and never fail on malformed input.

mod detector;
mod matcher;
mod sentiment;

pub use detector::{ResponseAnalysis, analyze_response, detect_entity, list_position};
pub use matcher::{
    DOMAIN_CONFIDENCE, EntityMatch, NAME_CONFIDENCE, PARTIAL_CONFIDENCE, URL_CONFIDENCE,
    match_entity,
};
pub use sentiment::sentence_sentiment;
