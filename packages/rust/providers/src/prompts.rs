//! Probe category → prompt template mapping.
//!
//! A pure function; the template strings are part of the external contract
//! and must stay byte-stable.

use citelens_shared::ProbeCategory;

/// Build the provider prompt for a query in the given category.
pub fn prompt_for(category: ProbeCategory, query: &str) -> String {
    match category {
        ProbeCategory::BestOf => format!("What are the best {query}?"),
        ProbeCategory::Comparison => format!("Compare the leading {query}."),
        ProbeCategory::Recommendation => format!("What would you recommend for {query}?"),
        ProbeCategory::HowTo => format!("How do I choose {query}?"),
        ProbeCategory::General => query.to_string(),
    }
}
