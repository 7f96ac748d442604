//! Shared types, error model, and configuration for CiteLens.
//!
//! This crate is the foundation depended on by all other CiteLens crates.
//! It provides:
//! - [`CiteLensError`] — the unified error type
//! - Domain types ([`Entity`], [`Query`], [`CitationEvent`], [`ProbeResult`], [`AeoScore`])
//! - Configuration ([`AppConfig`], [`ProbeConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrandConfig, BudgetConfig, DefaultsConfig, ProbeConfig, ProbeOverrides,
    ProviderConfig, config_dir, config_file_path, graph_db_path, init_config, load_config,
    load_config_from, validate_provider_keys,
};
pub use error::{CiteLensError, Result};
pub use types::{
    AeoScore, CitationAnalysis, CitationEvent, CitationType, CitationValidationScore,
    CompetitiveGapScore, Entity, EntityId, EntityKind, EntitySpec, Priority, ProbeCategory,
    ProbeResult, ProviderFailure, Query, Recommendation, ScoreFactor, Sentiment, StructuralScore,
    CITATION_WEIGHT, COMPETITIVE_WEIGHT, STRUCTURAL_WEIGHT,
};
