//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use uuid::Uuid;

use citelens_competitive::CompetitiveReport;
use citelens_graph::CitationGraph;
use citelens_probe::{ProbeBatch, ProbeOrchestrator};
use citelens_providers::{AnswerProvider, CostBudget, ProviderRegistry, StaticProvider};
use citelens_scoring::{ValidationConfig, score_content, score_structural};
use citelens_shared::{
    AeoScore, AppConfig, CitationEvent, ProbeCategory, ProbeConfig, ProbeOverrides, ProbeResult,
    Query, graph_db_path, init_config, load_config, validate_provider_keys,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CiteLens — measure and grow your brand's presence in AI answers.
#[derive(Parser)]
#[command(
    name = "citelens",
    version,
    about = "Probe AI answer engines, score content citability, and track the citation graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Initialize the config file with defaults.
    Init,

    /// List configured providers and their key status.
    Providers,

    /// Score a content file for AI citability.
    Score {
        /// Path to the content file (markdown or plain text).
        file: PathBuf,

        /// Only run the structural heuristics; no provider calls.
        #[arg(long)]
        structural_only: bool,

        /// Use canned responses instead of live providers.
        #[arg(long)]
        dry_run: bool,

        /// Maximum probe questions extracted from the content.
        #[arg(long)]
        max_queries: Option<usize>,

        /// Emit the full score as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Send one question to every enabled provider.
    Probe {
        /// The question to ask.
        query: String,

        /// Prompt category: best-of, comparison, recommendation, how-to, general.
        #[arg(short, long, default_value = "general")]
        category: String,

        /// Emit results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a competitive analysis across the configured competitor set.
    Compare {
        /// File with one probe question per line ("category: text" prefixes
        /// are honored). Defaults to questions built from brand keywords.
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Daily citation counts for an entity over a trailing window.
    Trend {
        /// Entity name (canonical or alias).
        entity: String,

        /// Window size in days (defaults to config).
        #[arg(long)]
        days: Option<u32>,
    },

    /// An entity's citation timeline, newest first.
    Paths {
        /// Entity name (canonical or alias).
        entity: String,

        /// Maximum events to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Naming variants recorded for an entity.
    Aliases {
        /// Entity name (canonical or alias).
        entity: String,
    },

    /// Per-provider citation totals for an entity.
    Breakdown {
        /// Entity name (canonical or alias).
        entity: String,
    },

    /// Brand-competitor edges with lifetime citation counts.
    Edges,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "citelens=info",
        1 => "citelens=debug",
        _ => "citelens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => cmd_init().await,
        Command::Providers => cmd_providers().await,
        Command::Score {
            file,
            structural_only,
            dry_run,
            max_queries,
            json,
        } => cmd_score(&file, structural_only, dry_run, max_queries, json).await,
        Command::Probe {
            query,
            category,
            json,
        } => cmd_probe(&query, &category, json).await,
        Command::Compare { queries, json } => cmd_compare(queries.as_deref(), json).await,
        Command::Trend { entity, days } => cmd_trend(&entity, days).await,
        Command::Paths { entity, limit } => cmd_paths(&entity, limit).await,
        Command::Aliases { entity } => cmd_aliases(&entity).await,
        Command::Breakdown { entity } => cmd_breakdown(&entity).await,
        Command::Edges => cmd_edges().await,
    }
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Load config and check the brand is configured.
fn load_checked_config() -> Result<AppConfig> {
    let config = load_config()?;
    if config.brand.name.trim().is_empty() {
        return Err(eyre!(
            "no brand configured. Run `citelens init` and set [brand] name in the config file."
        ));
    }
    Ok(config)
}

/// Build the orchestrator for live probing, with the run budget installed.
fn live_orchestrator(config: &AppConfig, probe_cfg: &ProbeConfig) -> Result<ProbeOrchestrator> {
    validate_provider_keys(config)?;
    let registry = ProviderRegistry::from_config(config)?;
    let gate = Arc::new(CostBudget::from_config(&config.budget));
    Ok(ProbeOrchestrator::new(registry)
        .with_gate(gate)
        .with_concurrency(probe_cfg.probe_concurrency))
}

/// Build an orchestrator over canned responses that mention the brand and
/// the first competitor, so the full pipeline runs without network access.
fn dry_run_orchestrator(config: &AppConfig, probe_cfg: &ProbeConfig) -> ProbeOrchestrator {
    let competitor = config
        .brand
        .competitors
        .first()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "a competitor".to_string());
    let canned = format!(
        "1. {}\n2. {}\n\nBoth are solid options; {} is a popular recommended pick.",
        config.brand.name, competitor, config.brand.name
    );
    let registry = ProviderRegistry::new(vec![
        Arc::new(StaticProvider::new("dry-run", &canned)) as Arc<dyn AnswerProvider>,
    ]);
    ProbeOrchestrator::new(registry).with_concurrency(probe_cfg.probe_concurrency)
}

async fn open_graph() -> Result<CitationGraph> {
    let path = graph_db_path()?;
    Ok(CitationGraph::open(&path).await?)
}

/// Ingest probe results into the graph: one citation event per observed
/// entity, plus a competition edge for every brand/competitor pair probed
/// in the query's category.
async fn ingest_results(
    graph: &CitationGraph,
    results: &[ProbeResult],
    brand_name: &str,
) -> Result<usize> {
    let mut events = 0usize;
    for result in results {
        let query = Query::new(result.query.clone(), result.category);

        graph
            .record_citation(&CitationEvent {
                id: Uuid::now_v7().to_string(),
                entity_name: brand_name.to_string(),
                provider: result.provider.clone(),
                query: query.clone(),
                cited: result.brand.cited,
                citation_type: result.brand.citation_type,
                sentiment: result.brand.sentiment,
                position: result.brand.position,
                confidence: result.brand.confidence,
                occurred_at: Utc::now(),
            })
            .await?;
        events += 1;

        for (name, analysis) in &result.competitors {
            graph
                .record_citation(&CitationEvent {
                    id: Uuid::now_v7().to_string(),
                    entity_name: name.clone(),
                    provider: result.provider.clone(),
                    query: query.clone(),
                    cited: analysis.cited,
                    citation_type: analysis.citation_type,
                    sentiment: analysis.sentiment,
                    position: analysis.position,
                    confidence: analysis.confidence,
                    occurred_at: Utc::now(),
                })
                .await?;
            events += 1;

            // Every probed brand/competitor pair gets an edge for the
            // category, cited or not; the insert is idempotent.
            graph
                .record_competition(brand_name, name, result.category)
                .await?;
        }
    }
    Ok(events)
}

/// Spinner shown while providers are being probed.
fn spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(msg.to_string());
    spinner
}

fn parse_category(s: &str) -> Result<ProbeCategory> {
    match s {
        "best-of" | "comparison" | "recommendation" | "how-to" | "general" => {
            Ok(ProbeCategory::parse(s))
        }
        other => Err(eyre!(
            "unknown category '{other}': expected best-of, comparison, recommendation, how-to, or general"
        )),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    println!("Set [brand] name and your provider API keys to get started.");
    Ok(())
}

async fn cmd_providers() -> Result<()> {
    let config = load_config()?;
    if config.providers.is_empty() {
        println!("No providers configured. Run `citelens init`.");
        return Ok(());
    }

    println!();
    for provider in &config.providers {
        let key_status = match std::env::var(&provider.api_key_env) {
            Ok(v) if !v.is_empty() => "key set",
            _ => "key missing",
        };
        let state = if provider.enabled { "enabled" } else { "disabled" };
        println!(
            "  {:<14} {:<9} rank {}  {}  ({}: {})",
            provider.name, state, provider.cost_rank, provider.model, provider.api_key_env,
            key_status
        );
    }
    println!();
    Ok(())
}

async fn cmd_score(
    file: &Path,
    structural_only: bool,
    dry_run: bool,
    max_queries: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_checked_config()?;
    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;

    let brand = config.brand.spec();
    let keywords = config.brand.keywords.clone();

    if structural_only {
        let structural = score_structural(&content, &keywords, &brand.name);
        if json {
            println!("{}", serde_json::to_string_pretty(&structural)?);
        } else {
            print_structural(&structural);
        }
        return Ok(());
    }

    let probe_cfg = ProbeConfig::merged(
        &config,
        &ProbeOverrides {
            max_queries,
            ..ProbeOverrides::default()
        },
    );
    let orchestrator = if dry_run {
        dry_run_orchestrator(&config, &probe_cfg)
    } else {
        live_orchestrator(&config, &probe_cfg)?
    };
    let validation = ValidationConfig {
        max_queries: probe_cfg.max_queries,
        max_providers: probe_cfg.validation_providers,
    };

    info!(file = %file.display(), dry_run, "scoring content");
    let progress = spinner("Probing answer engines...");
    let score = score_content(
        &content,
        &keywords,
        &brand,
        &config.brand.competitors,
        &orchestrator,
        &validation,
    )
    .await;
    progress.finish_and_clear();

    if !dry_run {
        let graph = open_graph().await?;
        let events = ingest_results(&graph, &score.citation.probe_results, &brand.name).await?;
        info!(events, "recorded citation events");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        print_score(&score);
    }
    Ok(())
}

async fn cmd_probe(query: &str, category: &str, json: bool) -> Result<()> {
    let config = load_checked_config()?;
    let category = parse_category(category)?;
    let probe_cfg = ProbeConfig::from(&config);
    let orchestrator = live_orchestrator(&config, &probe_cfg)?;

    let progress = spinner("Probing answer engines...");
    let batch = orchestrator
        .probe(query, category, &config.brand.spec(), &config.brand.competitors)
        .await?;
    progress.finish_and_clear();

    let graph = open_graph().await?;
    let events = ingest_results(&graph, &batch.results, &config.brand.name).await?;
    info!(events, "recorded citation events");

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "results": batch.results,
                "failures": batch.failures,
            }))?
        );
    } else {
        print_batch(&batch);
    }
    Ok(())
}

async fn cmd_compare(queries_file: Option<&Path>, json: bool) -> Result<()> {
    let config = load_checked_config()?;
    let queries = match queries_file {
        Some(path) => read_queries_file(path)?,
        None => keyword_queries(&config),
    };
    if queries.is_empty() {
        return Err(eyre!(
            "no queries to run. Provide --queries or configure [brand] keywords."
        ));
    }
    if config.brand.competitors.is_empty() {
        return Err(eyre!(
            "no competitors configured. Add [[brand.competitors]] entries to the config file."
        ));
    }

    let probe_cfg = ProbeConfig::from(&config);
    let orchestrator = live_orchestrator(&config, &probe_cfg)?;

    let progress = spinner(&format!("Probing {} queries...", queries.len()));
    let (results, failures) = citelens_competitive::collect(
        &config.brand.spec(),
        &config.brand.competitors,
        &queries,
        &orchestrator,
    )
    .await?;
    progress.finish_and_clear();

    let graph = open_graph().await?;
    let events = ingest_results(&graph, &results, &config.brand.name).await?;
    info!(events, "recorded citation events");

    let report = citelens_competitive::build_report(
        &results,
        failures,
        &config.brand.name,
        &config.brand.competitors,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn cmd_trend(entity: &str, days: Option<u32>) -> Result<()> {
    let config = load_config()?;
    let days = days.unwrap_or(config.defaults.trend_window_days);
    let graph = open_graph().await?;
    let points = graph.citation_trend(entity, days).await?;
    if points.is_empty() {
        println!("No citation events for '{entity}' in the last {days} days.");
        return Ok(());
    }

    println!();
    println!("  Citation trend for '{entity}' (last {days} days):");
    for point in points {
        println!(
            "  {}  {:<14} {:>3} probes, {:>3} citations",
            point.day, point.provider, point.probes, point.citations
        );
    }
    println!();
    Ok(())
}

async fn cmd_paths(entity: &str, limit: u32) -> Result<()> {
    let graph = open_graph().await?;
    let paths = graph.citation_paths(entity, limit).await?;
    if paths.is_empty() {
        println!("No citation events for '{entity}'.");
        return Ok(());
    }

    println!();
    for path in paths {
        let outcome = if path.cited {
            format!(
                "cited ({}, {:.2}{})",
                path.citation_type.as_deref().unwrap_or("unknown"),
                path.confidence,
                path.position
                    .map(|p| format!(", #{p}"))
                    .unwrap_or_default()
            )
        } else {
            "not cited".to_string()
        };
        println!(
            "  {}  [{:<14}] {:<10} \"{}\" — {}",
            path.occurred_at, path.category, path.provider, path.query, outcome
        );
    }
    println!();
    Ok(())
}

async fn cmd_aliases(entity: &str) -> Result<()> {
    let graph = open_graph().await?;
    let Some(canonical) = graph.find_entity(entity).await? else {
        println!("No entity found for '{entity}'.");
        return Ok(());
    };
    let aliases = graph.aliases(entity).await?;

    println!();
    println!("  Canonical: {}", canonical.canonical_name);
    if aliases.is_empty() {
        println!("  No aliases recorded.");
    }
    for alias in aliases {
        println!(
            "  alias \"{}\"  (first seen {}{})",
            alias.name,
            alias.first_seen,
            alias
                .provider
                .map(|p| format!(" via {p}"))
                .unwrap_or_default()
        );
    }
    println!();
    Ok(())
}

async fn cmd_breakdown(entity: &str) -> Result<()> {
    let graph = open_graph().await?;
    let stats = graph.provider_breakdown(entity).await?;
    if stats.is_empty() {
        println!("No citation events for '{entity}'.");
        return Ok(());
    }

    println!();
    println!("  Provider breakdown for '{entity}':");
    for s in stats {
        println!(
            "  {:<14} {:>4} probes, {:>4} citations ({:.0}%)",
            s.provider,
            s.probes,
            s.citations,
            s.rate() * 100.0
        );
    }
    println!();
    Ok(())
}

async fn cmd_edges() -> Result<()> {
    let graph = open_graph().await?;
    let edges = graph.competition_edges().await?;
    if edges.is_empty() {
        println!("No competition edges recorded yet.");
        return Ok(());
    }

    println!();
    for edge in edges {
        println!(
            "  {} vs {} [{}]  {} / {} citations",
            edge.brand, edge.competitor, edge.category, edge.brand_citations,
            edge.competitor_citations
        );
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Query files
// ---------------------------------------------------------------------------

/// One query per line; a known category prefix ("best-of: ...") sets the
/// category, everything else is general. Blank lines and # comments skip.
fn read_queries_file(path: &Path) -> Result<Vec<Query>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;

    let mut queries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (category, text) = match line.split_once(':') {
            Some((head, rest))
                if matches!(
                    head.trim(),
                    "best-of" | "comparison" | "recommendation" | "how-to" | "general"
                ) =>
            {
                (ProbeCategory::parse(head.trim()), rest.trim())
            }
            _ => (ProbeCategory::General, line),
        };
        if !text.is_empty() {
            queries.push(Query::new(text, category));
        }
    }
    Ok(queries)
}

/// Default comparison queries built from the brand's keywords.
fn keyword_queries(config: &AppConfig) -> Vec<Query> {
    config
        .brand
        .keywords
        .iter()
        .map(|kw| Query::new(format!("What is the best {kw}?"), ProbeCategory::BestOf))
        .collect()
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_structural(structural: &citelens_shared::StructuralScore) {
    println!();
    println!("  Structural score: {:.1}/100", structural.score);
    for factor in &structural.factors {
        println!(
            "    {:<16} {:>5.1}/{:<4.0} {}",
            factor.name, factor.points, factor.max_points, factor.detail
        );
    }
    println!();
}

fn print_score(score: &AeoScore) {
    println!();
    println!("  AEO Score: {}/100", score.overall);
    println!();
    println!(
        "  Structural   (x{:.1}): {:.1}",
        score.structural.weight, score.structural.score
    );
    for factor in &score.structural.factors {
        println!(
            "    {:<16} {:>5.1}/{:<4.0} {}",
            factor.name, factor.points, factor.max_points, factor.detail
        );
    }
    println!();
    println!(
        "  Citation     (x{:.1}): {:.1}  ({} results, {} provider failures)",
        score.citation.weight,
        score.citation.score,
        score.citation.probe_results.len(),
        score.citation.failures.len()
    );
    for failure in &score.citation.failures {
        println!("    skipped {}: {}", failure.provider, failure.reason);
    }
    println!();
    println!(
        "  Competitive  (x{:.1}): {:.1}",
        score.competitive.weight, score.competitive.score
    );
    println!(
        "    You: {:.0}% vs competitor avg {:.0}%{}",
        score.competitive.your_rate,
        score.competitive.competitor_avg_rate,
        score
            .competitive
            .top_competitor
            .as_deref()
            .map(|t| format!(" (top: {t})"))
            .unwrap_or_default()
    );
    println!("    {}", score.competitive.gap_analysis);

    if !score.recommendations.is_empty() {
        println!();
        println!("  Recommendations:");
        for rec in &score.recommendations {
            println!(
                "    [{}] {}: {}",
                rec.priority.as_str(),
                rec.category,
                rec.message
            );
        }
    }
    println!();
}

fn print_batch(batch: &ProbeBatch) {
    println!();
    for result in &batch.results {
        println!(
            "  {} ({}, {}ms, ${:.4})",
            result.provider, result.model, result.latency_ms, result.cost_usd
        );
        if result.brand.cited {
            println!(
                "    cited: yes ({}, confidence {:.2}{}, sentiment {})",
                result
                    .brand
                    .citation_type
                    .map(|t| t.as_str())
                    .unwrap_or("unknown"),
                result.brand.confidence,
                result
                    .brand
                    .position
                    .map(|p| format!(", position {p}"))
                    .unwrap_or_default(),
                result.brand.sentiment.as_str()
            );
        } else {
            println!("    cited: no");
        }
        let cited: Vec<&str> = result
            .competitors
            .iter()
            .filter(|(_, a)| a.cited)
            .map(|(name, _)| name.as_str())
            .collect();
        if !cited.is_empty() {
            println!("    competitors cited: {}", cited.join(", "));
        }
    }
    for failure in &batch.failures {
        println!("  {} failed: {}", failure.provider, failure.reason);
    }
    println!();
}

fn print_report(report: &CompetitiveReport) {
    println!();
    println!(
        "  Competitive report ({} probes, {} provider failures)",
        report.total_probes,
        report.failures.len()
    );
    println!();
    print_profile(&report.brand, true);
    for competitor in &report.competitors {
        print_profile(competitor, false);
    }

    if !report.insights.is_empty() {
        println!("  Insights:");
        for insight in &report.insights {
            println!("    [{:?}] {}", insight.kind, insight.message);
        }
        println!();
    }
    if !report.recommendations.is_empty() {
        println!("  Recommendations:");
        for rec in &report.recommendations {
            println!("    - {rec}");
        }
        println!();
    }
}

fn print_profile(profile: &citelens_competitive::EntityProfile, is_brand: bool) {
    let marker = if is_brand { " (you)" } else { "" };
    println!(
        "  {:<20}{} {:.0}% cited{}, sentiment {}",
        profile.name,
        marker,
        profile.citation_rate * 100.0,
        profile
            .avg_position
            .map(|p| format!(", avg position {p:.1}"))
            .unwrap_or_default(),
        profile.dominant_sentiment.as_str()
    );
    if !profile.strong_categories.is_empty() {
        let strong: Vec<String> = profile
            .strong_categories
            .iter()
            .map(|c| c.to_string())
            .collect();
        println!("    strong in: {}", strong.join(", "));
    }
    if !profile.weak_categories.is_empty() {
        let weak: Vec<String> = profile
            .weak_categories
            .iter()
            .map(|c| c.to_string())
            .collect();
        println!("    weak in: {}", weak.join(", "));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use citelens_shared::{CitationAnalysis, CitationType, EntitySpec, Sentiment};

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("citelens_test_{}.db", Uuid::now_v7()))
    }

    fn analysis(cited: bool) -> CitationAnalysis {
        CitationAnalysis {
            cited,
            citation_type: cited.then_some(CitationType::Name),
            confidence: if cited { 0.9 } else { 0.0 },
            sentiment: Sentiment::Neutral,
            position: None,
            competitors_cited: Vec::new(),
        }
    }

    fn probe_result(brand_cited: bool, competitor: &str, competitor_cited: bool) -> ProbeResult {
        ProbeResult {
            query: "best CRM tools".into(),
            category: ProbeCategory::BestOf,
            provider: "static".into(),
            response_text: String::new(),
            model: "static".into(),
            cost_usd: 0.0,
            latency_ms: 0,
            brand: analysis(brand_cited),
            competitors: BTreeMap::from([(competitor.to_string(), analysis(competitor_cited))]),
        }
    }

    #[tokio::test]
    async fn ingest_records_edges_for_uncited_competitors() {
        let tmp = temp_db();
        let graph = CitationGraph::open(&tmp).await.expect("open graph");

        let results = vec![probe_result(true, "HubSpot", false)];
        let events = ingest_results(&graph, &results, "Acme")
            .await
            .expect("ingest");
        assert_eq!(events, 2);

        // Probed together in the category, so the edge exists even though
        // the competitor was never cited.
        let edges = graph.competition_edges().await.expect("edges");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].brand, "Acme");
        assert_eq!(edges[0].competitor, "HubSpot");
        assert_eq!(edges[0].competitor_citations, 0);
    }

    #[tokio::test]
    async fn compare_evidence_flows_into_the_graph() {
        let tmp = temp_db();
        let graph = CitationGraph::open(&tmp).await.expect("open graph");

        let registry = ProviderRegistry::new(vec![Arc::new(StaticProvider::new(
            "canned",
            "1. Acme\n2. HubSpot",
        )) as Arc<dyn AnswerProvider>]);
        let orchestrator = ProbeOrchestrator::new(registry);

        let (results, failures) = citelens_competitive::collect(
            &EntitySpec::new("Acme"),
            &[EntitySpec::new("HubSpot")],
            &[Query::new("CRM tools", ProbeCategory::BestOf)],
            &orchestrator,
        )
        .await
        .expect("collect");
        assert!(failures.is_empty());

        let events = ingest_results(&graph, &results, "Acme")
            .await
            .expect("ingest");
        assert_eq!(events, 2);

        let stats = graph.provider_breakdown("Acme").await.expect("breakdown");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].probes, 1);
        assert_eq!(stats[0].citations, 1);
        assert!(!graph.competition_edges().await.expect("edges").is_empty());
    }
}
