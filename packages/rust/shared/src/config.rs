//! Application configuration for CiteLens.
//!
//! User config lives at `~/.citelens/citelens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CiteLensError, Result};
use crate::types::EntitySpec;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "citelens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".citelens";

/// Default citation graph database file name.
const GRAPH_DB_NAME: &str = "citelens.db";

// ---------------------------------------------------------------------------
// Config structs (matching citelens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// The brand under analysis and its competitive set.
    #[serde(default)]
    pub brand: BrandConfig,

    /// Cost/volume budget consulted before each provider call.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Configured answer-engine providers.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum probe questions extracted from one piece of content.
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// Providers used by citation validation (cheapest-first).
    #[serde(default = "default_validation_providers")]
    pub validation_providers: usize,

    /// Concurrent provider calls per probe batch.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Trailing window for citation-trend analytics, in days.
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_queries: default_max_queries(),
            validation_providers: default_validation_providers(),
            probe_concurrency: default_probe_concurrency(),
            trend_window_days: default_trend_window_days(),
        }
    }
}

fn default_max_queries() -> usize {
    5
}
fn default_validation_providers() -> usize {
    3
}
fn default_probe_concurrency() -> usize {
    4
}
fn default_trend_window_days() -> u32 {
    30
}

/// `[brand]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Brand name to detect in responses.
    #[serde(default)]
    pub name: String,

    /// Brand website domain (enables URL-tier detection).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Competitors to detect alongside the brand.
    #[serde(default)]
    pub competitors: Vec<EntitySpec>,

    /// Keywords the brand wants to be cited for.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl BrandConfig {
    /// The brand as an [`EntitySpec`] for the probe layer.
    pub fn spec(&self) -> EntitySpec {
        EntitySpec {
            name: self.name.clone(),
            domain: self.domain.clone(),
        }
    }
}

/// `[budget]` section — the shared-resource gate consulted before each
/// provider call. A veto is treated like a provider failure (skip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum provider calls in one run.
    #[serde(default = "default_max_probes")]
    pub max_probes_per_run: u32,

    /// Maximum spend in USD in one run.
    #[serde(default = "default_max_cost")]
    pub max_cost_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_probes_per_run: default_max_probes(),
            max_cost_usd: default_max_cost(),
        }
    }
}

fn default_max_probes() -> u32 {
    60
}
fn default_max_cost() -> f64 {
    1.0
}

/// `[[providers]]` entry — one answer-engine backend speaking the
/// OpenAI-compatible chat-completions protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name used in events, analytics, and logs.
    pub name: String,

    /// Chat-completions base URL (e.g. `https://openrouter.ai/api/v1`).
    pub base_url: String,

    /// Model identifier sent in the request body.
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    pub api_key_env: String,

    /// Whether this provider participates in probes.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cost preference order; lower is cheaper. Citation validation picks
    /// the lowest ranks first.
    #[serde(default)]
    pub cost_rank: u32,

    /// USD per 1K input tokens, for cost accounting.
    #[serde(default)]
    pub cost_per_1k_input: f64,

    /// USD per 1K output tokens, for cost accounting.
    #[serde(default)]
    pub cost_per_1k_output: f64,
}

fn default_true() -> bool {
    true
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        name: "openrouter".into(),
        base_url: "https://openrouter.ai/api/v1".into(),
        model: "moonshotai/kimi-k2.5".into(),
        api_key_env: "OPENROUTER_API_KEY".into(),
        enabled: true,
        cost_rank: 1,
        cost_per_1k_input: 0.0005,
        cost_per_1k_output: 0.002,
    }]
}

// ---------------------------------------------------------------------------
// Probe config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime probe configuration — the typed merge of config-file values and
/// explicit CLI overrides.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Maximum queries extracted per content body.
    pub max_queries: usize,
    /// Providers used by citation validation.
    pub validation_providers: usize,
    /// Concurrent provider calls per probe batch.
    pub probe_concurrency: usize,
}

/// Optional overrides applied on top of [`AppConfig`] (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct ProbeOverrides {
    pub max_queries: Option<usize>,
    pub validation_providers: Option<usize>,
    pub probe_concurrency: Option<usize>,
}

impl ProbeConfig {
    /// Merge defaults from `config` with explicit `overrides`.
    pub fn merged(config: &AppConfig, overrides: &ProbeOverrides) -> Self {
        Self {
            max_queries: overrides.max_queries.unwrap_or(config.defaults.max_queries),
            validation_providers: overrides
                .validation_providers
                .unwrap_or(config.defaults.validation_providers),
            probe_concurrency: overrides
                .probe_concurrency
                .unwrap_or(config.defaults.probe_concurrency),
        }
    }
}

impl From<&AppConfig> for ProbeConfig {
    fn from(config: &AppConfig) -> Self {
        Self::merged(config, &ProbeOverrides::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.citelens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CiteLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.citelens/citelens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Default path of the citation graph database (`~/.citelens/citelens.db`).
pub fn graph_db_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(GRAPH_DB_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CiteLensError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CiteLensError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CiteLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig {
        providers: default_providers(),
        ..AppConfig::default()
    };
    let content =
        toml::to_string_pretty(&config).map_err(|e| CiteLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CiteLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that every enabled provider's API key env var is set and non-empty.
pub fn validate_provider_keys(config: &AppConfig) -> Result<()> {
    for provider in config.providers.iter().filter(|p| p.enabled) {
        let var_name = &provider.api_key_env;
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {}
            _ => {
                return Err(CiteLensError::config(format!(
                    "API key for provider `{}` not found. Set the {var_name} environment variable.",
                    provider.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig {
            providers: default_providers(),
            ..AppConfig::default()
        };
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_queries"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_queries, 5);
        assert_eq!(parsed.defaults.validation_providers, 3);
        assert_eq!(parsed.budget.max_probes_per_run, 60);
    }

    #[test]
    fn config_with_brand_and_providers() {
        let toml_str = r#"
[brand]
name = "Acme CRM"
domain = "acme.example"
keywords = ["crm software"]

[[brand.competitors]]
name = "Salesforce"
domain = "salesforce.com"

[[providers]]
name = "perplexity"
base_url = "https://api.perplexity.ai"
model = "sonar"
api_key_env = "PERPLEXITY_API_KEY"
cost_rank = 2
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.brand.name, "Acme CRM");
        assert_eq!(config.brand.competitors.len(), 1);
        assert_eq!(config.providers.len(), 1);
        assert!(config.providers[0].enabled);
        assert_eq!(config.brand.spec().domain.as_deref(), Some("acme.example"));
    }

    #[test]
    fn probe_config_merge_applies_overrides() {
        let app = AppConfig::default();
        let merged = ProbeConfig::merged(
            &app,
            &ProbeOverrides {
                max_queries: Some(2),
                ..ProbeOverrides::default()
            },
        );
        assert_eq!(merged.max_queries, 2);
        assert_eq!(merged.validation_providers, 3);
        assert_eq!(merged.probe_concurrency, 4);
    }

    #[test]
    fn provider_key_validation() {
        let mut config = AppConfig {
            providers: default_providers(),
            ..AppConfig::default()
        };
        // Use a unique env var name to avoid interfering with other tests
        config.providers[0].api_key_env = "CL_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_provider_keys(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key"));

        config.providers[0].enabled = false;
        validate_provider_keys(&config).expect("disabled providers are not checked");
    }
}
