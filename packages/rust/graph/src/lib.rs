//! libSQL citation graph (offline mode).
//!
//! The [`CitationGraph`] struct wraps a libSQL database holding canonical
//! entities, their naming variants, probe queries, append-only citation
//! events, and brand-competitor edges.
//!
//! **Access rules:**
//! - CLI: read-write (sole writer) via [`CitationGraph::open`]
//! - reporting integrations: read-only via [`CitationGraph::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{Duration, Utc};
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use tracing::instrument;

use citelens_shared::{
    CitationEvent, CiteLensError, Entity, EntityId, EntityKind, ProbeCategory, Result,
};

/// Outcome of resolving an observed name against the graph.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The name matched an entity already in the graph.
    Existing(Entity),
    /// No match; a new canonical entity was created.
    Created(Entity),
    /// The name partially matched more than one entity.
    Ambiguous { candidates: Vec<Entity> },
}

impl Resolution {
    /// The resolved entity, if the resolution was unambiguous.
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Self::Existing(e) | Self::Created(e) => Some(e),
            Self::Ambiguous { .. } => None,
        }
    }
}

/// One citation event on an entity's timeline, newest first.
#[derive(Debug, Clone)]
pub struct CitationPath {
    pub query: String,
    pub category: ProbeCategory,
    pub provider: String,
    pub cited: bool,
    pub citation_type: Option<String>,
    pub sentiment: String,
    pub position: Option<u32>,
    pub confidence: f64,
    pub occurred_at: String,
}

/// Per-provider citation totals for one entity.
#[derive(Debug, Clone)]
pub struct ProviderStats {
    pub provider: String,
    pub probes: u64,
    pub citations: u64,
}

impl ProviderStats {
    /// Citation rate in [0, 1].
    pub fn rate(&self) -> f64 {
        if self.probes == 0 {
            0.0
        } else {
            self.citations as f64 / self.probes as f64
        }
    }
}

/// Daily per-provider citation counts within a trailing window.
#[derive(Debug, Clone)]
pub struct TrendPoint {
    pub day: String,
    pub provider: String,
    pub probes: u64,
    pub citations: u64,
}

/// One naming variant attached to a canonical entity.
#[derive(Debug, Clone)]
pub struct AliasRow {
    pub name: String,
    pub provider: Option<String>,
    pub first_seen: String,
}

/// One brand-competitor edge with each side's lifetime citation count.
#[derive(Debug, Clone)]
pub struct CompetitionEdge {
    pub brand: String,
    pub competitor: String,
    pub category: String,
    pub brand_citations: u64,
    pub competitor_citations: u64,
}

/// Primary graph handle wrapping a libSQL database.
pub struct CitationGraph {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl CitationGraph {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CiteLensError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let graph = Self {
            db,
            conn,
            readonly: false,
        };
        graph.run_migrations().await?;
        Ok(graph)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    CiteLensError::Graph(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CiteLensError::Graph(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Entity resolution
    // -----------------------------------------------------------------------

    /// Resolve an observed `name` against the graph.
    ///
    /// Exact matches (canonical name or alias, case-insensitive) win. A
    /// single partial match attaches `name` as an alias of that entity.
    /// Multiple partial matches report ambiguity without writing. No match
    /// creates a new canonical entity.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn resolve_entity(
        &self,
        name: &str,
        kind: EntityKind,
        domain: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Resolution> {
        self.check_writable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CiteLensError::parse("cannot resolve an empty entity name"));
        }

        if let Some(entity) = self.exact_match(name).await? {
            self.attach_alias(&entity, name, provider).await?;
            self.backfill_domain(&entity, domain).await?;
            return Ok(Resolution::Existing(entity));
        }

        let candidates = self.partial_candidates(name).await?;
        match candidates.len() {
            0 => {
                let entity = self.create_entity(name, kind, domain).await?;
                Ok(Resolution::Created(entity))
            }
            1 => {
                let entity = candidates.into_iter().next().expect("one candidate");
                self.attach_alias(&entity, name, provider).await?;
                Ok(Resolution::Existing(entity))
            }
            _ => Ok(Resolution::Ambiguous { candidates }),
        }
    }

    /// Resolve for ingest: ambiguity breaks toward the candidate with the
    /// longest canonical name, so "Salesforce CRM" prefers "Salesforce CRM"
    /// over "Salesforce" when both match.
    pub async fn resolve_for_ingest(
        &self,
        name: &str,
        kind: EntityKind,
        domain: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Entity> {
        match self.resolve_entity(name, kind, domain, provider).await? {
            Resolution::Existing(e) | Resolution::Created(e) => Ok(e),
            Resolution::Ambiguous { candidates } => {
                let entity = candidates
                    .into_iter()
                    .max_by_key(|e| e.canonical_name.len())
                    .ok_or_else(|| CiteLensError::Graph("empty ambiguity set".into()))?;
                self.attach_alias(&entity, name, provider).await?;
                Ok(entity)
            }
        }
    }

    /// Look up an entity by canonical name or alias without writing.
    pub async fn find_entity(&self, name: &str) -> Result<Option<Entity>> {
        self.exact_match(name.trim()).await
    }

    async fn exact_match(&self, name: &str) -> Result<Option<Entity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, canonical_name, kind, domain FROM entities
                 WHERE canonical_name = ?1 COLLATE NOCASE",
                params![name],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        if let Ok(Some(row)) = rows.next().await {
            return Ok(Some(row_to_entity(&row)?));
        }

        let mut rows = self
            .conn
            .query(
                "SELECT e.id, e.canonical_name, e.kind, e.domain
                 FROM entities e JOIN entity_aliases a ON a.entity_id = e.id
                 WHERE a.name = ?1 COLLATE NOCASE",
                params![name],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        if let Ok(Some(row)) = rows.next().await {
            return Ok(Some(row_to_entity(&row)?));
        }
        Ok(None)
    }

    /// Entities whose canonical name contains `name` as whole words, or
    /// vice versa. Plain substring matching would merge "Sales" into
    /// "Salesforce", so containment is checked at word granularity.
    async fn partial_candidates(&self, name: &str) -> Result<Vec<Entity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, canonical_name, kind, domain FROM entities
                 WHERE instr(lower(canonical_name), lower(?1)) > 0
                    OR instr(lower(?1), lower(canonical_name)) > 0
                 ORDER BY canonical_name",
                params![name],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let mut candidates = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let entity = row_to_entity(&row)?;
            if words_contained(name, &entity.canonical_name)
                || words_contained(&entity.canonical_name, name)
            {
                candidates.push(entity);
            }
        }
        Ok(candidates)
    }

    async fn create_entity(
        &self,
        name: &str,
        kind: EntityKind,
        domain: Option<&str>,
    ) -> Result<Entity> {
        let id = EntityId::new();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO entities (id, canonical_name, kind, domain, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), name, kind.as_str(), domain, now.as_str()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        Ok(Entity {
            id,
            canonical_name: name.to_string(),
            kind,
            domain: domain.map(str::to_string),
        })
    }

    /// Record the observed literal as an alias when it differs from the
    /// canonical spelling. Duplicate literals are ignored.
    async fn attach_alias(
        &self,
        entity: &Entity,
        name: &str,
        provider: Option<&str>,
    ) -> Result<()> {
        if name == entity.canonical_name {
            return Ok(());
        }
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT OR IGNORE INTO entity_aliases (entity_id, name, provider, first_seen)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entity.id.to_string(), name, provider, now.as_str()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        Ok(())
    }

    async fn backfill_domain(&self, entity: &Entity, domain: Option<&str>) -> Result<()> {
        let Some(domain) = domain else {
            return Ok(());
        };
        self.conn
            .execute(
                "UPDATE entities SET domain = ?1 WHERE id = ?2 AND domain IS NULL",
                params![domain, entity.id.to_string()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries and events
    // -----------------------------------------------------------------------

    /// Upsert a probe query. The id is a hash of the normalized text, so
    /// the same question never registers twice.
    pub async fn upsert_query(&self, text: &str, category: ProbeCategory) -> Result<String> {
        self.check_writable()?;
        let id = query_id(text);
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT OR IGNORE INTO queries (id, text, category, first_asked)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), text, category.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        Ok(id)
    }

    /// Ingest one citation event, resolving the observed entity name and
    /// registering the query as needed.
    #[instrument(skip(self, event), fields(entity = %event.entity_name, provider = %event.provider))]
    pub async fn record_citation(&self, event: &CitationEvent) -> Result<EntityId> {
        self.check_writable()?;
        let entity = self
            .resolve_for_ingest(
                &event.entity_name,
                EntityKind::Brand,
                None,
                Some(&event.provider),
            )
            .await?;
        let query_id = self
            .upsert_query(&event.query.text, event.query.category)
            .await?;

        self.conn
            .execute(
                "INSERT INTO citation_events
                 (id, entity_id, query_id, provider, cited, citation_type, sentiment,
                  position, confidence, occurred_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event.id.as_str(),
                    entity.id.to_string(),
                    query_id.as_str(),
                    event.provider.as_str(),
                    event.cited as i64,
                    event.citation_type.map(|t| t.as_str()),
                    event.sentiment.as_str(),
                    event.position.map(i64::from),
                    event.confidence,
                    event.occurred_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        Ok(entity.id)
    }

    /// Record a brand-competitor edge for a category. Re-recording the
    /// same triple is a no-op.
    pub async fn record_competition(
        &self,
        brand: &str,
        competitor: &str,
        category: ProbeCategory,
    ) -> Result<()> {
        self.check_writable()?;
        let brand = self
            .resolve_for_ingest(brand, EntityKind::Brand, None, None)
            .await?;
        let competitor = self
            .resolve_for_ingest(competitor, EntityKind::Brand, None, None)
            .await?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT OR IGNORE INTO competition_edges
                 (brand_id, competitor_id, category, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    brand.id.to_string(),
                    competitor.id.to_string(),
                    category.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------------

    /// An entity's citation timeline, newest first.
    pub async fn citation_paths(&self, entity: &str, limit: u32) -> Result<Vec<CitationPath>> {
        let Some(entity) = self.find_entity(entity).await? else {
            return Ok(Vec::new());
        };
        let mut rows = self
            .conn
            .query(
                "SELECT q.text, q.category, e.provider, e.cited, e.citation_type,
                        e.sentiment, e.position, e.confidence, e.occurred_at
                 FROM citation_events e JOIN queries q ON q.id = e.query_id
                 WHERE e.entity_id = ?1
                 ORDER BY e.occurred_at DESC
                 LIMIT ?2",
                params![entity.id.to_string(), limit],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let mut paths = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            paths.push(CitationPath {
                query: row
                    .get::<String>(0)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                category: ProbeCategory::parse(&row.get::<String>(1).unwrap_or_default()),
                provider: row
                    .get::<String>(2)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                cited: row.get::<i64>(3).unwrap_or(0) != 0,
                citation_type: row.get::<String>(4).ok(),
                sentiment: row.get::<String>(5).unwrap_or_default(),
                position: row.get::<i64>(6).ok().map(|p| p as u32),
                confidence: row.get::<f64>(7).unwrap_or(0.0),
                occurred_at: row.get::<String>(8).unwrap_or_default(),
            });
        }
        Ok(paths)
    }

    /// Per-provider probe and citation totals for one entity.
    pub async fn provider_breakdown(&self, entity: &str) -> Result<Vec<ProviderStats>> {
        let Some(entity) = self.find_entity(entity).await? else {
            return Ok(Vec::new());
        };
        let mut rows = self
            .conn
            .query(
                "SELECT provider, COUNT(*), SUM(cited)
                 FROM citation_events
                 WHERE entity_id = ?1
                 GROUP BY provider
                 ORDER BY provider",
                params![entity.id.to_string()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let mut stats = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            stats.push(ProviderStats {
                provider: row
                    .get::<String>(0)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                probes: row.get::<i64>(1).unwrap_or(0) as u64,
                citations: row.get::<i64>(2).unwrap_or(0) as u64,
            });
        }
        Ok(stats)
    }

    /// Daily per-provider counts over the trailing `days` window, oldest
    /// day first.
    pub async fn citation_trend(&self, entity: &str, days: u32) -> Result<Vec<TrendPoint>> {
        let Some(entity) = self.find_entity(entity).await? else {
            return Ok(Vec::new());
        };
        let cutoff = (Utc::now() - Duration::days(i64::from(days))).to_rfc3339();
        let mut rows = self
            .conn
            .query(
                "SELECT substr(occurred_at, 1, 10) AS day, provider, COUNT(*), SUM(cited)
                 FROM citation_events
                 WHERE entity_id = ?1 AND occurred_at >= ?2
                 GROUP BY day, provider
                 ORDER BY day, provider",
                params![entity.id.to_string(), cutoff.as_str()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let mut points = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            points.push(TrendPoint {
                day: row
                    .get::<String>(0)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                provider: row
                    .get::<String>(1)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                probes: row.get::<i64>(2).unwrap_or(0) as u64,
                citations: row.get::<i64>(3).unwrap_or(0) as u64,
            });
        }
        Ok(points)
    }

    /// All naming variants recorded for one entity.
    pub async fn aliases(&self, entity: &str) -> Result<Vec<AliasRow>> {
        let Some(entity) = self.find_entity(entity).await? else {
            return Ok(Vec::new());
        };
        let mut rows = self
            .conn
            .query(
                "SELECT name, provider, first_seen FROM entity_aliases
                 WHERE entity_id = ?1 ORDER BY first_seen",
                params![entity.id.to_string()],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let mut aliases = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            aliases.push(AliasRow {
                name: row
                    .get::<String>(0)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                provider: row.get::<String>(1).ok(),
                first_seen: row.get::<String>(2).unwrap_or_default(),
            });
        }
        Ok(aliases)
    }

    /// All competition edges, annotated with each side's lifetime citation
    /// count.
    pub async fn competition_edges(&self) -> Result<Vec<CompetitionEdge>> {
        let mut rows = self
            .conn
            .query(
                "SELECT b.canonical_name, c.canonical_name, ce.category,
                        (SELECT COALESCE(SUM(cited), 0) FROM citation_events WHERE entity_id = ce.brand_id),
                        (SELECT COALESCE(SUM(cited), 0) FROM citation_events WHERE entity_id = ce.competitor_id)
                 FROM competition_edges ce
                 JOIN entities b ON b.id = ce.brand_id
                 JOIN entities c ON c.id = ce.competitor_id
                 ORDER BY b.canonical_name, c.canonical_name, ce.category",
                params![],
            )
            .await
            .map_err(|e| CiteLensError::Graph(e.to_string()))?;

        let mut edges = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            edges.push(CompetitionEdge {
                brand: row
                    .get::<String>(0)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                competitor: row
                    .get::<String>(1)
                    .map_err(|e| CiteLensError::Graph(e.to_string()))?,
                category: row.get::<String>(2).unwrap_or_default(),
                brand_citations: row.get::<i64>(3).unwrap_or(0) as u64,
                competitor_citations: row.get::<i64>(4).unwrap_or(0) as u64,
            });
        }
        Ok(edges)
    }
}

/// Whether `needle`'s words appear as a contiguous run within `haystack`'s
/// words, case-insensitively.
fn words_contained(needle: &str, haystack: &str) -> bool {
    let needle: Vec<String> = needle.split_whitespace().map(str::to_lowercase).collect();
    let haystack: Vec<String> = haystack.split_whitespace().map(str::to_lowercase).collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Stable query identifier: SHA-256 of the lowercased, whitespace-collapsed
/// text.
pub fn query_id(text: &str) -> String {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert a database row to an [`Entity`].
fn row_to_entity(row: &libsql::Row) -> Result<Entity> {
    let id: String = row
        .get(0)
        .map_err(|e| CiteLensError::Graph(e.to_string()))?;
    Ok(Entity {
        id: id
            .parse()
            .map_err(|e| CiteLensError::Graph(format!("invalid entity id: {e}")))?,
        canonical_name: row
            .get::<String>(1)
            .map_err(|e| CiteLensError::Graph(e.to_string()))?,
        kind: EntityKind::parse(&row.get::<String>(2).unwrap_or_default()),
        domain: row.get::<String>(3).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use citelens_shared::{CitationType, Query, Sentiment};
    use uuid::Uuid;

    async fn test_graph() -> CitationGraph {
        let tmp = std::env::temp_dir().join(format!("citelens_test_{}.db", Uuid::now_v7()));
        CitationGraph::open(&tmp).await.expect("open test db")
    }

    fn event(entity: &str, provider: &str, cited: bool) -> CitationEvent {
        CitationEvent {
            id: Uuid::now_v7().to_string(),
            entity_name: entity.into(),
            provider: provider.into(),
            query: Query::new("best CRM tools", ProbeCategory::BestOf),
            cited,
            citation_type: cited.then_some(CitationType::Name),
            sentiment: Sentiment::Neutral,
            position: cited.then_some(2),
            confidence: if cited { 0.9 } else { 0.0 },
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let graph = test_graph().await;
        assert_eq!(graph.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("citelens_test_{}.db", Uuid::now_v7()));
        let g1 = CitationGraph::open(&tmp).await.expect("first open");
        drop(g1);
        let g2 = CitationGraph::open(&tmp).await.expect("second open");
        assert_eq!(g2.schema_version().await, 1);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let graph = test_graph().await;

        let first = graph
            .resolve_entity("Salesforce", EntityKind::Brand, None, Some("openrouter"))
            .await
            .expect("resolve");
        let Resolution::Created(created) = first else {
            panic!("expected creation");
        };

        let second = graph
            .resolve_entity("Salesforce", EntityKind::Brand, None, Some("openrouter"))
            .await
            .expect("resolve again");
        let Resolution::Existing(existing) = second else {
            panic!("expected existing");
        };
        assert_eq!(created.id, existing.id);

        // The canonical spelling never registers as its own alias.
        let aliases = graph.aliases("Salesforce").await.expect("aliases");
        assert!(aliases.is_empty());
    }

    #[tokio::test]
    async fn naming_variants_collapse_to_one_entity() {
        let graph = test_graph().await;

        let a = graph
            .resolve_for_ingest("Salesforce", EntityKind::Brand, None, Some("openrouter"))
            .await
            .expect("first variant");
        let b = graph
            .resolve_for_ingest("salesforce", EntityKind::Brand, None, Some("perplexity"))
            .await
            .expect("second variant");
        let c = graph
            .resolve_for_ingest("Salesforce CRM", EntityKind::Brand, None, Some("openrouter"))
            .await
            .expect("third variant");

        assert_eq!(a.id, b.id);
        assert_eq!(a.id, c.id);

        let aliases = graph.aliases("Salesforce").await.expect("aliases");
        let names: Vec<&str> = aliases.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"salesforce"));
        assert!(names.contains(&"Salesforce CRM"));
    }

    #[tokio::test]
    async fn ambiguity_breaks_toward_longest_name() {
        let graph = test_graph().await;
        graph
            .resolve_for_ingest("HubSpot CRM", EntityKind::Brand, None, None)
            .await
            .expect("first entity");
        let long = graph
            .resolve_for_ingest("HubSpot Marketing Hub", EntityKind::Brand, None, None)
            .await
            .expect("second entity");

        // "HubSpot" partially matches both entities.
        let resolved = graph
            .resolve_entity("HubSpot", EntityKind::Brand, None, None)
            .await
            .expect("resolve");
        assert!(matches!(resolved, Resolution::Ambiguous { .. }));

        let ingested = graph
            .resolve_for_ingest("HubSpot", EntityKind::Brand, None, None)
            .await
            .expect("ingest");
        assert_eq!(ingested.id, long.id);
    }

    #[tokio::test]
    async fn unrelated_word_prefix_creates_a_new_entity() {
        let graph = test_graph().await;
        let sales = graph
            .resolve_for_ingest("Sales", EntityKind::Brand, None, None)
            .await
            .expect("sales");
        let resolved = graph
            .resolve_entity("Salesforce", EntityKind::Brand, None, None)
            .await
            .expect("resolve");
        let Resolution::Created(salesforce) = resolved else {
            panic!("expected a new entity, not a merge into \"Sales\"");
        };
        assert_ne!(sales.id, salesforce.id);
    }

    #[tokio::test]
    async fn citation_events_flow_into_analytics() {
        let graph = test_graph().await;

        graph
            .record_citation(&event("Acme", "openrouter", true))
            .await
            .expect("cited event");
        graph
            .record_citation(&event("Acme", "openrouter", false))
            .await
            .expect("uncited event");
        graph
            .record_citation(&event("acme", "perplexity", true))
            .await
            .expect("variant event");

        let paths = graph.citation_paths("Acme", 10).await.expect("paths");
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].query, "best CRM tools");

        let breakdown = graph.provider_breakdown("Acme").await.expect("breakdown");
        assert_eq!(breakdown.len(), 2);
        let openrouter = breakdown
            .iter()
            .find(|s| s.provider == "openrouter")
            .expect("openrouter stats");
        assert_eq!(openrouter.probes, 2);
        assert_eq!(openrouter.citations, 1);
        assert!((openrouter.rate() - 0.5).abs() < 1e-9);

        let trend = graph.citation_trend("Acme", 7).await.expect("trend");
        assert_eq!(trend.len(), 2);
        assert_eq!(trend.iter().map(|p| p.probes).sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn same_query_registers_once() {
        let graph = test_graph().await;
        let a = graph
            .upsert_query("Best CRM tools", ProbeCategory::BestOf)
            .await
            .expect("first");
        let b = graph
            .upsert_query("best  CRM   tools", ProbeCategory::BestOf)
            .await
            .expect("second");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn competition_edges_are_idempotent() {
        let graph = test_graph().await;
        graph
            .record_citation(&event("Acme", "openrouter", true))
            .await
            .expect("brand event");

        for _ in 0..2 {
            graph
                .record_competition("Acme", "HubSpot", ProbeCategory::BestOf)
                .await
                .expect("edge");
        }

        let edges = graph.competition_edges().await.expect("edges");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].brand, "Acme");
        assert_eq!(edges[0].competitor, "HubSpot");
        assert_eq!(edges[0].brand_citations, 1);
        assert_eq!(edges[0].competitor_citations, 0);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("citelens_test_{}.db", Uuid::now_v7()));
        let rw = CitationGraph::open(&tmp).await.expect("open rw");
        rw.resolve_for_ingest("Acme", EntityKind::Brand, None, None)
            .await
            .expect("seed");
        drop(rw);

        let ro = CitationGraph::open_readonly(&tmp).await.expect("open ro");
        let result = ro
            .resolve_entity("Other", EntityKind::Brand, None, None)
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn unknown_entity_yields_empty_analytics() {
        let graph = test_graph().await;
        assert!(graph.citation_paths("Nobody", 10).await.expect("paths").is_empty());
        assert!(graph.provider_breakdown("Nobody").await.expect("breakdown").is_empty());
        assert!(graph.aliases("Nobody").await.expect("aliases").is_empty());
    }
}
