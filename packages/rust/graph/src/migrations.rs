//! SQL migration definitions for the citation graph database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: entities, aliases, queries, citation_events, competition_edges",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Canonical entities. Created on first mention, never deleted.
CREATE TABLE IF NOT EXISTS entities (
    id             TEXT PRIMARY KEY,
    canonical_name TEXT NOT NULL,
    kind           TEXT NOT NULL,
    domain         TEXT,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(canonical_name COLLATE NOCASE);

-- Naming variants observed in provider responses
CREATE TABLE IF NOT EXISTS entity_aliases (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id  TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    provider   TEXT,
    first_seen TEXT NOT NULL,
    UNIQUE(entity_id, name)
);

CREATE INDEX IF NOT EXISTS idx_aliases_name ON entity_aliases(name COLLATE NOCASE);

-- Probe questions, keyed by a hash of the normalized text
CREATE TABLE IF NOT EXISTS queries (
    id          TEXT PRIMARY KEY,
    text        TEXT NOT NULL,
    category    TEXT NOT NULL,
    first_asked TEXT NOT NULL
);

-- Append-only detection results
CREATE TABLE IF NOT EXISTS citation_events (
    id            TEXT PRIMARY KEY,
    entity_id     TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    query_id      TEXT NOT NULL REFERENCES queries(id) ON DELETE CASCADE,
    provider      TEXT NOT NULL,
    cited         INTEGER NOT NULL,
    citation_type TEXT,
    sentiment     TEXT NOT NULL,
    position      INTEGER,
    confidence    REAL NOT NULL,
    occurred_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON citation_events(entity_id, occurred_at);
CREATE INDEX IF NOT EXISTS idx_events_query ON citation_events(query_id);

-- Brand-competitor relationships observed per category
CREATE TABLE IF NOT EXISTS competition_edges (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    brand_id      TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    competitor_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    category      TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    UNIQUE(brand_id, competitor_id, category)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
