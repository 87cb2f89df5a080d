//! SQLite backend with FTS5 candidate lookup.
//!
//! Uses a single SQLite database file with two tables:
//! - `interactions`: the stored (query, response) pairs
//! - `interactions_fts`: FTS5 index over the stored queries
//!
//! FTS5 narrows a session's interactions down to those sharing at least one
//! term with the new question; the final relevance score is computed by
//! [`rank_interactions`] so it matches every other backend.

use async_trait::async_trait;
use chrono::Utc;
use hybridrag_core::error::MemoryError;
use hybridrag_core::memory::{ConversationMemory, Interaction, MemoryQuery, rank_interactions};
use hybridrag_core::source::Provenance;
use hybridrag_core::text;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Candidates fetched from FTS5 before scoring.
const CANDIDATE_LIMIT: i64 = 200;

/// SQLite conversation memory.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) a SQLite database.
    ///
    /// Accepts a file path or a `sqlite:` URL. Pass `"sqlite::memory:"`
    /// for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let backend = Self { pool };
        backend.run_migrations().await?;
        info!("SQLite memory backend initialized at {path}");
        Ok(backend)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let backend = Self { pool };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Create the tables, FTS5 index and sync triggers.
    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT UNIQUE NOT NULL,
                session_id  TEXT NOT NULL,
                query       TEXT NOT NULL,
                response    TEXT NOT NULL,
                source      TEXT,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("interactions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS interactions_fts USING fts5(
                query,
                content='interactions',
                content_rowid='iid',
                tokenize='unicode61'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("FTS5 table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS interactions_ai AFTER INSERT ON interactions BEGIN
                INSERT INTO interactions_fts(rowid, query) VALUES (new.iid, new.query);
            END
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("insert trigger: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS interactions_ad AFTER DELETE ON interactions BEGIN
                INSERT INTO interactions_fts(interactions_fts, rowid, query)
                VALUES ('delete', old.iid, old.query);
            END
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("delete trigger: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_interactions_session ON interactions(session_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("session index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse an `Interaction` from a SQLite row.
    fn row_to_interaction(row: &sqlx::sqlite::SqliteRow) -> Result<Interaction, MemoryError> {
        let column = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let session_id: String = row.try_get("session_id").map_err(|e| column("session_id", e))?;
        let query: String = row.try_get("query").map_err(|e| column("query", e))?;
        let response: String = row.try_get("response").map_err(|e| column("response", e))?;
        let source: Option<String> = row.try_get("source").map_err(|e| column("source", e))?;
        let created_at_str: String = row.try_get("created_at").map_err(|e| column("created_at", e))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Interaction {
            id,
            session_id,
            query,
            response,
            source: source.as_deref().and_then(Provenance::parse),
            created_at,
            score: 0.0,
        })
    }

    /// Build an FTS5 query matching any content term of `text`.
    ///
    /// Each term is quoted so user input can't inject FTS5 syntax.
    fn fts_query(text: &str) -> String {
        text::terms(text)
            .into_iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

#[async_trait]
impl ConversationMemory for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, mut interaction: Interaction) -> Result<String, MemoryError> {
        if interaction.id.is_empty() {
            interaction.id = Uuid::new_v4().to_string();
        }

        sqlx::query(
            r#"
            INSERT INTO interactions (id, session_id, query, response, source, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&interaction.id)
        .bind(&interaction.session_id)
        .bind(&interaction.query)
        .bind(&interaction.response)
        .bind(interaction.source.map(|p| p.as_str()))
        .bind(interaction.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;

        debug!(session = %interaction.session_id, id = %interaction.id, "Stored interaction");
        Ok(interaction.id)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<Interaction>, MemoryError> {
        let fts_query = Self::fts_query(&query.text);
        if fts_query.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query(
            r#"
            SELECT i.*
            FROM interactions_fts f
            JOIN interactions i ON i.iid = f.rowid
            WHERE interactions_fts MATCH ?1 AND i.session_id = ?2
            ORDER BY bm25(interactions_fts)
            LIMIT ?3
            "#,
        )
        .bind(&fts_query)
        .bind(&query.session_id)
        .bind(CANDIDATE_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("FTS5 search: {e}")))?;

        let candidates = rows
            .iter()
            .map(Self::row_to_interaction)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank_interactions(candidates, &query))
    }

    async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Interaction>, MemoryError> {
        // LIMIT -1 means no limit in SQLite.
        let limit = limit.map_or(-1, |n| n as i64);
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM interactions WHERE session_id = ?1 ORDER BY iid DESC LIMIT ?2
            ) ORDER BY iid ASC
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("history: {e}")))?;

        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM interactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, session_id: Option<&str>) -> Result<usize, MemoryError> {
        let row = match session_id {
            Some(s) => {
                sqlx::query("SELECT COUNT(*) AS cnt FROM interactions WHERE session_id = ?1")
                    .bind(s)
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS cnt FROM interactions")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| MemoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }

    async fn clear(&self, session_id: Option<&str>) -> Result<(), MemoryError> {
        match session_id {
            Some(s) => {
                sqlx::query("DELETE FROM interactions WHERE session_id = ?1")
                    .bind(s)
                    .execute(&self.pool)
                    .await
            }
            None => sqlx::query("DELETE FROM interactions").execute(&self.pool).await,
        }
        .map_err(|e| MemoryError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(())
    }
}
