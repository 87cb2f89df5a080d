//! PostgreSQL conversation memory backend.
//!
//! Candidates are selected with `ILIKE ANY` over the session's stored
//! questions (one pattern per content term), then scored with
//! [`rank_interactions`] like every other backend.
//!
//! # Feature gate
//!
//! ```toml
//! hybridrag-memory = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use hybridrag_core::error::MemoryError;
use hybridrag_core::memory::{ConversationMemory, Interaction, MemoryQuery, rank_interactions};
use hybridrag_core::source::Provenance;
use hybridrag_core::text;

const CANDIDATE_LIMIT: i64 = 200;

const MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS interactions (
    iid         BIGSERIAL PRIMARY KEY,
    id          TEXT UNIQUE NOT NULL,
    session_id  TEXT NOT NULL,
    query       TEXT NOT NULL,
    response    TEXT NOT NULL,
    source      TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_interactions_session ON interactions(session_id, iid);
"#;

/// PostgreSQL conversation memory.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect and run the schema migration.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, MemoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| MemoryError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        info!("Connected to PostgreSQL for memory backend");
        let backend = Self { pool };
        backend.migrate().await?;
        Ok(backend)
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `interactions` table if missing.
    pub async fn migrate(&self) -> Result<(), MemoryError> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::MigrationFailed(format!("Migration failed: {e}")))?;

        debug!("Memory schema migration complete");
        Ok(())
    }

    /// `ILIKE` patterns for each content term. Terms are alphanumeric, so
    /// they never contain LIKE wildcards.
    fn like_patterns(text: &str) -> Vec<String> {
        text::terms(text).into_iter().map(|t| format!("%{t}%")).collect()
    }

    fn row_to_interaction(row: &PgRow) -> Result<Interaction, MemoryError> {
        let column = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name} column: {e}"));

        let source: Option<String> = row.try_get("source").map_err(|e| column("source", e))?;
        let created_at: DateTime<Utc> =
            row.try_get("created_at").map_err(|e| column("created_at", e))?;

        Ok(Interaction {
            id: row.try_get("id").map_err(|e| column("id", e))?,
            session_id: row.try_get("session_id").map_err(|e| column("session_id", e))?,
            query: row.try_get("query").map_err(|e| column("query", e))?,
            response: row.try_get("response").map_err(|e| column("response", e))?,
            source: source.as_deref().and_then(Provenance::parse),
            created_at,
            score: 0.0,
        })
    }
}

#[async_trait]
impl ConversationMemory for PostgresBackend {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn append(&self, mut interaction: Interaction) -> Result<String, MemoryError> {
        if interaction.id.is_empty() {
            interaction.id = Uuid::new_v4().to_string();
        }

        sqlx::query(
            r#"
            INSERT INTO interactions (id, session_id, query, response, source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&interaction.id)
        .bind(&interaction.session_id)
        .bind(&interaction.query)
        .bind(&interaction.response)
        .bind(interaction.source.map(|p| p.as_str()))
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;

        Ok(interaction.id)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<Interaction>, MemoryError> {
        let patterns = Self::like_patterns(&query.text);
        if patterns.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query(
            r#"
            SELECT * FROM interactions
            WHERE session_id = $1 AND query ILIKE ANY($2)
            ORDER BY iid DESC
            LIMIT $3
            "#,
        )
        .bind(&query.session_id)
        .bind(&patterns)
        .bind(CANDIDATE_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Candidate search: {e}")))?;

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
        // LIMIT NULL means no limit in PostgreSQL.
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM interactions WHERE session_id = $1 ORDER BY iid DESC LIMIT $2
            ) recent ORDER BY iid ASC
            "#,
        )
        .bind(session_id)
        .bind(limit.map(|n| n as i64))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("history: {e}")))?;

        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM interactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, session_id: Option<&str>) -> Result<usize, MemoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM interactions WHERE $1::TEXT IS NULL OR session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }

    async fn clear(&self, session_id: Option<&str>) -> Result<(), MemoryError> {
        sqlx::query("DELETE FROM interactions WHERE $1::TEXT IS NULL OR session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(())
    }
}
