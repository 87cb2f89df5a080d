//! PostgreSQL + pgvector knowledge store.
//!
//! Similarity is `1 - (embedding <=> query)`, pgvector's cosine distance
//! turned into cosine similarity.
//!
//! # Setup
//!
//! ```sql
//! CREATE EXTENSION IF NOT EXISTS vector;
//! ```
//!
//! The table itself is created by [`PgVectorStore::create`].

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::{debug, info};

use hybridrag_core::document::{Document, ScoredDocument};
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::knowledge::KnowledgeStore;

pub struct PgVectorStore {
    pool: PgPool,
    table: String,
    dimensions: usize,
}

impl PgVectorStore {
    /// Connect to PostgreSQL. The table name must be a plain identifier.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        table: &str,
        dimensions: usize,
    ) -> Result<Self, KnowledgeError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        info!(table, "Connected to PostgreSQL for knowledge base");
        Self::from_pool(pool, table, dimensions)
    }

    pub fn from_pool(pool: PgPool, table: &str, dimensions: usize) -> Result<Self, KnowledgeError> {
        validate_identifier(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
            dimensions,
        })
    }

    fn to_document(row: &PgRow) -> Result<Document, KnowledgeError> {
        let column = |name: &str, e: sqlx::Error| KnowledgeError::QueryFailed(format!("{name} column: {e}"));

        let metadata: String = row.try_get("metadata").map_err(|e| column("metadata", e))?;
        let embedding: Option<String> = row.try_get("embedding").map_err(|e| column("embedding", e))?;

        Ok(Document {
            id: row.try_get("id").map_err(|e| column("id", e))?,
            name: row.try_get("name").map_err(|e| column("name", e))?,
            content: row.try_get("content").map_err(|e| column("content", e))?,
            metadata: serde_json::from_str(&metadata).unwrap_or_default(),
            content_hash: row.try_get("content_hash").map_err(|e| column("content_hash", e))?,
            embedding: embedding.as_deref().and_then(parse_vector),
        })
    }

    async fn write(&self, documents: Vec<Document>, upsert: bool) -> Result<usize, KnowledgeError> {
        let conflict = if upsert {
            "ON CONFLICT (id) DO UPDATE SET name = excluded.name, content = excluded.content, \
             metadata = excluded.metadata, content_hash = excluded.content_hash, \
             embedding = excluded.embedding"
        } else {
            "ON CONFLICT (id) DO NOTHING"
        };
        let sql = format!(
            "INSERT INTO {} (id, name, content, metadata, content_hash, embedding) \
             VALUES ($1, $2, $3, $4::jsonb, $5, $6::vector) {conflict}",
            self.table
        );

        let mut written = 0;
        for document in documents {
            let embedding = document.embedding.as_deref().ok_or_else(|| {
                KnowledgeError::Storage(format!("document '{}' has no embedding", document.id))
            })?;
            if embedding.len() != self.dimensions {
                return Err(KnowledgeError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: embedding.len(),
                });
            }

            let metadata = serde_json::to_string(&document.metadata)
                .map_err(|e| KnowledgeError::Storage(format!("metadata serialization: {e}")))?;

            let result = sqlx::query(&sql)
                .bind(&document.id)
                .bind(&document.name)
                .bind(&document.content)
                .bind(metadata)
                .bind(&document.content_hash)
                .bind(vector_literal(embedding))
                .execute(&self.pool)
                .await
                .map_err(|e| KnowledgeError::Storage(format!("INSERT failed: {e}")))?;
            written += result.rows_affected() as usize;
        }
        debug!(table = %self.table, written, "Wrote documents");
        Ok(written)
    }
}

#[async_trait]
impl KnowledgeStore for PgVectorStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn create(&self) -> Result<(), KnowledgeError> {
        let sql = format!(
            "CREATE EXTENSION IF NOT EXISTS vector;
             CREATE TABLE IF NOT EXISTS {table} (
                 id            TEXT PRIMARY KEY,
                 name          TEXT,
                 content       TEXT NOT NULL,
                 metadata      JSONB NOT NULL DEFAULT '{{}}',
                 content_hash  TEXT NOT NULL,
                 embedding     vector({dims}) NOT NULL,
                 created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
             );
             CREATE INDEX IF NOT EXISTS {table}_content_hash_idx ON {table}(content_hash);
             CREATE INDEX IF NOT EXISTS {table}_name_idx ON {table}(name);",
            table = self.table,
            dims = self.dimensions
        );

        sqlx::raw_sql(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("CREATE TABLE failed: {e}")))?;
        Ok(())
    }

    async fn doc_exists(&self, document: &Document) -> Result<bool, KnowledgeError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE content_hash = $1) AS found", self.table);
        let row = sqlx::query(&sql)
            .bind(&document.content_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("doc_exists: {e}")))?;
        row.try_get("found")
            .map_err(|e| KnowledgeError::QueryFailed(format!("found column: {e}")))
    }

    async fn stored_hash(&self, id: &str) -> Result<Option<String>, KnowledgeError> {
        let sql = format!("SELECT content_hash FROM {} WHERE id = $1", self.table);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("stored_hash: {e}")))?;
        row.map(|row| row.try_get::<String, _>("content_hash"))
            .transpose()
            .map_err(|e| KnowledgeError::QueryFailed(format!("content_hash column: {e}")))
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize, KnowledgeError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE name = $1", self.table))
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("DELETE failed: {e}")))?;
        Ok(result.rows_affected() as usize)
    }

    async fn insert(&self, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
        self.write(documents, false).await
    }

    async fn upsert(&self, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
        self.write(documents, true).await
    }

    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        if embedding.len() != self.dimensions {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        let sql = format!(
            "SELECT id, name, content, metadata::text AS metadata, content_hash, \
             embedding::text AS embedding, 1.0 - (embedding <=> $1::vector) AS score \
             FROM {} \
             WHERE 1.0 - (embedding <=> $1::vector) >= $2 \
             ORDER BY embedding <=> $1::vector ASC \
             LIMIT $3",
            self.table
        );

        let rows = sqlx::query(&sql)
            .bind(vector_literal(embedding))
            .bind(min_score as f64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("Vector search failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let score: f64 = row
                    .try_get("score")
                    .map_err(|e| KnowledgeError::QueryFailed(format!("score column: {e}")))?;
                Ok(ScoredDocument {
                    document: Self::to_document(row)?,
                    score: score as f32,
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("COUNT: {e}")))?;
        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| KnowledgeError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }

    async fn clear(&self) -> Result<(), KnowledgeError> {
        sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("CLEAR failed: {e}")))?;
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*`
/// is accepted.
fn validate_identifier(name: &str) -> Result<(), KnowledgeError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(KnowledgeError::Storage(format!("invalid table name: {name:?}")))
    }
}

/// pgvector text literal, e.g. `[0.1,0.2,0.3]`.
fn vector_literal(v: &[f32]) -> String {
    format!(
        "[{}]",
        v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
    )
}

fn parse_vector(text: &str) -> Option<Vec<f32>> {
    text.trim()
        .strip_prefix('[')?
        .strip_suffix(']')?
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse().ok())
        .collect()
}
