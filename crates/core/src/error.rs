//! Error types for the HybridRAG domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum.

use thiserror::Error;

/// The top-level error type for all HybridRAG operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Knowledge base errors ---
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Web search errors ---
    #[error("Web search error: {0}")]
    Search(#[from] SearchError),

    // --- Request validation ---
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Document '{0}' is already stored with different content; load with upsert to replace it")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search API returned status {status_code}: {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse search response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn dimension_mismatch_displays_both_sizes() {
        let err = Error::Knowledge(KnowledgeError::DimensionMismatch {
            expected: 1536,
            actual: 512,
        });
        let text = err.to_string();
        assert!(text.contains("1536"));
        assert!(text.contains("512"));
    }

    #[test]
    fn knowledge_conflict_names_the_document() {
        let err: Error = KnowledgeError::Conflict("policy_1".into()).into();
        assert!(matches!(err, Error::Knowledge(KnowledgeError::Conflict(_))));
        assert!(err.to_string().contains("'policy_1'"));
        assert!(err.to_string().contains("upsert"));
    }

    #[test]
    fn search_error_converts_into_top_level() {
        let err: Error = SearchError::RequestFailed("connection reset".into()).into();
        assert!(matches!(err, Error::Search(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
