//! Brute-force vector search over documents held in memory.
//!
//! Shared by the in-memory and JSONL stores, which both keep every document
//! resident and scan them on each query.

use hybridrag_core::document::{Document, ScoredDocument};
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::knowledge::cosine_similarity;

/// Rank documents by cosine similarity to a query embedding.
///
/// Returns documents sorted by descending similarity. Documents without an
/// embedding, or scoring below `min_score`, are skipped.
pub fn vector_search(
    documents: &[Document],
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = documents
        .iter()
        .filter_map(|document| {
            let emb = document.embedding.as_ref()?;
            let score = cosine_similarity(emb, query_embedding);
            (score >= min_score).then(|| ScoredDocument {
                document: document.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

fn require_embedding(document: &Document) -> Result<(), KnowledgeError> {
    if document.embedding.is_none() {
        return Err(KnowledgeError::Storage(format!(
            "document '{}' has no embedding",
            document.id
        )));
    }
    Ok(())
}

/// Append documents whose ID is not stored yet; returns how many were added.
pub fn insert_new(stored: &mut Vec<Document>, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
    let mut added = 0;
    for document in documents {
        require_embedding(&document)?;
        if stored.iter().any(|d| d.id == document.id) {
            continue;
        }
        stored.push(document);
        added += 1;
    }
    Ok(added)
}

/// Insert or replace documents by ID; returns how many were written.
pub fn upsert(stored: &mut Vec<Document>, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
    let mut written = 0;
    for document in documents {
        require_embedding(&document)?;
        match stored.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => stored.push(document),
        }
        written += 1;
    }
    Ok(written)
}

/// Content hash of the document stored under `id`.
pub fn stored_hash(stored: &[Document], id: &str) -> Option<String> {
    stored.iter().find(|d| d.id == id).map(|d| d.content_hash.clone())
}

/// Drop every document with the given name; returns how many were dropped.
pub fn remove_named(stored: &mut Vec<Document>, name: &str) -> usize {
    let before = stored.len();
    stored.retain(|d| d.name.as_deref() != Some(name));
    before - stored.len()
}
