//! The knowledge base: a reader, an embedder and a vector store wired
//! together for ingestion and semantic search.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use hybridrag_core::document::{Document, ScoredDocument};
use hybridrag_core::embedding::Embedder;
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::knowledge::KnowledgeStore;
use tracing::{debug, info, warn};

use crate::reader::{TextReader, chunk_document};

/// Fewest store candidates re-scored by the embedder on each search.
const CANDIDATE_POOL: usize = 64;

/// How documents are written during a load.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Clear the store before loading.
    pub recreate: bool,
    /// Replace documents whose ID is already stored, dropping every older
    /// chunk stored under the same name.
    pub upsert: bool,
    /// Skip documents whose content is already stored. Ignored with `upsert`.
    pub skip_existing: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            recreate: false,
            upsert: false,
            skip_existing: true,
        }
    }
}

/// Counts reported after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadSummary {
    pub read: usize,
    pub skipped: usize,
    pub written: usize,
}

pub struct KnowledgeBase {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
    reader: TextReader,
    chunk_size: usize,
    num_documents: usize,
}

impl KnowledgeBase {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embedder: Arc<dyn Embedder>,
        reader: TextReader,
        chunk_size: usize,
        num_documents: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            reader,
            chunk_size,
            num_documents: num_documents.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Default number of documents returned by a search.
    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    /// Embed and store already-chunked documents.
    pub async fn load_documents(
        &self,
        documents: Vec<Document>,
        options: LoadOptions,
    ) -> Result<LoadSummary, KnowledgeError> {
        self.store.create().await?;
        if options.recreate {
            info!(store = self.store.name(), "Recreating knowledge base");
            self.store.clear().await?;
        }

        let mut summary = LoadSummary {
            read: documents.len(),
            ..LoadSummary::default()
        };

        let mut pending = Vec::with_capacity(documents.len());
        for document in documents {
            if !options.upsert {
                if options.skip_existing && self.store.doc_exists(&document).await? {
                    summary.skipped += 1;
                    continue;
                }
                match self.store.stored_hash(&document.id).await? {
                    Some(hash) if hash != document.content_hash => {
                        warn!(id = %document.id, "Stored document has different content");
                        return Err(KnowledgeError::Conflict(document.id));
                    }
                    Some(_) => {
                        summary.skipped += 1;
                        continue;
                    }
                    None => {}
                }
            }
            pending.push(document);
        }

        if pending.is_empty() {
            debug!(skipped = summary.skipped, "Nothing new to load");
            return Ok(summary);
        }

        let texts: Vec<String> = pending.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != pending.len() {
            return Err(KnowledgeError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                pending.len(),
                embeddings.len()
            )));
        }
        for (document, embedding) in pending.iter_mut().zip(embeddings) {
            document.embedding = Some(embedding);
        }

        summary.written = if options.upsert {
            // Drop every chunk of the previous version first.
            let names: BTreeSet<&str> = pending.iter().filter_map(|d| d.name.as_deref()).collect();
            for name in names {
                let removed = self.store.delete_by_name(name).await?;
                if removed > 0 {
                    debug!(name, removed, "Replacing stored document");
                }
            }
            self.store.upsert(pending).await?
        } else {
            self.store.insert(pending).await?
        };

        info!(
            store = self.store.name(),
            read = summary.read,
            skipped = summary.skipped,
            written = summary.written,
            "Knowledge base loaded"
        );
        Ok(summary)
    }

    /// Read a file or directory and load its chunks.
    pub async fn load_path(&self, path: &Path, options: LoadOptions) -> Result<LoadSummary, KnowledgeError> {
        let documents = self.reader.read_path(path)?;
        self.load_documents(documents, options).await
    }

    /// Chunk and load one named text.
    pub async fn load_text(
        &self,
        name: &str,
        content: &str,
        options: LoadOptions,
    ) -> Result<LoadSummary, KnowledgeError> {
        let id = name.trim().replace(' ', "_");
        let document = Document::new(content).with_id(id.clone()).with_name(id);
        self.load_documents(chunk_document(&document, self.chunk_size), options)
            .await
    }

    /// Documents most relevant to `query`, best first.
    ///
    /// The store returns the nearest candidates by cosine similarity; the
    /// embedder's [`Embedder::relevance`] then decides the final score.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        let embedding = self.embedder.embed_one(query).await?;
        let limit = limit.unwrap_or(self.num_documents);
        let pool = limit.saturating_mul(8).max(CANDIDATE_POOL);
        let candidates = self.store.search(&embedding, pool, min_score.min(0.0)).await?;

        let mut hits: Vec<ScoredDocument> = candidates
            .into_iter()
            .filter_map(|mut hit| {
                hit.score = self.embedder.relevance(query, &hit.document.content, hit.score);
                (hit.score >= min_score).then_some(hit)
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);

        debug!(hits = hits.len(), limit, min_score, "Knowledge search");
        Ok(hits)
    }

    pub async fn count(&self) -> Result<usize, KnowledgeError> {
        self.store.count().await
    }

    pub async fn clear(&self) -> Result<(), KnowledgeError> {
        self.store.clear().await
    }
}
