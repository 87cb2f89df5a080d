//! JSONL knowledge store, one embedded document per line.
//!
//! Documents are loaded into memory when the store is opened and the file
//! is rewritten on every mutation, so reads never touch disk. Suited to
//! knowledge bases of a few thousand chunks.
//!
//! Default location: `~/.hybridrag/knowledge.jsonl`

use async_trait::async_trait;
use hybridrag_core::document::{Document, ScoredDocument};
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::knowledge::KnowledgeStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::vector;

pub struct FileStore {
    path: PathBuf,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file starts empty and is created
    /// on the first write.
    pub fn new(path: PathBuf) -> Self {
        let documents = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = documents.len(), "Knowledge file loaded");
        Self {
            path,
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<Document> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<Document>(line) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping corrupted knowledge document");
                    None
                }
            })
            .collect()
    }

    /// Rewrite the whole file from `documents`.
    fn flush(&self, documents: &[Document]) -> Result<(), KnowledgeError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KnowledgeError::Storage(format!("Failed to create knowledge directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for document in documents {
            let line = serde_json::to_string(document).map_err(|e| {
                KnowledgeError::Storage(format!("Failed to serialize document: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, content)
            .map_err(|e| KnowledgeError::Storage(format!("Failed to write knowledge file: {e}")))
    }
}

#[async_trait]
impl KnowledgeStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn create(&self) -> Result<(), KnowledgeError> {
        if self.path.exists() {
            return Ok(());
        }
        let documents = self.documents.read().await;
        self.flush(&documents)
    }

    async fn doc_exists(&self, document: &Document) -> Result<bool, KnowledgeError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .any(|d| d.content_hash == document.content_hash))
    }

    async fn stored_hash(&self, id: &str) -> Result<Option<String>, KnowledgeError> {
        Ok(vector::stored_hash(&self.documents.read().await, id))
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize, KnowledgeError> {
        let mut stored = self.documents.write().await;
        let removed = vector::remove_named(&mut stored, name);
        if removed > 0 {
            self.flush(&stored)?;
        }
        Ok(removed)
    }

    async fn insert(&self, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
        let mut stored = self.documents.write().await;
        let added = vector::insert_new(&mut stored, documents)?;
        if added > 0 {
            self.flush(&stored)?;
        }
        Ok(added)
    }

    async fn upsert(&self, documents: Vec<Document>) -> Result<usize, KnowledgeError> {
        let mut stored = self.documents.write().await;
        let written = vector::upsert(&mut stored, documents)?;
        if written > 0 {
            self.flush(&stored)?;
        }
        Ok(written)
    }

    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, KnowledgeError> {
        let stored = self.documents.read().await;
        Ok(vector::vector_search(&stored, embedding, limit, min_score))
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.documents.read().await.len())
    }

    async fn clear(&self) -> Result<(), KnowledgeError> {
        let mut stored = self.documents.write().await;
        stored.clear();
        self.flush(&stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn doc(id: &str, content: &str, embedding: Vec<f32>) -> Document {
        let mut d = Document::new(content).with_id(id).with_name("faq");
        d.embedding = Some(embedding);
        d
    }

    fn temp_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb").join("knowledge.jsonl");
        (dir, path)
    }

    #[tokio::test]
    async fn insert_persists_across_reopen() {
        let (_dir, path) = temp_path();

        let store = FileStore::new(path.clone());
        store
            .insert(vec![doc("refunds_1", "Refunds within 30 days.", vec![1.0, 0.0])])
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Refunds within 30 days."));

        let reopened = FileStore::new(path);
        assert_eq!(reopened.count().await.unwrap(), 1);
        let hits = reopened.search(&[1.0, 0.0], 2, 0.5).await.unwrap();
        assert_eq!(hits[0].document.id, "refunds_1");
        assert_eq!(hits[0].document.name.as_deref(), Some("faq"));
    }

    #[tokio::test]
    async fn create_writes_empty_file() {
        let (_dir, path) = temp_path();
        let store = FileStore::new(path.clone());
        store.create().await.unwrap();
        assert!(path.exists());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_and_clear_persist() {
        let (_dir, path) = temp_path();

        let store = FileStore::new(path.clone());
        store.insert(vec![doc("a", "old", vec![1.0])]).await.unwrap();
        store.upsert(vec![doc("a", "new", vec![1.0])]).await.unwrap();

        let reopened = FileStore::new(path.clone());
        let hits = reopened.search(&[1.0], 1, 0.0).await.unwrap();
        assert_eq!(hits[0].document.content, "new");

        reopened.clear().await.unwrap();
        assert_eq!(FileStore::new(path).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_by_name_persists() {
        let (_dir, path) = temp_path();
        let store = FileStore::new(path.clone());
        store
            .insert(vec![doc("faq_1", "one", vec![1.0]), doc("faq_2", "two", vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.delete_by_name("faq").await.unwrap(), 2);
        assert_eq!(FileStore::new(path).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        let valid = serde_json::to_string(&doc("a", "valid", vec![1.0])).unwrap();
        writeln!(tmp, "{valid}").unwrap();
        writeln!(tmp, "this is not json").unwrap();

        let store = FileStore::new(tmp.path().to_path_buf());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn doc_exists_matches_content_hash() {
        let (_dir, path) = temp_path();
        let store = FileStore::new(path);
        store.insert(vec![doc("a", "same text", vec![1.0])]).await.unwrap();
        assert!(store.doc_exists(&Document::new("same text")).await.unwrap());
        assert!(!store.doc_exists(&Document::new("other text")).await.unwrap());
    }
}
