//! Plain text and markdown reader with word-boundary chunking.

use std::path::{Path, PathBuf};

use hybridrag_core::document::Document;
use hybridrag_core::error::KnowledgeError;
use tracing::{debug, info};

/// Collapse every run of whitespace into a single space.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a document into chunks of at most `chunk_size` characters.
///
/// Chunks break at whitespace when possible; a single word longer than
/// `chunk_size` is split hard. Chunk IDs are `<id>_<n>` (1-based) and each
/// chunk carries `chunk` and `chunk_size` metadata on top of the parent's.
pub fn chunk_document(document: &Document, chunk_size: usize) -> Vec<Document> {
    let chunk_size = chunk_size.max(1);
    let cleaned: Vec<char> = clean_text(&document.content).chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut number = 1;

    while start < cleaned.len() {
        let mut end = (start + chunk_size).min(cleaned.len());

        if end < cleaned.len() {
            let mut boundary = end;
            while boundary > start && cleaned[boundary] != ' ' {
                boundary -= 1;
            }
            if boundary > start {
                end = boundary;
            }
        }

        let content: String = cleaned[start..end].iter().collect();
        let mut chunk = Document::new(content)
            .with_id(format!("{}_{number}", document.id))
            .with_metadata("chunk", serde_json::json!(number))
            .with_metadata("chunk_size", serde_json::json!(end - start));
        chunk.name = document.name.clone();
        for (key, value) in &document.metadata {
            chunk.metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
        chunks.push(chunk);

        number += 1;
        start = end;
        // The separating space belongs to neither chunk.
        while start < cleaned.len() && cleaned[start] == ' ' {
            start += 1;
        }
    }

    chunks
}

/// Reads `.txt`/`.md` files into chunked documents.
#[derive(Debug, Clone)]
pub struct TextReader {
    chunk_size: usize,
    formats: Vec<String>,
}

impl TextReader {
    pub fn new(chunk_size: usize, formats: Vec<String>) -> Self {
        Self {
            chunk_size,
            formats: formats
                .into_iter()
                .map(|f| f.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// True if the file's extension is one of the configured formats.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.formats.iter().any(|f| f.eq_ignore_ascii_case(e)))
    }

    /// Read a single file, or every accepted file under a directory.
    pub fn read_path(&self, path: &Path) -> Result<Vec<Document>, KnowledgeError> {
        if path.is_dir() {
            let mut files = Vec::new();
            self.collect_files(path, &mut files)?;
            files.sort();
            info!(path = %path.display(), files = files.len(), "Reading directory");

            let mut documents = Vec::new();
            for file in files {
                documents.extend(self.read_file(&file)?);
            }
            Ok(documents)
        } else {
            self.read_file(path)
        }
    }

    /// Read one file into chunks named after the file stem.
    pub fn read_file(&self, path: &Path) -> Result<Vec<Document>, KnowledgeError> {
        let read_failed = |reason: String| KnowledgeError::ReadFailed {
            path: path.display().to_string(),
            reason,
        };

        if !self.accepts(path) {
            return Err(read_failed(format!(
                "unsupported file type (accepted: {})",
                self.formats.join(", ")
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| read_failed(e.to_string()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .replace(' ', "_");

        let document = Document::new(content)
            .with_id(name.clone())
            .with_name(name)
            .with_metadata("source", serde_json::json!(path.display().to_string()));

        let chunks = chunk_document(&document, self.chunk_size);
        debug!(path = %path.display(), chunks = chunks.len(), "Read file");
        Ok(chunks)
    }

    fn collect_files(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), KnowledgeError> {
        let entries = std::fs::read_dir(dir).map_err(|e| KnowledgeError::ReadFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.collect_files(&path, files)?;
            } else if self.accepts(&path) {
                files.push(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(chunk_size: usize) -> TextReader {
        TextReader::new(chunk_size, vec![".txt".into(), ".md".into()])
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("a\n\n\nb \t  c\r\n"), "a b c");
    }

    #[test]
    fn short_document_is_one_chunk() {
        let doc = Document::new("Refunds are accepted within 30 days.").with_id("refunds");
        let chunks = chunk_document(&doc, 3000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "refunds_1");
        assert_eq!(chunks[0].metadata["chunk"], 1);
        assert_eq!(chunks[0].metadata["chunk_size"], 36);
    }

    #[test]
    fn chunks_break_at_word_boundaries() {
        let doc = Document::new("alpha beta gamma delta").with_id("d");
        let chunks = chunk_document(&doc, 12);
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["alpha beta", "gamma delta"]);
        assert_eq!(chunks[1].id, "d_2");
    }

    #[test]
    fn long_word_is_split_hard() {
        let doc = Document::new("abcdefghij").with_id("d");
        let chunks = chunk_document(&doc, 4);
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_is_chunked_by_characters() {
        let doc = Document::new("héllo wörld ünïcode").with_id("u");
        let chunks = chunk_document(&doc, 6);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 6));
        assert_eq!(chunks[0].content, "héllo");
    }

    #[test]
    fn chunk_inherits_parent_metadata() {
        let doc = Document::new("text")
            .with_id("d")
            .with_name("faq")
            .with_metadata("source", serde_json::json!("faq.md"));
        let chunk = &chunk_document(&doc, 100)[0];
        assert_eq!(chunk.name.as_deref(), Some("faq"));
        assert_eq!(chunk.metadata["source"], "faq.md");
    }

    #[test]
    fn empty_document_has_no_chunks() {
        let doc = Document::new("  \n ").with_id("d");
        assert!(chunk_document(&doc, 10).is_empty());
    }

    #[test]
    fn reads_directory_recursively_filtering_formats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("refund policy.md"), "Refunds within 30 days.").unwrap();
        std::fs::write(dir.path().join("nested/shipping.txt"), "Ships in 3 days.").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0u8, 1, 2]).unwrap();

        let docs = reader(3000).read_path(dir.path()).unwrap();
        let mut ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["refund_policy_1", "shipping_1"]);
    }

    #[test]
    fn unsupported_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, "binary").unwrap();
        let err = reader(3000).read_path(&path).unwrap_err();
        assert!(matches!(err, KnowledgeError::ReadFailed { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = reader(3000)
            .read_path(Path::new("/nonexistent/notes.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/notes.txt"));
    }
}
