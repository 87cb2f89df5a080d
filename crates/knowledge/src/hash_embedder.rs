//! Feature-hashing embedder that works offline.
//!
//! Each content token is hashed (SHA-256, so vectors are stable across
//! builds and platforms) into one of `dimensions` buckets; the bucket
//! counts are L2-normalized. Cosine similarity then measures weighted term
//! overlap, which shrinks as chunks grow, so relevance is the larger of the
//! cosine and the share of query terms the chunk contains. Useful without an
//! embeddings API and in tests; an API-backed embedder gives semantic
//! matches instead.

use async_trait::async_trait;
use hybridrag_core::embedding::Embedder;
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::text;
use sha2::{Digest, Sha256};

pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dimensions as u64) as usize
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, input: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text::content_tokens(input) {
            vector[self.bucket(&token)] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn relevance(&self, query: &str, content: &str, similarity: f32) -> f32 {
        similarity.max(text::coverage(query, content))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::knowledge::cosine_similarity;

    #[test]
    fn vectors_are_normalized() {
        let v = HashEmbedder::new(64).embed_text("refund policy for digital goods");
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashEmbedder::new(16).embed_text("   ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn embedding_is_deterministic() {
        let a = HashEmbedder::default().embed_text("What is the refund policy?");
        let b = HashEmbedder::default().embed_text("What is the refund policy?");
        assert_eq!(a, b);
    }

    #[test]
    fn related_texts_score_higher_than_unrelated() {
        let e = HashEmbedder::default();
        let query = e.embed_text("What is the refund policy?");
        let related =
            e.embed_text("Refund policy: purchases may be returned within 30 days for a full refund.");
        let unrelated = e.embed_text("Our office is closed on public holidays.");

        let related_score = cosine_similarity(&query, &related);
        let unrelated_score = cosine_similarity(&query, &unrelated);
        assert!(related_score > 0.5, "related score {related_score}");
        assert!(unrelated_score < related_score);
    }

    #[test]
    fn long_chunks_stay_relevant() {
        let e = HashEmbedder::default();
        let query = "What is the refund policy?";
        let mut chunk = String::from("Refund policy. Customers may request a refund within 30 days. ");
        while chunk.len() < 1500 {
            chunk.push_str("Acme was founded in a small garage and now ships furniture, lamps and rugs worldwide. ");
        }

        let cosine = cosine_similarity(&e.embed_text(query), &e.embed_text(&chunk));
        assert!(cosine < 0.35, "cosine {cosine}");
        assert_eq!(e.relevance(query, &chunk, cosine), 1.0);
        assert_eq!(e.relevance(query, "Our office is closed on public holidays.", 0.0), 0.0);
    }

    #[tokio::test]
    async fn batch_embedding_preserves_order() {
        let e = HashEmbedder::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = e.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], e.embed_text("alpha"));
        assert_eq!(e.name(), "hash");
    }
}
