//! Process-local analysis store ranking by cosine similarity.

use super::{AnalysisStore, SimilarityHit, SimilarityResults, StoreError, StoredAnalysis, embed_one};
use crate::embedding::EmbeddingClient;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

struct Entry {
    record: StoredAnalysis,
    vector: Vec<f32>,
}

/// In-memory store; contents are lost when the process exits.
pub struct InMemoryAnalysisStore {
    embedding_client: Arc<dyn EmbeddingClient>,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryAnalysisStore {
    /// Create an empty store using `embedding_client` for documents and queries.
    pub fn new(embedding_client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embedding_client,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored results.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn add(&self, record: StoredAnalysis) -> Result<(), StoreError> {
        let vector = embed_one(self.embedding_client.as_ref(), &record.analysis).await?;
        tracing::debug!(id = %record.id, "Stored analysis in memory");
        self.entries.write().await.push(Entry { record, vector });
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<SimilarityResults, StoreError> {
        let query = embed_one(self.embedding_client.as_ref(), text).await?;
        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|entry| (cosine_similarity(&query, &entry.vector), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let hits = scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| SimilarityHit {
                id: entry.record.id.clone(),
                document: entry.record.analysis.clone(),
                metadata: entry.record.metadata_map(),
                distance: 1.0 - score,
            })
            .collect();
        Ok(SimilarityResults::single(hits))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
