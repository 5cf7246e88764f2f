//! Persistence of analysis results with similarity search.
//!
//! Stores keep the analysis text as the searchable document and the request details as
//! metadata. Query responses follow the collection-query layout: one inner list per query text.

pub mod memory;
pub mod qdrant;

pub use memory::InMemoryAnalysisStore;
pub use qdrant::QdrantAnalysisStore;

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::qdrant::QdrantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by analysis stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedding provider failed to vectorise the text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant rejected a write or query.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors")]
    EmptyEmbedding,
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store was configured with.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// Request details stored next to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisMetadata {
    /// Requesting user.
    pub user_id: String,
    /// File name as uploaded.
    pub file_name: String,
    /// Path the upload was saved to.
    pub file_path: String,
    /// Hex SHA-256 digest of the uploaded bytes.
    pub file_sha256: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One analysis result as written to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAnalysis {
    /// UUID of the result.
    pub id: String,
    /// Free-text query the analysis answered.
    pub query: String,
    /// Analysis text; this is the searchable document.
    pub analysis: String,
    /// Request details.
    pub metadata: AnalysisMetadata,
}

impl StoredAnalysis {
    /// Flattened metadata map, including the query.
    pub fn metadata_map(&self) -> Map<String, Value> {
        let AnalysisMetadata {
            user_id,
            file_name,
            file_path,
            file_sha256,
            created_at,
        } = &self.metadata;
        let mut map = Map::new();
        map.insert("query".into(), Value::String(self.query.clone()));
        map.insert("user_id".into(), Value::String(user_id.clone()));
        map.insert("file_name".into(), Value::String(file_name.clone()));
        map.insert("file_path".into(), Value::String(file_path.clone()));
        map.insert("file_sha256".into(), Value::String(file_sha256.clone()));
        map.insert("created_at".into(), Value::String(created_at.clone()));
        map
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    /// Stored result id.
    pub id: String,
    /// Stored analysis text.
    pub document: String,
    /// Stored metadata.
    pub metadata: Map<String, Value>,
    /// Cosine distance to the query (`1 - similarity`).
    pub distance: f32,
}

/// Similarity search response with one inner list per query text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResults {
    /// Result ids.
    pub ids: Vec<Vec<String>>,
    /// Analysis texts.
    pub documents: Vec<Vec<String>>,
    /// Metadata maps.
    pub metadatas: Vec<Vec<Map<String, Value>>>,
    /// Distances to the query.
    pub distances: Vec<Vec<f32>>,
}

impl SimilarityResults {
    /// Build a response for a single query text from ranked hits.
    pub fn single(hits: Vec<SimilarityHit>) -> Self {
        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());
        for hit in hits {
            ids.push(hit.id);
            documents.push(hit.document);
            metadatas.push(hit.metadata);
            distances.push(hit.distance);
        }
        Self {
            ids: vec![ids],
            documents: vec![documents],
            metadatas: vec![metadatas],
            distances: vec![distances],
        }
    }

    /// Number of hits for the first query text.
    pub fn len(&self) -> usize {
        self.ids.first().map_or(0, Vec::len)
    }

    /// Whether the first query text produced no hits.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistence collaborator for analysis results.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Store one analysis result.
    async fn add(&self, record: StoredAnalysis) -> Result<(), StoreError>;

    /// Return up to `top_k` stored results ranked by similarity to `text`.
    async fn query(&self, text: &str, top_k: usize) -> Result<SimilarityResults, StoreError>;
}

/// Embed one text and check the vector has the client's dimension.
pub(crate) async fn embed_one(
    client: &dyn EmbeddingClient,
    text: &str,
) -> Result<Vec<f32>, StoreError> {
    let mut vectors = client.generate_embeddings(vec![text.to_string()]).await?;
    let vector = vectors.pop().ok_or(StoreError::EmptyEmbedding)?;
    let expected = client.dimension();
    if vector.len() != expected {
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{AnalysisMetadata, StoredAnalysis};

    pub(crate) fn record(id: &str, query: &str, analysis: &str) -> StoredAnalysis {
        StoredAnalysis {
            id: id.to_string(),
            query: query.to_string(),
            analysis: analysis.to_string(),
            metadata: AnalysisMetadata {
                user_id: "guest".into(),
                file_name: "report.pdf".into(),
                file_path: format!("uploads/{id}_report.pdf"),
                file_sha256: "00".repeat(32),
                created_at: "2026-01-01T00:00:00Z".into(),
            },
        }
    }
}
