//! Analysis store backed by a Qdrant collection.

use super::{AnalysisStore, SimilarityHit, SimilarityResults, StoreError, StoredAnalysis, embed_one};
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::qdrant::{
    PointInsert, QdrantService,
    payload::{build_payload, split_payload},
};
use async_trait::async_trait;
use std::sync::Arc;

const INDEXED_FIELDS: [&str; 2] = ["user_id", "file_name"];

/// Writes each analysis as one point and answers queries with Qdrant's query API.
pub struct QdrantAnalysisStore {
    qdrant: QdrantService,
    embedding_client: Arc<dyn EmbeddingClient>,
    collection: String,
}

impl QdrantAnalysisStore {
    /// Wrap an existing client; the collection is assumed to exist.
    pub fn new(
        qdrant: QdrantService,
        embedding_client: Arc<dyn EmbeddingClient>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            qdrant,
            embedding_client,
            collection: collection.into(),
        }
    }

    /// Connect using `config` and make sure the collection and payload indexes exist.
    pub async fn connect(
        config: &Config,
        embedding_client: Arc<dyn EmbeddingClient>,
    ) -> Result<Self, StoreError> {
        let qdrant = QdrantService::new(&config.qdrant_url, config.qdrant_api_key.clone())?;
        let store = Self::new(qdrant, embedding_client, &config.qdrant_collection_name);
        store.ensure_collection().await?;
        Ok(store)
    }

    /// Create the collection when missing and ensure keyword indexes.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let vector_size = self.embedding_client.dimension() as u64;
        tracing::debug!(collection = %self.collection, vector_size, "Ensuring analysis collection");
        self.qdrant
            .create_collection_if_not_exists(&self.collection, vector_size)
            .await?;
        self.qdrant
            .ensure_keyword_indexes(&self.collection, &INDEXED_FIELDS)
            .await?;
        tracing::debug!(collection = %self.collection, "Analysis collection ready");
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for QdrantAnalysisStore {
    async fn add(&self, record: StoredAnalysis) -> Result<(), StoreError> {
        let vector = embed_one(self.embedding_client.as_ref(), &record.analysis).await?;
        let payload = build_payload(&record.analysis, &record.metadata_map());
        self.qdrant
            .upsert_points(
                &self.collection,
                vec![PointInsert {
                    id: record.id,
                    vector,
                    payload,
                }],
            )
            .await?;
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<SimilarityResults, StoreError> {
        let vector = embed_one(self.embedding_client.as_ref(), text).await?;
        let points = self
            .qdrant
            .search_points(&self.collection, vector, top_k)
            .await?;

        let hits = points
            .into_iter()
            .map(|point| {
                let (document, metadata) = split_payload(point.payload.unwrap_or_default());
                SimilarityHit {
                    id: point.id,
                    document,
                    metadata,
                    distance: 1.0 - point.score,
                }
            })
            .collect();
        Ok(SimilarityResults::single(hits))
    }
}
