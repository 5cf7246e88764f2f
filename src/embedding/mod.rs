use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Dimensionality of produced vectors.
    fn dimension(&self) -> usize;
}

/// Deterministic embedding client that hashes bytes into vector slots.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a client producing vectors of `dimension` entries.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.to_lowercase().bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        Ok(texts
            .into_iter()
            .map(|text| Self::encode(&text, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedding client calling the Ollama `/api/embed` endpoint.
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingClient {
    /// Construct a client for `model` served at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("bloodlens/embed")
            .build()
            .map_err(|err| EmbeddingClientError::ProviderUnavailable(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let expected = texts.len();
        tracing::debug!(model = %self.model, texts = expected, "Requesting Ollama embeddings");

        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if body.embeddings.len() != expected {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {expected} embeddings, got {}",
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Build an embedding client suitable for the supplied configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Building embedding client"
    );
    match config.embedding_provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbeddingClient::new(
            config.embedding_dimension,
        ))),
        EmbeddingProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Ok(Arc::new(OllamaEmbeddingClient::new(
                base_url,
                config.embedding_model.clone(),
                config.embedding_dimension,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn hash_embeddings_are_deterministic_and_normalized() {
        let client = HashEmbeddingClient::new(16);
        let vectors = client
            .generate_embeddings(vec!["Cholesterol".into(), "cholesterol".into()])
            .await
            .expect("embeddings");

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vectors[1]);
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn hash_client_rejects_empty_input() {
        let client = HashEmbeddingClient::new(8);
        assert!(client.generate_embeddings(Vec::new()).await.is_err());
        assert!(
            HashEmbeddingClient::new(0)
                .generate_embeddings(vec!["x".into()])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn ollama_client_returns_embeddings() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .json_body_partial(r#"{"model": "nomic-embed-text"}"#);
                then.status(200)
                    .json_body(json!({ "embeddings": [[0.1, 0.2, 0.3]] }));
            })
            .await;

        let client =
            OllamaEmbeddingClient::new(server.base_url(), "nomic-embed-text", 3).expect("client");
        let vectors = client
            .generate_embeddings(vec!["Glucose: 95".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3]]);
    }

    #[tokio::test]
    async fn ollama_client_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(500).body("boom");
            })
            .await;

        let client = OllamaEmbeddingClient::new(server.base_url(), "m", 3).expect("client");
        let error = client
            .generate_embeddings(vec!["x".into()])
            .await
            .expect_err("error status");
        assert!(
            matches!(error, EmbeddingClientError::GenerationFailed(message) if message.contains("500"))
        );
    }
}
