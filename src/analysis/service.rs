//! Analysis service coordinating upload storage, text extraction, and persistence.

use crate::{
    analysis::types::{
        AnalysisError, AnalysisRecord, AnalyzeRequest, COULD_NOT_EXTRACT, EMPTY_FILENAME,
        NO_FILE_UPLOADED, UploadedFile,
    },
    config::Config,
    embedding::build_embedding_client,
    metrics::{AnalysisMetrics, MetricsSnapshot},
    pdf::{PdfExtractText, PdfTextExtractor},
    qdrant::{compute_content_hash, current_timestamp_rfc3339},
    report::{self, compose_analysis},
    store::{AnalysisMetadata, AnalysisStore, QdrantAnalysisStore, SimilarityResults, StoreError, StoredAnalysis},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

const FALLBACK_FILE_NAME: &str = "upload.pdf";

/// Settings applied by [`AnalysisService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Directory receiving uploaded reports.
    pub upload_dir: PathBuf,
    /// `top_k` used when a search does not specify one.
    pub default_top_k: usize,
    /// Upper bound for `top_k`.
    pub max_top_k: usize,
}

impl ServiceSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            default_top_k: config.search_default_top_k,
            max_top_k: config.search_max_top_k,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Handles analysis and search requests.
///
/// Collaborators are injected so the HTTP surface, the CLI, and tests can each supply their
/// own extractor and store. Construct once and share through an `Arc`.
pub struct AnalysisService {
    extractor: Arc<dyn PdfTextExtractor>,
    store: Arc<dyn AnalysisStore>,
    settings: ServiceSettings,
    metrics: Arc<AnalysisMetrics>,
}

/// Abstraction over the analysis service used by the HTTP surface.
#[async_trait]
pub trait AnalyzerApi: Send + Sync {
    /// Analyse an uploaded report and persist the result.
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisRecord, AnalysisError>;

    /// Similarity search over stored results.
    async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<SimilarityResults, AnalysisError>;

    /// Current activity counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl AnalysisService {
    /// Build a service from explicit collaborators.
    pub fn new(
        extractor: Arc<dyn PdfTextExtractor>,
        store: Arc<dyn AnalysisStore>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            extractor,
            store,
            settings,
            metrics: Arc::new(AnalysisMetrics::new()),
        }
    }

    /// Build the production service: `pdf-extract` text extraction and a Qdrant-backed store.
    pub async fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        tracing::info!("Initializing embedding client");
        let embedding_client = build_embedding_client(config).map_err(StoreError::from)?;
        let store = QdrantAnalysisStore::connect(config, embedding_client).await?;
        let settings = ServiceSettings::from_config(config);
        tokio::fs::create_dir_all(&settings.upload_dir).await?;
        tracing::info!(
            upload_dir = %settings.upload_dir.display(),
            collection = %config.qdrant_collection_name,
            "Analysis service ready"
        );
        Ok(Self::new(Arc::new(PdfExtractText), Arc::new(store), settings))
    }

    /// Save the upload, extract its text, answer the query, and persist the result.
    ///
    /// Rejected requests never reach the store.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisRecord, AnalysisError> {
        let AnalyzeRequest {
            file,
            query,
            user_id,
        } = request;
        let file = file.ok_or_else(|| AnalysisError::InputRejected(NO_FILE_UPLOADED.into()))?;
        if file.file_name.trim().is_empty() {
            return Err(AnalysisError::InputRejected(EMPTY_FILENAME.into()));
        }

        let saved_path = self.save_upload(&file).await?;
        let file_path = saved_path.display().to_string();
        let report_text = self.extract(saved_path).await?;

        let composed = compose_analysis(&query, &file_path, &report_text);
        let id = Uuid::new_v4().to_string();
        let record = StoredAnalysis {
            id: id.clone(),
            query: query.clone(),
            analysis: composed.analysis.clone(),
            metadata: AnalysisMetadata {
                user_id,
                file_name: file.file_name,
                file_path: file_path.clone(),
                file_sha256: compute_content_hash(&file.bytes),
                created_at: current_timestamp_rfc3339(),
            },
        };
        self.store.add(record).await?;
        self.metrics.record_analysis(composed.branch);

        tracing::info!(
            id = %id,
            branch = ?composed.branch,
            file = %file_path,
            "Analysis stored"
        );

        Ok(AnalysisRecord {
            id,
            query,
            file_processed: file_path,
            analysis: composed.analysis,
        })
    }

    /// Forward a similarity search to the store.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<SimilarityResults, AnalysisError> {
        let top_k = top_k
            .unwrap_or(self.settings.default_top_k)
            .clamp(1, self.settings.max_top_k);
        let results = self.store.query(query, top_k).await?;
        self.metrics.record_search();
        tracing::debug!(top_k, hits = results.len(), "Search completed");
        Ok(results)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn save_upload(&self, file: &UploadedFile) -> Result<PathBuf, AnalysisError> {
        tokio::fs::create_dir_all(&self.settings.upload_dir).await?;
        let path = self.settings.upload_dir.join(format!(
            "{}_{}",
            Uuid::new_v4(),
            stored_file_name(&file.file_name)
        ));
        tokio::fs::write(&path, &file.bytes).await?;
        tracing::debug!(path = %path.display(), bytes = file.bytes.len(), "Upload saved");
        Ok(path)
    }

    async fn extract(&self, path: PathBuf) -> Result<String, AnalysisError> {
        let extractor = Arc::clone(&self.extractor);
        let shown_path = path.display().to_string();
        match tokio::task::spawn_blocking(move || extractor.extract_text(&path)).await {
            Ok(Ok(text)) if !report::is_unreadable(&text) => Ok(text),
            Ok(Ok(_)) => {
                tracing::warn!(path = %shown_path, "{COULD_NOT_EXTRACT}: no text");
                Err(AnalysisError::ExtractionFailed)
            }
            Ok(Err(error)) => {
                tracing::warn!(path = %shown_path, error = %error, "{COULD_NOT_EXTRACT}");
                Err(AnalysisError::ExtractionFailed)
            }
            Err(error) => {
                tracing::error!(path = %shown_path, error = %error, "Extraction task failed");
                Err(AnalysisError::ExtractionFailed)
            }
        }
    }
}

/// Final path component of the client-supplied name, so uploads stay inside the upload dir.
fn stored_file_name(name: &str) -> String {
    Path::new(name.trim())
        .file_name()
        .and_then(|component| component.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

#[async_trait]
impl AnalyzerApi for AnalysisService {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisRecord, AnalysisError> {
        AnalysisService::analyze(self, request).await
    }

    async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<SimilarityResults, AnalysisError> {
        AnalysisService::search(self, query, top_k).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        AnalysisService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::pdf::{ExtractionError, PlainTextExtractor};
    use crate::store::InMemoryAnalysisStore;
    use tempfile::TempDir;

    struct FailingExtractor;

    impl PdfTextExtractor for FailingExtractor {
        fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
            Err(ExtractionError::Pdf("encrypted".into()))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl AnalysisStore for FailingStore {
        async fn add(&self, _record: StoredAnalysis) -> Result<(), StoreError> {
            Err(StoreError::EmptyEmbedding)
        }

        async fn query(&self, _text: &str, _top_k: usize) -> Result<SimilarityResults, StoreError> {
            Err(StoreError::EmptyEmbedding)
        }
    }

    struct Harness {
        service: AnalysisService,
        store: Arc<InMemoryAnalysisStore>,
        dir: TempDir,
    }

    fn harness(extractor: Arc<dyn PdfTextExtractor>) -> Harness {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Arc::new(InMemoryAnalysisStore::new(Arc::new(
            HashEmbeddingClient::new(32),
        )));
        let settings = ServiceSettings {
            upload_dir: dir.path().join("uploads"),
            default_top_k: 3,
            max_top_k: 5,
        };
        let service = AnalysisService::new(extractor, store.clone(), settings);
        Harness {
            service,
            store,
            dir,
        }
    }

    fn request(name: &str, body: &str, query: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            file: Some(UploadedFile {
                file_name: name.into(),
                bytes: body.as_bytes().to_vec(),
            }),
            query: query.into(),
            user_id: "guest123".into(),
        }
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let h = harness(Arc::new(PlainTextExtractor));
        let error = h
            .service
            .analyze(AnalyzeRequest {
                file: None,
                query: "q".into(),
                user_id: "u".into(),
            })
            .await
            .expect_err("rejected");
        assert!(matches!(&error, AnalysisError::InputRejected(detail) if detail == NO_FILE_UPLOADED));
        assert!(error.is_client_error());
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let h = harness(Arc::new(PlainTextExtractor));
        let error = h
            .service
            .analyze(request("  ", "Glucose: 90", "q"))
            .await
            .expect_err("rejected");
        assert_eq!(error.to_string(), EMPTY_FILENAME);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn extraction_failure_is_rejected_without_persisting() {
        let h = harness(Arc::new(FailingExtractor));
        let error = h
            .service
            .analyze(request("report.pdf", "%PDF", "q"))
            .await
            .expect_err("rejected");
        assert!(matches!(error, AnalysisError::ExtractionFailed));
        assert_eq!(error.to_string(), COULD_NOT_EXTRACT);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let h = harness(Arc::new(PlainTextExtractor));
        let error = h
            .service
            .analyze(request("report.txt", "  \n ", "q"))
            .await
            .expect_err("rejected");
        assert!(matches!(error, AnalysisError::ExtractionFailed));
    }

    #[tokio::test]
    async fn marker_query_returns_matching_lines_only() {
        let h = harness(Arc::new(PlainTextExtractor));
        let record = h
            .service
            .analyze(request(
                "report.txt",
                "Hemoglobin: 13\nCholesterol: 250",
                "cholesterol",
            ))
            .await
            .expect("analysis");

        assert_eq!(
            record.analysis,
            "📋 Query-Specific Result:\n- Cholesterol: 250.0 → High (Normal range: 0-200)"
        );
        assert_eq!(record.query, "cholesterol");
        assert!(record.file_processed.ends_with("_report.txt"));
        assert!(Path::new(&record.file_processed).starts_with(h.dir.path()));
        assert_eq!(h.store.len().await, 1);

        let snapshot = h.service.metrics_snapshot();
        assert_eq!(snapshot.query_specific, 1);
        assert_eq!(snapshot.full_pipeline, 0);
    }

    #[tokio::test]
    async fn generic_query_runs_full_pipeline_and_persists_metadata() {
        let h = harness(Arc::new(PlainTextExtractor));
        let record = h
            .service
            .analyze(request("report.txt", "Glucose: 120", "Summarise my report"))
            .await
            .expect("analysis");
        assert!(record.analysis.starts_with("📊 Report Summary:"));
        assert!(record.analysis.contains("Glucose: 120.0 → High"));

        let results = h.service.search("Glucose", None).await.expect("search");
        assert_eq!(results.ids[0][0], record.id);
        let metadata = &results.metadatas[0][0];
        assert_eq!(metadata["user_id"], "guest123");
        assert_eq!(metadata["file_name"], "report.txt");
        assert_eq!(metadata["query"], "Summarise my report");
        assert_eq!(metadata["file_path"], record.file_processed.as_str());
        assert_eq!(h.service.metrics_snapshot().searches, 1);
    }

    #[tokio::test]
    async fn uploads_cannot_escape_upload_dir() {
        let h = harness(Arc::new(PlainTextExtractor));
        let record = h
            .service
            .analyze(request("../../etc/report.txt", "Glucose: 90", "q"))
            .await
            .expect("analysis");
        let saved = Path::new(&record.file_processed);
        assert_eq!(saved.parent(), Some(h.dir.path().join("uploads").as_path()));
    }

    #[tokio::test]
    async fn store_failures_surface_as_server_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let service = AnalysisService::new(
            Arc::new(PlainTextExtractor),
            Arc::new(FailingStore),
            ServiceSettings {
                upload_dir: dir.path().to_path_buf(),
                ..ServiceSettings::default()
            },
        );
        let error = service
            .analyze(request("report.txt", "Glucose: 90", "q"))
            .await
            .expect_err("store failure");
        assert!(matches!(error, AnalysisError::Store(_)));
        assert!(!error.is_client_error());
        assert_eq!(service.metrics_snapshot().reports_analyzed, 0);
    }

    #[tokio::test]
    async fn search_top_k_is_clamped_to_configured_bounds() {
        let h = harness(Arc::new(PlainTextExtractor));
        for index in 0..7 {
            h.store
                .add(crate::store::test_support::record(
                    &format!("id-{index}"),
                    "q",
                    &format!("Glucose: {index}"),
                ))
                .await
                .expect("add");
        }

        let smallest = h.service.search("Glucose", Some(0)).await.expect("search");
        assert_eq!(smallest.len(), 1);
        let largest = h.service.search("Glucose", Some(100)).await.expect("search");
        assert_eq!(largest.len(), 5);
        let default = h.service.search("Glucose", None).await.expect("search");
        assert_eq!(default.len(), 3);
        assert_eq!(h.service.metrics_snapshot().searches, 3);
    }

    #[test]
    fn stored_file_name_keeps_last_component() {
        assert_eq!(stored_file_name("report.pdf"), "report.pdf");
        assert_eq!(stored_file_name("a/b/report.pdf"), "report.pdf");
        assert_eq!(stored_file_name(".."), FALLBACK_FILE_NAME);
    }
}
