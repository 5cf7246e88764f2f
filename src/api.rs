//! HTTP surface for the blood-test report analyser.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Liveness message.
//! - `POST /analyze` – Multipart upload (`file`, optional `query` and `user_id`). Saves the report,
//!   extracts its text, answers the query, and persists the result. Returns
//!   `{ id, query, file_processed, analysis }`.
//! - `GET /search` – Similarity search over stored analyses (`query`, optional `top_k`).
//! - `GET /metrics` – Analysis and search counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::analysis::{
    AnalysisError, AnalyzeRequest, AnalyzerApi, DEFAULT_QUERY, DEFAULT_USER_ID, UploadedFile,
};
use crate::metrics::MetricsSnapshot;
use crate::store::SimilarityResults;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const ROOT_MESSAGE: &str = "Blood Test Report Analyser API is running";

/// Build the HTTP router exposing the analysis API surface.
///
/// `upload_limit` caps the request body size accepted by every route.
pub fn create_router<S>(service: Arc<S>, upload_limit: usize) -> Router
where
    S: AnalyzerApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/analyze", post(analyze_report::<S>))
        .route("/search", get(search_results::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(service)
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

/// Analyse an uploaded blood-test report.
///
/// Unknown multipart fields are ignored. Missing `query` and `user_id` fall back to the
/// service defaults.
async fn analyze_report<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<crate::analysis::AnalysisRecord>, AppError>
where
    S: AnalyzerApi,
{
    let request = read_analyze_form(multipart).await?;
    let record = service.analyze(request).await?;
    tracing::info!(
        id = %record.id,
        file = %record.file_processed,
        "Analyze request completed"
    );
    Ok(Json(record))
}

async fn read_analyze_form(mut multipart: Multipart) -> Result<AnalyzeRequest, AppError> {
    let mut file = None;
    let mut query = None;
    let mut user_id = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Some("query") => query = Some(field.text().await?),
            Some("user_id") => user_id = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(AnalyzeRequest {
        file,
        query: query
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string()),
        user_id: user_id
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
    })
}

/// Query parameters for `GET /search`.
#[derive(Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

async fn search_results<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SimilarityResults>, AppError>
where
    S: AnalyzerApi,
{
    let results = service.search(&params.query, params.top_k).await?;
    Ok(Json(results))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: AnalyzerApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Upload a blood-test report as multipart form data and receive { \"id\", \"query\", \"file_processed\", \"analysis\" }.",
                request_example: Some(json!({
                    "file": "blood_test_report.pdf",
                    "query": DEFAULT_QUERY,
                    "user_id": DEFAULT_USER_ID
                })),
            },
            CommandDescriptor {
                name: "search",
                method: "GET",
                path: "/search",
                description: "Similarity search over stored analyses. Returns { \"ids\", \"documents\", \"metadatas\", \"distances\" }.",
                request_example: Some(json!({ "query": "cholesterol", "top_k": 3 })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return analysis and search counters.",
                request_example: None,
            },
        ],
    })
}

/// Error wrapper converting failures into `{"detail": ...}` responses.
enum AppError {
    Analysis(AnalysisError),
    Multipart(MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Analysis(error) if error.is_client_error() => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Analysis(error) => {
                tracing::error!(error = %error, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            Self::Multipart(error) => (error.status(), error.body_text()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(inner: AnalysisError) -> Self {
        Self::Analysis(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::analysis::{AnalysisError, AnalysisRecord, AnalyzeRequest, AnalyzerApi};
    use crate::metrics::MetricsSnapshot;
    use crate::store::{SimilarityHit, SimilarityResults};
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Map, Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "bloodlens-test-boundary";

    #[derive(Default)]
    struct StubAnalyzer {
        requests: Mutex<Vec<AnalyzeRequest>>,
        searches: Mutex<Vec<(String, Option<usize>)>>,
    }

    #[async_trait]
    impl AnalyzerApi for StubAnalyzer {
        async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisRecord, AnalysisError> {
            let Some(file) = request.file.clone() else {
                return Err(AnalysisError::InputRejected("No file uploaded".into()));
            };
            if file.bytes.is_empty() {
                return Err(AnalysisError::ExtractionFailed);
            }
            let record = AnalysisRecord {
                id: "id-1".into(),
                query: request.query.clone(),
                file_processed: format!("uploads/x_{}", file.file_name),
                analysis: "📊 Report Summary:\n- Glucose: 95.0 → Normal (Normal range: 70-100)"
                    .into(),
            };
            self.requests.lock().await.push(request);
            Ok(record)
        }

        async fn search(
            &self,
            query: &str,
            top_k: Option<usize>,
        ) -> Result<SimilarityResults, AnalysisError> {
            self.searches.lock().await.push((query.to_string(), top_k));
            let mut metadata = Map::new();
            metadata.insert("user_id".into(), Value::String("guest".into()));
            Ok(SimilarityResults::single(vec![SimilarityHit {
                id: "id-1".into(),
                document: "Cholesterol: 250.0 → High".into(),
                metadata,
                distance: 0.25,
            }]))
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                reports_analyzed: 2,
                query_specific: 1,
                full_pipeline: 1,
                searches: 4,
            }
        }
    }

    fn router(stub: Arc<StubAnalyzer>) -> Router {
        create_router(stub, 1024 * 1024)
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn analyze_request(body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let response = router(Arc::default())
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "message": "Blood Test Report Analyser API is running" })
        );
    }

    #[tokio::test]
    async fn analyze_forwards_form_fields() {
        let stub = Arc::new(StubAnalyzer::default());
        let body = multipart_body(&[
            ("file", Some("report.pdf"), "Glucose: 95"),
            ("query", None, "glucose"),
            ("user_id", None, "patient-7"),
        ]);

        let response = router(stub.clone())
            .oneshot(analyze_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["id"], "id-1");
        assert_eq!(json["query"], "glucose");
        assert_eq!(json["file_processed"], "uploads/x_report.pdf");

        let requests = stub.requests.lock().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.user_id, "patient-7");
        let file = request.file.as_ref().expect("file forwarded");
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.bytes, b"Glucose: 95");
    }

    #[tokio::test]
    async fn analyze_applies_defaults() {
        let stub = Arc::new(StubAnalyzer::default());
        let body = multipart_body(&[("file", Some("report.pdf"), "Glucose: 95")]);

        let response = router(stub.clone())
            .oneshot(analyze_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let requests = stub.requests.lock().await;
        assert_eq!(requests[0].query, crate::analysis::DEFAULT_QUERY);
        assert_eq!(requests[0].user_id, "guest");
    }

    #[tokio::test]
    async fn analyze_without_file_is_bad_request() {
        let body = multipart_body(&[("query", None, "glucose")]);
        let response = router(Arc::default())
            .oneshot(analyze_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "detail": "No file uploaded" })
        );
    }

    #[tokio::test]
    async fn unreadable_upload_is_bad_request() {
        let body = multipart_body(&[("file", Some("empty.pdf"), "")]);
        let response = router(Arc::default())
            .oneshot(analyze_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["detail"],
            "Could not extract text from PDF"
        );
    }

    #[tokio::test]
    async fn search_passes_query_and_top_k() {
        let stub = Arc::new(StubAnalyzer::default());
        let response = router(stub.clone())
            .oneshot(
                Request::get("/search?query=cholesterol&top_k=2")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["ids"], json!([["id-1"]]));
        assert_eq!(json["distances"], json!([[0.25]]));
        assert_eq!(json["metadatas"][0][0]["user_id"], "guest");

        let searches = stub.searches.lock().await;
        assert_eq!(searches.as_slice(), &[("cholesterol".to_string(), Some(2))]);
    }

    #[tokio::test]
    async fn search_requires_query() {
        let response = router(Arc::default())
            .oneshot(Request::get("/search").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_route_returns_snapshot() {
        let response = router(Arc::default())
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "reports_analyzed": 2,
                "query_specific": 1,
                "full_pipeline": 1,
                "searches": 4
            })
        );
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let stub = Arc::new(StubAnalyzer::default());
        let body = multipart_body(&[("file", Some("big.pdf"), &"x".repeat(4096))]);
        let response = create_router(stub.clone(), 512)
            .oneshot(analyze_request(body))
            .await
            .expect("router response");
        assert!(response.status().is_client_error());
        assert!(stub.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn commands_catalog_exposes_analyze_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let analyze = commands
            .iter()
            .find(|cmd| cmd.name == "analyze")
            .expect("analyze command present");

        assert_eq!(analyze.method, "POST");
        assert_eq!(analyze.path, "/analyze");
        assert!(commands.iter().any(|cmd| cmd.path == "/search"));
    }
}
