//! Request, response, and error types for the analysis service.

use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Query applied when the client does not send one.
pub const DEFAULT_QUERY: &str = "Summarise my Blood Test Report and provide health recommendations";
/// User id applied when the client does not send one.
pub const DEFAULT_USER_ID: &str = "guest";

pub(crate) const NO_FILE_UPLOADED: &str = "No file uploaded";
pub(crate) const EMPTY_FILENAME: &str = "Empty filename";
pub(crate) const COULD_NOT_EXTRACT: &str = "Could not extract text from PDF";

/// Errors emitted while handling analysis and search requests.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request was rejected before any processing.
    #[error("{0}")]
    InputRejected(String),
    /// No usable text could be read from the uploaded file.
    #[error("Could not extract text from PDF")]
    ExtractionFailed,
    /// The upload could not be written to disk.
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    /// The persistence collaborator failed.
    #[error("Failed to persist analysis: {0}")]
    Store(#[from] StoreError),
}

impl AnalysisError {
    /// Whether the failure is attributable to the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InputRejected(_) | Self::ExtractionFailed)
    }
}

/// Uploaded report file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name supplied by the client.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Input to [`crate::analysis::AnalysisService::analyze`].
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    /// Uploaded report, if the client sent one.
    pub file: Option<UploadedFile>,
    /// Free-text query.
    pub query: String,
    /// Requesting user.
    pub user_id: String,
}

impl AnalyzeRequest {
    /// Request for `file` with the default query and user.
    pub fn with_file(file: UploadedFile) -> Self {
        Self {
            file: Some(file),
            query: DEFAULT_QUERY.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

/// Response body of a successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRecord {
    /// Id the result was stored under.
    pub id: String,
    /// Query the analysis answered.
    pub query: String,
    /// Path the upload was saved to.
    pub file_processed: String,
    /// Analysis text.
    pub analysis: String,
}
