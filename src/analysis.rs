//! Request handling: upload persistence, branch selection, and result storage.

mod service;
pub mod types;

pub use service::{AnalysisService, AnalyzerApi, ServiceSettings};
pub use types::{
    AnalysisError, AnalysisRecord, AnalyzeRequest, DEFAULT_QUERY, DEFAULT_USER_ID, UploadedFile,
};
