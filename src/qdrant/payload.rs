//! Helpers for constructing and hashing Qdrant payloads.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Payload key holding the stored document text.
pub const DOCUMENT_KEY: &str = "document";

/// Build the payload object stored alongside each analysis vector.
pub(crate) fn build_payload(document: &str, metadata: &Map<String, Value>) -> Map<String, Value> {
    let mut payload = metadata.clone();
    payload.insert(DOCUMENT_KEY.into(), Value::String(document.to_string()));
    payload
}

/// Split a stored payload back into its document text and metadata.
pub(crate) fn split_payload(mut payload: Map<String, Value>) -> (String, Map<String, Value>) {
    let document = match payload.remove(DOCUMENT_KEY) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    (document, payload)
}

/// Compute a deterministic SHA-256 hex digest of raw content.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for payload storage.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
