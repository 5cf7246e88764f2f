//! Text extraction from uploaded report files.

use std::path::Path;
use thiserror::Error;

/// Errors raised while reading text out of a report file.
///
/// Messages carry the `Error` prefix understood by [`crate::report::is_unreadable`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The PDF could not be opened or decoded.
    #[error("Error reading PDF: {0}")]
    Pdf(String),
    /// The file could not be read from disk.
    #[error("Error reading file: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of plain text for a stored report file.
pub trait PdfTextExtractor: Send + Sync {
    /// Return the concatenated, trimmed page text of the file at `path`.
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractText;

impl PdfTextExtractor for PdfExtractText {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let raw = pdf_extract::extract_text(path).map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "PDF extraction failed");
            ExtractionError::Pdf(err.to_string())
        })?;
        let text = normalize_pages(&raw);
        tracing::debug!(path = %path.display(), chars = text.len(), "Extracted PDF text");
        Ok(text)
    }
}

/// Extractor that reads the file as UTF-8 text; used for plain-text reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PdfTextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(normalize_pages(&raw))
    }
}

/// Trim every form-feed separated page and join the pages with newlines.
pub fn normalize_pages(raw: &str) -> String {
    raw.split('\u{c}')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pages_are_trimmed_and_joined() {
        let raw = "  Page one\n\n\u{c}\n  Hemoglobin: 13  \n\u{c}   ";
        assert_eq!(normalize_pages(raw), "Page one\nHemoglobin: 13");
    }

    #[test]
    fn plain_text_extractor_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "  Glucose: 88  ").expect("write");
        let text = PlainTextExtractor
            .extract_text(file.path())
            .expect("extract");
        assert_eq!(text, "Glucose: 88");
    }

    #[test]
    fn pdf_errors_carry_error_prefix() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"definitely not a pdf").expect("write");
        let error = PdfExtractText
            .extract_text(file.path())
            .expect_err("invalid pdf");
        assert!(crate::report::is_unreadable(&error.to_string()));
    }

    #[test]
    fn missing_file_is_an_error() {
        let error = PlainTextExtractor
            .extract_text(Path::new("/nonexistent/report.txt"))
            .expect_err("missing file");
        assert!(matches!(error, ExtractionError::Io(_)));
    }
}
