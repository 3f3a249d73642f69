//! Error and warning types for the mrkdwn localization pipeline.
//!
//! The crate distinguishes hard faults from recoverable anomalies. Hard
//! faults (`MrkdwnError`) abort processing of a document: broken source
//! content such as an unterminated angle-bracket tag, or a document that
//! is not JSON at all. Recoverable anomalies — a translation referencing
//! a placeholder the source never defined, unbalanced markup absorbed
//! during extraction — surface as [`MismatchWarning`] records carried in
//! result structs, so callers and tests can assert on them without
//! scraping logs.

use thiserror::Error;

/// Errors raised while parsing or localizing a mrkdwn document
#[derive(Debug, Error)]
pub enum MrkdwnError {
    /// Source markup contains a tag that is neither a recognized
    /// open/close pattern nor a self-closing one. This indicates broken
    /// source content, not a translation-quality issue, and is the one
    /// case the pipeline does not route around.
    #[error("malformed tag at line {line}, column {column}: {message}")]
    MalformedTag {
        line: usize,
        column: usize,
        message: String,
    },

    /// The document failed to parse as JSON
    #[error("failed to parse document: {0}")]
    DocumentParse(#[from] serde_json::Error),

    /// The document root was not a JSON object
    #[error("document root must be a JSON object")]
    NotAnObject,

    /// I/O failure while reading or writing a document
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mrkdwn operations
pub type MrkdwnResult<T> = Result<T, MrkdwnError>;

/// A structured record of a placeholder mismatch absorbed during
/// localization.
///
/// Emitted when a translation references a component index with no
/// corresponding entry in the source side-table, or closes a component
/// that was never opened. The offending fragment is dropped from the
/// reconstructed output and processing continues; the warning names
/// everything needed to report the bad translation upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchWarning {
    /// Resource key the translation belongs to
    pub key: String,
    /// Target locale being localized
    pub locale: String,
    /// Source placeholder-string the translation was made from
    pub source: String,
    /// The translation containing the mismatch
    pub translation: String,
    /// The placeholder index that could not be resolved
    pub placeholder_index: usize,
    /// Human-readable description of the mismatch
    pub message: String,
}

impl std::fmt::Display for MismatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "placeholder mismatch for key '{}' ({}): {} (source: {:?}, translation: {:?})",
            self.key, self.locale, self.message, self.source, self.translation
        )
    }
}
