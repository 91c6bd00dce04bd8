//! Core error types for syllabus-core.
//!
//! Only [`CoreError::ExtractionEmpty`] aborts a parse. Problems with a single
//! line are reported as [`LineIssue`] values and end up in the warnings list
//! of a preview.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for syllabus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The input document contained no usable text
    #[error("ExtractionEmpty: no text could be extracted from the document")]
    ExtractionEmpty,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bulk-create collaborator rejected the drafts
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Home or config directory unavailable
    #[error("Configuration directory unavailable: {0}")]
    DirUnavailable(String),
}

/// A non-fatal problem with one line of the source document.
///
/// `line_index` is zero-based; the rendered message is one-based so it lines
/// up with what a person sees in an editor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineIssue {
    #[error("line {}: UnresolvableDate: could not resolve '{token}'", .line_index + 1)]
    UnresolvableDate { line_index: usize, token: String },

    #[error("line {}: InvalidRange: page range '{text}' ends before it starts", .line_index + 1)]
    InvalidRange { line_index: usize, text: String },

    /// Page reference with no date on the line and none seen before it.
    #[error("line {}: UnresolvableDate: no due date on or before this line", .line_index + 1)]
    MissingDate { line_index: usize },
}

impl LineIssue {
    pub fn line_index(&self) -> usize {
        match self {
            LineIssue::UnresolvableDate { line_index, .. }
            | LineIssue::InvalidRange { line_index, .. }
            | LineIssue::MissingDate { line_index } => *line_index,
        }
    }
}

impl CoreError {
    /// Wrap a failure reported by a storage collaborator.
    pub fn storage<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CoreError::Storage {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_issue_messages_are_one_based() {
        let issue = LineIssue::InvalidRange {
            line_index: 2,
            text: "pp. 30-10".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "line 3: InvalidRange: page range 'pp. 30-10' ends before it starts"
        );
        assert_eq!(issue.line_index(), 2);
    }

    #[test]
    fn extraction_empty_names_its_condition() {
        assert!(CoreError::ExtractionEmpty.to_string().starts_with("ExtractionEmpty"));
    }
}
