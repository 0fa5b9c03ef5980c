// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared error taxonomy for indexing, retrieval and the study-aid pipeline

use thiserror::Error;

/// Errors surfaced by ingestion, chat and pipeline operations.
///
/// Every external call is attempted exactly once; there is no retry layer.
/// Provider failures carry the upstream message verbatim so the ingestion
/// endpoints can echo it back in their JSON error body.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Provider request failed: {0}")]
    Provider(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

impl IndexError {
    /// Shorthand for wrapping any provider-side failure.
    pub fn provider(err: impl std::fmt::Display) -> Self {
        IndexError::Provider(err.to_string())
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        IndexError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(IndexError::EmptyDocument.to_string(), "Document is empty");
        assert_eq!(
            IndexError::UnsupportedType("docx".to_string()).to_string(),
            "Unsupported file type: docx"
        );
    }

    #[test]
    fn test_provider_shorthand() {
        let err = IndexError::provider("connection reset");
        assert!(matches!(err, IndexError::Provider(msg) if msg == "connection reset"));
    }
}
