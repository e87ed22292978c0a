//! Error types for the card renderer

use serde::Serialize;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single schema violation found while validating an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Query parameter the issue refers to (`icon`, `text`)
    pub path: String,
    /// Human readable description
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while serving a card
#[derive(Error, Debug)]
pub enum Error {
    /// The inbound query failed schema validation (client error)
    #[error("Invalid request: {}", summarize(.0))]
    Validation(Vec<Issue>),

    /// The type service stylesheet could not be fetched
    #[error("Font stylesheet unavailable: {0}")]
    StylesheetUnavailable(String),

    /// The stylesheet did not reference an opentype/truetype resource
    #[error("Font resource not found in stylesheet: {0}")]
    ResourceNotFound(String),

    /// The font binary could not be fetched or read
    #[error("Font bytes unavailable: {0}")]
    FontBytesUnavailable(String),

    /// Layout computation failed
    #[error("Layout failed: {0}")]
    LayoutError(String),

    /// Rasterization failed
    #[error("Rasterization failed: {0}")]
    RasterError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

fn summarize(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// True for errors caused by the caller (reported as 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for the three upstream font failures.
    pub fn is_upstream_font_error(&self) -> bool {
        matches!(
            self,
            Error::StylesheetUnavailable(_)
                | Error::ResourceNotFound(_)
                | Error::FontBytesUnavailable(_)
        )
    }

    /// HTTP status this error surfaces as.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}
