//! Error types for pa-output.

use thiserror::Error;

/// Errors that can occur when writing output.
///
/// Bundle validation problems are never errors; they are reported as
/// [`Diagnostic`](crate::Diagnostic)s on the export result.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "remote-validation")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
