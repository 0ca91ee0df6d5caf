//! Engine-wide base error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant where they need to surface configuration problems.

use thiserror::Error;

use crate::EnvironmentId;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("environment {0} not found")]
    EnvironmentNotFound(EnvironmentId),

    #[error("environment named {0:?} not found")]
    EnvironmentNameNotFound(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `pa-core`.
pub type CoreResult<T> = Result<T, CoreError>;
