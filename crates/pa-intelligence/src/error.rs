use thiserror::Error;

use pa_core::{EnvironmentId, TimeSpan};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("interaction {0:?} has no registered handler")]
    UnknownInteraction(String),

    #[error("interaction {interaction:?} is not supported by {environment}")]
    UnsupportedInteraction {
        interaction: String,
        environment: EnvironmentId,
    },

    #[error("interaction name {0:?} is reserved")]
    ReservedName(String),

    #[error("interaction {0:?} is already registered")]
    AlreadyRegistered(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("intelligence failed: {0}")]
    Decision(String),

    #[error("delay {delay:?} before moving to {environment} is negative or out of range")]
    InvalidDelay {
        environment: EnvironmentId,
        delay:       TimeSpan,
    },
}

pub type IntelligenceResult<T> = Result<T, IntelligenceError>;
