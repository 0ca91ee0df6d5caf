use thiserror::Error;

use pa_agent::AgentError;
use pa_core::{CoreError, EnvironmentId, PatientTime};
use pa_intelligence::{DispatchError, IntelligenceError};

use crate::RunState;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("environment set is empty")]
    NoEnvironments,

    #[error("environment {0} not found")]
    EnvironmentNotFound(EnvironmentId),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Intelligence(IntelligenceError),

    #[error("patient clock cannot move backwards from {current} to {proposed}")]
    ClockBackwards {
        current:  PatientTime,
        proposed: PatientTime,
    },

    #[error("run already stopped ({0})")]
    AlreadyStopped(RunState),
}

impl From<IntelligenceError> for SimError {
    fn from(e: IntelligenceError) -> Self {
        match e {
            IntelligenceError::Dispatch(d) => SimError::Dispatch(d),
            other => SimError::Intelligence(other),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;

/// Anomalous termination: the run hit `hard_stop` before its stopping
/// condition held.  Carried in [`RunOutcome`](crate::RunOutcome), never
/// returned as an `Err`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
#[error("hard stop reached after {steps} steps (limit {hard_stop}) without meeting the stopping condition")]
pub struct HardStopReached {
    pub hard_stop: u64,
    pub steps:     u64,
}
