use chrono::{DateTime, Utc};
use thiserror::Error;

use pa_core::{EnvironmentId, PatientId};

use crate::TableKind;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(
        "duplicate record entry for {patient} at {patient_time} in {environment} \
         (interactions {interactions:?})"
    )]
    DuplicateRecordEntry {
        patient:      PatientId,
        patient_time: DateTime<Utc>,
        environment:  EnvironmentId,
        interactions: Vec<String>,
    },

    #[error("record entry for {patient} at {proposed} is earlier than the record tail {previous}")]
    NonMonotonicTime {
        patient:  PatientId,
        previous: DateTime<Utc>,
        proposed: DateTime<Utc>,
    },

    #[error("history entry for {patient} references {environment}; history entries must not belong to an environment")]
    HistoryInEnvironment {
        patient:     PatientId,
        environment: EnvironmentId,
    },

    #[error("{table:?} table has more than one row named {name:?} starting at {start}")]
    DuplicateTableRow {
        table: TableKind,
        name:  String,
        start: DateTime<Utc>,
    },

    #[error("environment id {0} is reserved for entries outside any environment")]
    SentinelEnvironmentId(EnvironmentId),

    #[error("environment {0} is defined more than once")]
    DuplicateEnvironment(EnvironmentId),

    #[error("environment {0} not found")]
    EnvironmentNotFound(EnvironmentId),
}

pub type AgentResult<T> = Result<T, AgentError>;
