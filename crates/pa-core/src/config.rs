//! Run configuration.
//!
//! The engine consumes configuration; it never reads files.  Applications
//! build a [`SimConfig`] in code or deserialize one (with the `serde`
//! feature) from whatever format they use, then call
//! [`SimConfig::validate`] before handing it to the simulation builder.

use chrono::Duration;

use crate::{CoreError, CoreResult, EnvironmentId, TimeSpan};

/// Fail-safe step limit used when the caller does not set one.
pub const DEFAULT_HARD_STOP: u64 = 100_000_000;

// ── DuplicateAction ───────────────────────────────────────────────────────────

/// What to do when a new record entry has the same
/// `(patient_time, environment_id, interactions)` key as an existing one.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DuplicateAction {
    /// Drop the new entry; the step proceeds.
    #[default]
    Skip,
    /// Replace the existing entry (and its environment visit) in place.
    Overwrite,
    /// Reject the whole step with `DuplicateRecordEntry`.
    Error,
}

// ── InitialEnvironment ────────────────────────────────────────────────────────

/// How each patient's first environment is chosen.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InitialEnvironment {
    ById(EnvironmentId),
    ByName(String),
    /// Drawn once per patient, before the run starts, from `(id, weight)`
    /// pairs.  Weights need not sum to one.
    ByProbability(Vec<(EnvironmentId, f64)>),
}

impl Default for InitialEnvironment {
    fn default() -> Self {
        InitialEnvironment::ById(EnvironmentId(0))
    }
}

// ── StoppingCondition ─────────────────────────────────────────────────────────

/// Declarative predicate for normal run termination.
///
/// Evaluated after every step (and once before the first).  Every variant is
/// monotonic over a run: once it holds it keeps holding.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StoppingCondition {
    /// At least `n` steps completed.
    MaxNumSteps(u64),
    /// Patient clock has advanced at least this far past `start_time`.
    MaxPatientTime(TimeSpan),
    /// Wall clock has advanced at least this far since the run started.
    MaxRealTime(TimeSpan),
    /// The patient's conditions table holds a row with this name.
    ConditionRecorded(String),
    /// Some record entry lists this interaction.
    InteractionOccurred(String),
    /// The patient is no longer alive.
    PatientDeceased,
    Any(Vec<StoppingCondition>),
    All(Vec<StoppingCondition>),
}

impl Default for StoppingCondition {
    fn default() -> Self {
        StoppingCondition::MaxNumSteps(1_000)
    }
}

impl StoppingCondition {
    fn validate(&self) -> CoreResult<()> {
        match self {
            StoppingCondition::MaxPatientTime(span) | StoppingCondition::MaxRealTime(span) => {
                match span.to_duration() {
                    None => Err(CoreError::Config(format!(
                        "stopping condition time span is out of range: {span:?}"
                    ))),
                    Some(d) if d < Duration::zero() => Err(CoreError::Config(format!(
                        "stopping condition time span must not be negative: {span:?}"
                    ))),
                    Some(_) => Ok(()),
                }
            }
            StoppingCondition::ConditionRecorded(name)
            | StoppingCondition::InteractionOccurred(name) => {
                if name.is_empty() {
                    return Err(CoreError::Config(
                        "stopping condition name must not be empty".into(),
                    ));
                }
                Ok(())
            }
            StoppingCondition::Any(inner) | StoppingCondition::All(inner) => {
                if inner.is_empty() {
                    return Err(CoreError::Config(
                        "stopping condition combinator must not be empty".into(),
                    ));
                }
                inner.iter().try_for_each(StoppingCondition::validate)
            }
            StoppingCondition::MaxNumSteps(_) | StoppingCondition::PatientDeceased => Ok(()),
        }
    }
}

// ── ValidationConfig ──────────────────────────────────────────────────────────

/// Bundle validation settings used by the record exporter.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidationConfig {
    /// Validate exported bundles at all.
    pub enabled: bool,
    /// Base URL of a FHIR server exposing `$validate`.  `None` means offline
    /// structural validation only.
    pub server_url: Option<String>,
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level run configuration, shared by every patient in a cohort.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Master RNG seed.  The same seed always produces identical records.
    pub seed: u64,

    pub initial_environment: InitialEnvironment,

    pub stopping_condition: StoppingCondition,

    /// Maximum number of steps regardless of the stopping condition.
    /// Reaching it is reported as an anomaly.
    pub hard_stop: u64,

    /// Emit a log record every N steps.  Must be at least 1.
    pub log_every: u64,

    /// Buffer a log record for every step and flush the buffer on each
    /// `log_every` boundary, instead of logging only the boundary step.
    pub log_intermediate: bool,

    /// Include the step's record entries in each log record.
    pub log_patient_record: bool,

    pub duplicate_action: DuplicateAction,

    pub validation: ValidationConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed:                0,
            initial_environment: InitialEnvironment::default(),
            stopping_condition:  StoppingCondition::default(),
            hard_stop:           DEFAULT_HARD_STOP,
            log_every:           1,
            log_intermediate:    false,
            log_patient_record:  false,
            duplicate_action:    DuplicateAction::default(),
            validation:          ValidationConfig::default(),
        }
    }
}

impl SimConfig {
    /// Check internal consistency.  Environment references are checked later,
    /// against the actual environment set, by the simulation builder.
    pub fn validate(&self) -> CoreResult<()> {
        if self.log_every == 0 {
            return Err(CoreError::Config("log_every must be at least 1".into()));
        }
        if let InitialEnvironment::ByProbability(table) = &self.initial_environment {
            if table.is_empty() {
                return Err(CoreError::Config(
                    "initial environment probability table is empty".into(),
                ));
            }
            if table.iter().any(|&(_, p)| !p.is_finite() || p < 0.0) {
                return Err(CoreError::Config(
                    "initial environment probabilities must be finite and non-negative".into(),
                ));
            }
            if table.iter().all(|&(_, p)| p == 0.0) {
                return Err(CoreError::Config(
                    "initial environment probabilities are all zero".into(),
                ));
            }
        }
        if let Some(url) = &self.validation.server_url {
            if url.trim().is_empty() {
                return Err(CoreError::Config("validation server_url is blank".into()));
            }
        }
        self.stopping_condition.validate()
    }
}
