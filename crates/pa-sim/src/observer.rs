//! Simulation observer trait for progress reporting and data collection.

use pa_core::{PatientId, SimulationId};

use crate::{RunOutcome, StepLogRecord};

/// Callbacks invoked by [`PatientSimulation`](crate::PatientSimulation) at
/// key points of a run.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter;
///
/// impl SimObserver for ProgressPrinter {
///     fn on_step(&mut self, record: &StepLogRecord) {
///         println!("{} {}: {:?}", record.patient_id, record.step, record.interactions);
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called once before the first step of `run`.
    fn on_run_start(&mut self, _simulation_id: SimulationId, _patient_id: PatientId) {}

    /// Called for every record the run's logger emits, honouring the
    /// `log_every` / `log_intermediate` cadence.
    fn on_step(&mut self, _record: &StepLogRecord) {}

    /// Called once when the run reaches a stop state.
    fn on_run_end(&mut self, _outcome: &RunOutcome) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
