//! Read-only simulation state passed to the intelligence each step.

use pa_agent::{Environment, EnvironmentSet, Patient};
use pa_core::{PatientRng, PatientTime, SimulationId, Step};

use crate::{DispatchResult, InteractionContext, InteractionDispatcher, InteractionOutcome};

/// A read-only snapshot of one run, built by the simulation loop before
/// every call to [`Intelligence::decide`](crate::Intelligence::decide).
///
/// All borrows live for the duration of the decide phase; the loop never
/// mutates the patient or the environments while a `StepContext` exists.
pub struct StepContext<'a> {
    pub simulation_id: SimulationId,
    pub step:          Step,
    /// Current patient clock.
    pub patient_time:  PatientTime,
    pub patient:       &'a Patient,
    /// Environment the patient is currently in.
    pub environment:   &'a Environment,
    pub environments:  &'a EnvironmentSet,
    pub dispatcher:    &'a InteractionDispatcher,
}

impl<'a> StepContext<'a> {
    #[inline]
    pub fn new(
        simulation_id: SimulationId,
        step:          Step,
        patient_time:  PatientTime,
        patient:       &'a Patient,
        environment:   &'a Environment,
        environments:  &'a EnvironmentSet,
        dispatcher:    &'a InteractionDispatcher,
    ) -> Self {
        Self { simulation_id, step, patient_time, patient, environment, environments, dispatcher }
    }

    /// Whether the patient is physically in the current environment.
    #[inline]
    pub fn patient_present(&self) -> bool {
        self.environment.patient_present
    }

    /// Dispatch `interaction` in the current environment at the current
    /// patient time.
    pub fn dispatch(
        &self,
        interaction: &str,
        rng: &mut PatientRng,
    ) -> DispatchResult<InteractionOutcome> {
        let ctx = InteractionContext {
            interaction,
            patient:      self.patient,
            environment:  self.environment,
            patient_time: self.patient_time,
            step:         self.step,
        };
        self.dispatcher.dispatch(&ctx, rng)
    }
}
