//! Interaction handlers.

use pa_agent::{Environment, Patient};
use pa_core::{PatientRng, PatientTime, Step};

use crate::InteractionOutcome;

/// Everything a handler may read while producing an outcome.
pub struct InteractionContext<'a> {
    /// Name the handler was dispatched under.
    pub interaction:  &'a str,
    pub patient:      &'a Patient,
    pub environment:  &'a Environment,
    pub patient_time: PatientTime,
    pub step:         Step,
}

/// Produces the effects of one named interaction.
///
/// Handlers describe what happened; they never mutate the patient or the
/// environment.  Any `Fn(&InteractionContext, &mut PatientRng) ->
/// InteractionOutcome` closure is a handler.
pub trait InteractionHandler: Send + Sync + 'static {
    fn handle(&self, ctx: &InteractionContext<'_>, rng: &mut PatientRng) -> InteractionOutcome;
}

impl<F> InteractionHandler for F
where
    F: Fn(&InteractionContext<'_>, &mut PatientRng) -> InteractionOutcome + Send + Sync + 'static,
{
    fn handle(&self, ctx: &InteractionContext<'_>, rng: &mut PatientRng) -> InteractionOutcome {
        self(ctx, rng)
    }
}

/// Built-in handler for [`pa_agent::DEATH_INTERACTION`].
pub(crate) struct DeathHandler;

impl InteractionHandler for DeathHandler {
    fn handle(&self, _ctx: &InteractionContext<'_>, _rng: &mut PatientRng) -> InteractionOutcome {
        InteractionOutcome::new().death()
    }
}
