//! Reference intelligence: random interaction, sampled next hop.

use chrono::TimeDelta;

use pa_agent::{DEATH_INTERACTION, PatientRecordEntry};
use pa_core::PatientRng;

use crate::{Decision, Intelligence, IntelligenceError, IntelligenceResult, StepContext};

/// Each step, picks one interaction uniformly at random from those the
/// current environment declares and the dispatcher can handle (`death`
/// excluded), dispatches it, and records one entry with its effects.
///
/// The next environment is drawn from the outcome's proposed candidates by
/// probability, and the patient clock advances by that candidate's delay.
/// With no candidates the patient stays put and the clock does not move.
/// A negative or unrepresentable delay fails the step with
/// [`IntelligenceError::InvalidDelay`].
///
/// An optional per-step `death_probability` dispatches `death` instead.
#[derive(Clone, Debug, Default)]
pub struct SampledIntelligence {
    death_probability: f64,
}

impl SampledIntelligence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability of dispatching `death` on any step (clamped to [0, 1]).
    pub fn with_death_probability(mut self, p: f64) -> Self {
        self.death_probability = p.clamp(0.0, 1.0);
        self
    }

    fn pick_interaction<'c>(
        &self,
        ctx: &StepContext<'c>,
        rng: &mut PatientRng,
    ) -> Option<&'c str> {
        if self.death_probability > 0.0 && rng.gen_bool(self.death_probability) {
            return Some(DEATH_INTERACTION);
        }
        let candidates: Vec<&'c str> = ctx
            .environment
            .interactions()
            .filter(|name| *name != DEATH_INTERACTION && ctx.dispatcher.is_registered(name))
            .collect();
        rng.choose(&candidates).copied()
    }
}

impl Intelligence for SampledIntelligence {
    fn decide(&self, ctx: &StepContext<'_>, rng: &mut PatientRng) -> IntelligenceResult<Decision> {
        let Some(interaction) = self.pick_interaction(ctx, rng) else {
            return Ok(Decision::stay());
        };

        let outcome = ctx.dispatch(interaction, rng)?;
        let entry = PatientRecordEntry::new(ctx.patient_time, ctx.environment.environment_id)
            .interaction(interaction)
            .effects(outcome.effects.iter().cloned());

        let mut decision = Decision::stay().entry(entry);
        decision.documents = outcome.documents.clone();
        if let Some(next) = outcome.sample_next(rng) {
            let arrival = next
                .delay
                .to_duration()
                .filter(|delay| *delay >= TimeDelta::zero())
                .and_then(|delay| ctx.patient_time.checked_add_signed(delay))
                .ok_or(IntelligenceError::InvalidDelay {
                    environment: next.environment_id,
                    delay:       next.delay,
                })?;
            decision = decision.move_to(next.environment_id).advance_to(arrival);
        }
        Ok(decision)
    }
}
