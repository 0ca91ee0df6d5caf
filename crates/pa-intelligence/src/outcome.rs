//! What a handler returns.

use pa_agent::{ClinicalEvent, Effect, PatientDocument};
use pa_core::{EnvironmentId, PatientRng, TimeSpan};

/// A candidate next hop proposed by an interaction.
#[derive(Clone, PartialEq, Debug)]
pub struct NextEnvironment {
    pub environment_id: EnvironmentId,
    /// Relative weight; need not sum to one across candidates.
    pub probability:    f64,
    /// Patient time until the patient reaches that environment.
    pub delay:          TimeSpan,
}

/// Effects, documents and proposed next environments of one interaction.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct InteractionOutcome {
    pub effects:           Vec<Effect>,
    pub documents:         Vec<PatientDocument>,
    pub next_environments: Vec<NextEnvironment>,
}

impl InteractionOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn event(self, event: ClinicalEvent) -> Self {
        self.effect(Effect::Event(event))
    }

    pub fn death(self) -> Self {
        self.effect(Effect::Death)
    }

    pub fn document(mut self, document: PatientDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn next(mut self, environment_id: EnvironmentId, probability: f64, delay: TimeSpan) -> Self {
        self.next_environments.push(NextEnvironment { environment_id, probability, delay });
        self
    }

    /// Draw one next environment in proportion to the proposed
    /// probabilities.  `None` when nothing (or nothing with positive weight)
    /// was proposed.
    pub fn sample_next(&self, rng: &mut PatientRng) -> Option<&NextEnvironment> {
        let weights: Vec<f64> = self.next_environments.iter().map(|n| n.probability).collect();
        rng.pick_weighted(&weights).map(|i| &self.next_environments[i])
    }
}
