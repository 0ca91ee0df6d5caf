//! Fluent builder for constructing a [`PatientSimulation`].

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use pa_agent::{EnvironmentSet, Patient};
use pa_core::{
    CoreError, EnvironmentId, InitialEnvironment, PatientRng, SimConfig, SimulationId, Step,
};
use pa_intelligence::{Intelligence, InteractionDispatcher};

use crate::{PatientSimulation, RunLogger, RunState, SimError, SimResult, StoppingEvaluator};

/// `log_every` values below this trigger a warning.
const FREQUENT_LOGGING_THRESHOLD: u64 = 5;

/// Fluent builder for [`PatientSimulation<I>`].
///
/// # Required inputs
///
/// - [`SimConfig`] — seed, initial environment, stopping condition, …
/// - [`Patient`] — from [`pa_agent::PatientBuilder`]
/// - [`EnvironmentSet`] — owned by this run; clone a pristine set per patient
/// - `I: Intelligence` — the decision policy
///
/// # Optional inputs (have defaults)
///
/// | Method                | Default                               |
/// |-----------------------|---------------------------------------|
/// | `.dispatcher(d)`      | `InteractionDispatcher::new()` (death only) |
/// | `.simulation_id(id)`  | fresh v4 UUID                         |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimulationBuilder::new(config, patient, environments, SampledIntelligence::new())
///     .dispatcher(dispatcher)
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimulationBuilder<I: Intelligence> {
    config:        SimConfig,
    patient:       Patient,
    environments:  EnvironmentSet,
    intelligence:  Arc<I>,
    dispatcher:    Option<InteractionDispatcher>,
    simulation_id: Option<SimulationId>,
}

impl<I: Intelligence> SimulationBuilder<I> {
    /// Create a builder with all required inputs.
    pub fn new(
        config:       SimConfig,
        patient:      Patient,
        environments: EnvironmentSet,
        intelligence: I,
    ) -> Self {
        Self::with_shared(config, patient, environments, Arc::new(intelligence))
    }

    /// Like [`new`](Self::new), for an intelligence shared between runs.
    pub fn with_shared(
        config:       SimConfig,
        patient:      Patient,
        environments: EnvironmentSet,
        intelligence: Arc<I>,
    ) -> Self {
        Self {
            config,
            patient,
            environments,
            intelligence,
            dispatcher:    None,
            simulation_id: None,
        }
    }

    pub fn dispatcher(mut self, dispatcher: InteractionDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn simulation_id(mut self, id: SimulationId) -> Self {
        self.simulation_id = Some(id);
        self
    }

    /// Validate inputs, resolve the initial environment, and return a
    /// ready-to-run [`PatientSimulation`].
    pub fn build(self) -> SimResult<PatientSimulation<I>> {
        self.config.validate()?;
        if self.environments.is_empty() {
            return Err(SimError::NoEnvironments);
        }
        if self.config.log_every < FREQUENT_LOGGING_THRESHOLD {
            warn!(
                log_every = self.config.log_every,
                "frequent logging slows down long simulations"
            );
        }

        let mut rng = PatientRng::new(self.config.seed, self.patient.patient_id);
        let current =
            resolve_initial(&self.config.initial_environment, &self.environments, &mut rng)?;

        let simulation_id = self.simulation_id.unwrap_or_else(SimulationId::new_v4);
        let logger = RunLogger::new(simulation_id, self.patient.patient_id, &self.config);

        // History may extend past the nominal start.
        let patient_time = self
            .patient
            .last_time()
            .map_or(self.patient.start_time(), |t| t.max(self.patient.start_time()));

        Ok(PatientSimulation {
            simulation_id,
            evaluator:    StoppingEvaluator::new(self.config.stopping_condition.clone()),
            config:       self.config,
            patient:      self.patient,
            environments: self.environments,
            dispatcher:   self.dispatcher.unwrap_or_default(),
            intelligence: self.intelligence,
            rng,
            logger,
            state:        RunState::Running,
            step:         Step::ZERO,
            current,
            patient_time,
            started:      Instant::now(),
            announced:    false,
        })
    }
}

fn resolve_initial(
    initial:      &InitialEnvironment,
    environments: &EnvironmentSet,
    rng:          &mut PatientRng,
) -> SimResult<EnvironmentId> {
    let id = match initial {
        InitialEnvironment::ById(id) => *id,
        InitialEnvironment::ByName(name) => environments
            .by_name(name)
            .map(|e| e.environment_id)
            .ok_or_else(|| CoreError::EnvironmentNameNotFound(name.clone()))?,
        InitialEnvironment::ByProbability(table) => {
            if let Some(&(missing, _)) = table.iter().find(|(id, _)| !environments.contains(*id)) {
                return Err(SimError::EnvironmentNotFound(missing));
            }
            let weights: Vec<f64> = table.iter().map(|&(_, p)| p).collect();
            let index = rng.pick_weighted(&weights).ok_or_else(|| {
                CoreError::Config("initial environment probabilities are degenerate".into())
            })?;
            table[index].0
        }
    };
    if !environments.contains(id) {
        return Err(SimError::EnvironmentNotFound(id));
    }
    Ok(id)
}
