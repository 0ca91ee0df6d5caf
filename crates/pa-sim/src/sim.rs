//! The `PatientSimulation` struct and its step loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::warn;

use pa_agent::{EnvironmentSet, Patient};
use pa_core::{EnvironmentId, PatientId, PatientRng, PatientTime, SimConfig, SimulationId, Step};
use pa_intelligence::{Intelligence, InteractionDispatcher, StepContext};

use crate::apply::{StepInputs, commit_step, plan_step};
use crate::{
    HardStopReached, RunLogger, RunProgress, RunState, SimError, SimObserver, SimResult,
    StepLogRecord, StoppingEvaluator,
};

// ── Reports ───────────────────────────────────────────────────────────────────

/// Summary of one successfully applied step.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StepReport {
    pub step:        Step,
    /// Entries appended to the record.
    pub appended:    usize,
    /// Entries that replaced an existing duplicate.
    pub overwritten: usize,
    /// Duplicate entries dropped under `DuplicateAction::Skip`.
    pub skipped:     usize,
    /// Run state after the step.
    pub state:       RunState,
}

/// Final result of a run.
#[derive(Clone, PartialEq, Debug)]
pub struct RunOutcome {
    pub simulation_id: SimulationId,
    pub patient_id:    PatientId,
    pub state:         RunState,
    /// Completed steps.
    pub steps:         u64,
    pub patient_time:  PatientTime,
    pub record_len:    usize,
    /// Set when the run ended in `StoppedHardLimit`.
    pub hard_stop:     Option<HardStopReached>,
}

// ── PatientSimulation ─────────────────────────────────────────────────────────

/// One patient's run through a private copy of the environment set.
///
/// Holds all run state and drives the step loop:
///
/// 1. **Decide**: call [`Intelligence::decide`] with a read-only
///    [`StepContext`] and the patient's RNG.
/// 2. **Validate**: check the whole decision; reject the step on the first
///    problem, leaving patient and environments untouched.
/// 3. **Commit**: append/replace record entries, mirror them as environment
///    visits, attach documents.
/// 4. **Log**: via the run's [`RunLogger`].
/// 5. **Terminate?**: death, then the stopping condition, then `hard_stop`.
/// 6. **Move**: to the selected next environment.
///
/// Create via [`SimulationBuilder`](crate::SimulationBuilder).
pub struct PatientSimulation<I: Intelligence> {
    pub(crate) simulation_id: SimulationId,
    pub(crate) config:        SimConfig,
    pub(crate) patient:       Patient,
    pub(crate) environments:  EnvironmentSet,
    pub(crate) dispatcher:    InteractionDispatcher,
    pub(crate) intelligence:  Arc<I>,
    pub(crate) rng:           PatientRng,
    pub(crate) evaluator:     StoppingEvaluator,
    pub(crate) logger:        RunLogger,
    pub(crate) state:         RunState,
    /// Completed steps; also the index of the next step.
    pub(crate) step:          Step,
    pub(crate) current:       EnvironmentId,
    pub(crate) patient_time:  PatientTime,
    pub(crate) started:       Instant,
    /// `on_run_start` has fired.
    pub(crate) announced:     bool,
}

impl<I: Intelligence> PatientSimulation<I> {
    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn simulation_id(&self) -> SimulationId {
        self.simulation_id
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Completed steps.
    pub fn step(&self) -> Step {
        self.step
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn environments(&self) -> &EnvironmentSet {
        &self.environments
    }

    pub fn current_environment(&self) -> EnvironmentId {
        self.current
    }

    pub fn patient_time(&self) -> PatientTime {
        self.patient_time
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Hand the finished patient and environments to the exporter.
    pub fn into_parts(self) -> (Patient, EnvironmentSet) {
        (self.patient, self.environments)
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run until a stop state is reached.
    ///
    /// Termination is checked once before the first step, so a zero-step
    /// budget (or an already deceased patient) stops immediately.  A step
    /// error is returned as-is; the run stays `Running` at the failed step
    /// and may be resumed.  `on_run_start` fires on the first call only.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunOutcome> {
        if !self.state.is_running() {
            return Err(SimError::AlreadyStopped(self.state));
        }
        if !self.announced {
            self.announced = true;
            observer.on_run_start(self.simulation_id, self.patient.patient_id);
        }

        if self.evaluate_termination() {
            self.finish(observer);
        }
        while self.state.is_running() {
            self.step_once(observer)?;
        }
        Ok(self.outcome())
    }

    /// Run at most `n` steps, stopping early on termination.
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_steps<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<RunState> {
        for _ in 0..n {
            if !self.state.is_running() {
                break;
            }
            self.step_once(observer)?;
        }
        Ok(self.state)
    }

    /// Execute exactly one step.
    ///
    /// # Errors
    ///
    /// - [`SimError::AlreadyStopped`] if the run has terminated.
    /// - Any decide or validation error; the step is then not applied and
    ///   the step counter does not advance.
    pub fn step_once<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<StepReport> {
        if !self.state.is_running() {
            return Err(SimError::AlreadyStopped(self.state));
        }
        let step = self.step;

        // ── Decide ────────────────────────────────────────────────────────
        let environment = self
            .environments
            .get(self.current)
            .ok_or(SimError::EnvironmentNotFound(self.current))?;
        let ctx = StepContext::new(
            self.simulation_id,
            step,
            self.patient_time,
            &self.patient,
            environment,
            &self.environments,
            &self.dispatcher,
        );
        let decision = self.intelligence.decide(&ctx, &mut self.rng)?;

        // ── Validate ──────────────────────────────────────────────────────
        let inputs = StepInputs {
            patient:      &self.patient,
            environments: &self.environments,
            dispatcher:   &self.dispatcher,
            current:      self.current,
            patient_time: self.patient_time,
            step,
            policy:       self.config.duplicate_action,
        };
        let plan = plan_step(&inputs, decision)?;

        // ── Commit ────────────────────────────────────────────────────────
        let appended = plan.appended();
        let overwritten = plan.overwritten();
        let skipped = plan.skipped;
        let interactions = plan.interactions();
        let next_environment = plan.next_environment;
        let indices = commit_step(
            &mut self.patient,
            &mut self.environments,
            self.current,
            plan.entries,
            plan.documents,
        );
        self.patient_time = plan.patient_time;
        self.step = step.next();

        // ── Log ───────────────────────────────────────────────────────────
        let record = self.log_record(step, next_environment, interactions, &indices);
        for emitted in self.logger.step(record) {
            observer.on_step(&emitted);
        }

        // ── Terminate or move ─────────────────────────────────────────────
        if self.evaluate_termination() {
            self.finish(observer);
        } else {
            self.current = next_environment;
        }

        Ok(StepReport { step, appended, overwritten, skipped, state: self.state })
    }

    /// Snapshot of the run as it stands.
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            simulation_id: self.simulation_id,
            patient_id:    self.patient.patient_id,
            state:         self.state,
            steps:         self.step.0,
            patient_time:  self.patient_time,
            record_len:    self.patient.record().len(),
            hard_stop:     (self.state == RunState::StoppedHardLimit).then_some(HardStopReached {
                hard_stop: self.config.hard_stop,
                steps:     self.step.0,
            }),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Move to a stop state if one applies.  Returns `true` on transition.
    fn evaluate_termination(&mut self) -> bool {
        let progress = RunProgress {
            steps:        self.step.0,
            patient:      &self.patient,
            patient_time: self.patient_time,
            elapsed_real: self.started.elapsed(),
        };
        let next = if !self.patient.alive() {
            RunState::StoppedDeath
        } else if self.evaluator.is_met(&progress) {
            RunState::StoppedCondition
        } else if self.step.0 >= self.config.hard_stop {
            RunState::StoppedHardLimit
        } else {
            return false;
        };
        self.state = next;
        true
    }

    fn finish<O: SimObserver>(&mut self, observer: &mut O) {
        if self.state == RunState::StoppedHardLimit {
            let _guard = self.logger.span().enter();
            warn!(
                hard_stop = self.config.hard_stop,
                steps = self.step.0,
                "hard stop reached before the stopping condition held"
            );
        }
        for emitted in self.logger.finish(self.state, self.step.0, self.patient_time) {
            observer.on_step(&emitted);
        }
        observer.on_run_end(&self.outcome());
    }

    fn log_record(
        &self,
        step:             Step,
        next_environment: EnvironmentId,
        interactions:     Vec<String>,
        indices:          &[usize],
    ) -> StepLogRecord {
        let environment = self.environments.get(self.current);
        let entries = self.logger.wants_entries().then(|| {
            indices.iter().filter_map(|&i| self.patient.record().get(i).cloned()).collect()
        });
        StepLogRecord {
            simulation_id:    self.simulation_id,
            patient_id:       self.patient.patient_id,
            step,
            patient_time:     self.patient_time,
            real_time:        Utc::now(),
            environment_id:   self.current,
            environment_name: environment.map(|e| e.name.clone()).unwrap_or_default(),
            patient_present:  environment.is_some_and(|e| e.patient_present),
            next_environment,
            interactions,
            record_len:       self.patient.record().len(),
            alive:            self.patient.alive(),
            entries,
        }
    }
}
