//! Fan-out of independent patient runs.
//!
//! Every patient gets a fresh clone of the pristine environment set, its own
//! RNG stream (seeded from the global seed and the patient id) and its own
//! logger.  Only immutable state is shared: the intelligence (`Arc`) and the
//! dispatcher's handlers.  Results therefore do not depend on whether the
//! cohort runs sequentially or, with the `parallel` feature, on Rayon's pool.

use std::sync::Arc;

use tracing::{info, warn};

use pa_agent::{EnvironmentSet, Patient};
use pa_core::{PatientId, SimConfig};
use pa_intelligence::{Intelligence, InteractionDispatcher};

use crate::{NoopObserver, RunOutcome, SimObserver, SimResult, SimulationBuilder};

/// A finished run: the outcome plus the state to export.
pub struct CompletedRun {
    pub outcome:      RunOutcome,
    pub patient:      Patient,
    pub environments: EnvironmentSet,
}

/// Result of one patient's run within a cohort.
pub struct CohortRun<O> {
    pub patient_id: PatientId,
    pub result:     SimResult<CompletedRun>,
    pub observer:   O,
}

pub struct Cohort<I: Intelligence> {
    config:       SimConfig,
    environments: EnvironmentSet,
    dispatcher:   InteractionDispatcher,
    intelligence: Arc<I>,
}

impl<I: Intelligence> Cohort<I> {
    pub fn new(
        config:       SimConfig,
        environments: EnvironmentSet,
        dispatcher:   InteractionDispatcher,
        intelligence: I,
    ) -> Self {
        Self { config, environments, dispatcher, intelligence: Arc::new(intelligence) }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The pristine environment set every run starts from.
    pub fn environments(&self) -> &EnvironmentSet {
        &self.environments
    }

    /// Run every patient with no observer.  Results are in input order.
    pub fn run(&self, patients: Vec<Patient>) -> Vec<CohortRun<NoopObserver>> {
        self.run_with(patients, |_| NoopObserver)
    }

    /// Run every patient, each with its own observer from `make_observer`.
    /// Results are in input order.
    pub fn run_with<O, F>(&self, patients: Vec<Patient>, make_observer: F) -> Vec<CohortRun<O>>
    where
        O: SimObserver + Send,
        F: Fn(PatientId) -> O + Sync,
    {
        info!(patients = patients.len(), "running cohort");

        #[cfg(not(feature = "parallel"))]
        let runs: Vec<CohortRun<O>> = patients
            .into_iter()
            .map(|patient| self.run_one(patient, &make_observer))
            .collect();

        #[cfg(feature = "parallel")]
        let runs: Vec<CohortRun<O>> = {
            use rayon::prelude::*;

            patients
                .into_par_iter()
                .map(|patient| self.run_one(patient, &make_observer))
                .collect()
        };

        runs
    }

    fn run_one<O, F>(&self, patient: Patient, make_observer: &F) -> CohortRun<O>
    where
        O: SimObserver,
        F: Fn(PatientId) -> O,
    {
        let patient_id = patient.patient_id;
        let mut observer = make_observer(patient_id);

        let result = SimulationBuilder::with_shared(
            self.config.clone(),
            patient,
            self.environments.clone(),
            Arc::clone(&self.intelligence),
        )
        .dispatcher(self.dispatcher.clone())
        .build()
        .and_then(|mut sim| {
            let outcome = sim.run(&mut observer)?;
            let (patient, environments) = sim.into_parts();
            Ok(CompletedRun { outcome, patient, environments })
        });

        if let Err(e) = &result {
            warn!(patient_id = patient_id.0, error = %e, "patient run failed");
        }
        CohortRun { patient_id, result, observer }
    }
}
