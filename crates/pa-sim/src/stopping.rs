//! Stopping-condition evaluation.
//!
//! The evaluator is a pure function of a [`RunProgress`] snapshot.  It keeps
//! no state of its own and never mutates the patient.  Every condition is
//! monotonic over a run (steps, clocks and the record only grow), so once
//! it holds it keeps holding.

use std::time::Duration;

use pa_agent::Patient;
use pa_core::{PatientTime, StoppingCondition};

/// What the evaluator may look at.
pub struct RunProgress<'a> {
    /// Completed steps.
    pub steps:        u64,
    pub patient:      &'a Patient,
    /// Current patient clock.
    pub patient_time: PatientTime,
    /// Wall-clock time since the run started.
    pub elapsed_real: Duration,
}

#[derive(Clone, Debug)]
pub struct StoppingEvaluator {
    condition: StoppingCondition,
}

impl StoppingEvaluator {
    pub fn new(condition: StoppingCondition) -> Self {
        Self { condition }
    }

    pub fn condition(&self) -> &StoppingCondition {
        &self.condition
    }

    pub fn is_met(&self, progress: &RunProgress<'_>) -> bool {
        holds(&self.condition, progress)
    }
}

fn holds(condition: &StoppingCondition, p: &RunProgress<'_>) -> bool {
    match condition {
        StoppingCondition::MaxNumSteps(n) => p.steps >= *n,
        // Spans too large to represent are never reached.
        StoppingCondition::MaxPatientTime(span) => span
            .to_duration()
            .is_some_and(|limit| p.patient_time - p.patient.start_time() >= limit),
        StoppingCondition::MaxRealTime(span) => {
            span.to_std().is_some_and(|limit| p.elapsed_real >= limit)
        }
        StoppingCondition::ConditionRecorded(name) => p.patient.conditions().contains_name(name),
        StoppingCondition::InteractionOccurred(name) => p.patient.has_interaction(name),
        StoppingCondition::PatientDeceased => !p.patient.alive(),
        StoppingCondition::Any(inner) => inner.iter().any(|c| holds(c, p)),
        StoppingCondition::All(inner) => inner.iter().all(|c| holds(c, p)),
    }
}
