//! Atomic step application.
//!
//! A step is applied in two passes over the intelligence's [`Decision`]:
//!
//! 1. [`plan_step`] reads the patient and the environments and checks every
//!    rule.  It returns a [`StepPlan`] or the first error.  Nothing is
//!    mutated, so a rejected step leaves the run exactly as it was.
//! 2. [`commit_step`] applies a plan.  It cannot fail: every lookup it does
//!    was already checked by `plan_step`.
//!
//! Duplicates are detected on `(patient_time, environment_id, interactions)`
//! against both the existing record and earlier entries of the same batch,
//! and resolved by the configured [`DuplicateAction`].  The duplicate check
//! runs before the time-order check, so a skipped duplicate never trips a
//! time-order error.

use std::collections::BTreeMap;

use pa_agent::{
    AgentError, EnvironmentSet, Patient, PatientDocument, PatientRecordEntry, RecordKey, Visit,
};
use pa_core::{DuplicateAction, EnvironmentId, PatientTime, Step};
use pa_intelligence::{Decision, InteractionDispatcher};

use crate::{SimError, SimResult};

// ── Plan ──────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) enum PlannedEntry {
    Append(PatientRecordEntry),
    /// Replace the committed entry at `index`.
    Overwrite { index: usize, entry: PatientRecordEntry },
}

/// A fully validated step, ready to commit.
#[derive(Debug)]
pub(crate) struct StepPlan {
    pub entries:          Vec<PlannedEntry>,
    pub next_environment: EnvironmentId,
    pub patient_time:     PatientTime,
    pub documents:        Vec<PatientDocument>,
    pub skipped:          usize,
}

impl StepPlan {
    pub fn appended(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e, PlannedEntry::Append(_))).count()
    }

    pub fn overwritten(&self) -> usize {
        self.entries.len() - self.appended()
    }

    /// Interactions of every planned entry, in order.
    pub fn interactions(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| match e {
                PlannedEntry::Append(entry) | PlannedEntry::Overwrite { entry, .. } => {
                    entry.interactions.iter().cloned()
                }
            })
            .collect()
    }
}

/// Read-only inputs of [`plan_step`].
pub(crate) struct StepInputs<'a> {
    pub patient:      &'a Patient,
    pub environments: &'a EnvironmentSet,
    pub dispatcher:   &'a InteractionDispatcher,
    pub current:      EnvironmentId,
    pub patient_time: PatientTime,
    pub step:         Step,
    pub policy:       DuplicateAction,
}

/// Where a batch entry ended up while planning.
enum Slot {
    /// Position in `StepPlan::entries`.
    Planned(usize),
    /// Already committed at this record index.
    Committed(usize),
}

pub(crate) fn plan_step(inputs: &StepInputs<'_>, decision: Decision) -> SimResult<StepPlan> {
    let StepInputs { patient, environments, dispatcher, current, patient_time, step, policy } =
        *inputs;

    // ── Clock and next hop ────────────────────────────────────────────────
    let next_environment = match decision.next_environment {
        Some(id) if !environments.contains(id) => return Err(SimError::EnvironmentNotFound(id)),
        Some(id) => id,
        None => current,
    };
    let new_time = match decision.advance_to {
        Some(t) if t < patient_time => {
            return Err(SimError::ClockBackwards { current: patient_time, proposed: t });
        }
        Some(t) => t,
        None => patient_time,
    };

    // ── Entries ───────────────────────────────────────────────────────────
    let mut planned: Vec<PlannedEntry> = Vec::with_capacity(decision.entries.len());
    let mut batch_keys: BTreeMap<RecordKey, usize> = BTreeMap::new();
    let mut tail = patient.last_time();
    let mut skipped = 0;

    for mut entry in decision.entries {
        let target = if entry.has_environment() { entry.environment_id } else { current };
        let environment =
            environments.get(target).ok_or(SimError::EnvironmentNotFound(target))?;
        for interaction in &entry.interactions {
            dispatcher.validate(interaction, environment)?;
        }
        entry.step = Some(step);

        let key = entry.key();
        let existing = batch_keys
            .get(&key)
            .map(|&i| Slot::Planned(i))
            .or_else(|| patient.find_duplicate(&key).map(Slot::Committed));

        match (existing, policy) {
            (None, _) => {
                patient.check_time_order(tail, entry.patient_time)?;
                tail = Some(entry.patient_time);
                batch_keys.insert(key, planned.len());
                planned.push(PlannedEntry::Append(entry));
            }
            (Some(_), DuplicateAction::Skip) => skipped += 1,
            (Some(_), DuplicateAction::Error) => {
                return Err(AgentError::DuplicateRecordEntry {
                    patient:      patient.patient_id,
                    patient_time: entry.patient_time,
                    environment:  entry.environment_id,
                    interactions: entry.interactions,
                }
                .into());
            }
            (Some(Slot::Planned(i)), DuplicateAction::Overwrite) => match &mut planned[i] {
                PlannedEntry::Append(slot) | PlannedEntry::Overwrite { entry: slot, .. } => {
                    *slot = entry;
                }
            },
            (Some(Slot::Committed(index)), DuplicateAction::Overwrite) => {
                batch_keys.insert(key, planned.len());
                planned.push(PlannedEntry::Overwrite { index, entry });
            }
        }
    }

    Ok(StepPlan {
        entries: planned,
        next_environment,
        patient_time: new_time,
        documents: decision.documents,
        skipped,
    })
}

// ── Commit ────────────────────────────────────────────────────────────────────

/// Apply a validated plan.  Returns the committed entries' record indices.
pub(crate) fn commit_step(
    patient:      &mut Patient,
    environments: &mut EnvironmentSet,
    current:      EnvironmentId,
    entries:      Vec<PlannedEntry>,
    documents:    Vec<PatientDocument>,
) -> Vec<usize> {
    let patient_id = patient.patient_id;
    let mut indices = Vec::with_capacity(entries.len());

    for planned in entries {
        let (index, overwrite) = match planned {
            PlannedEntry::Append(entry) => (patient.push_entry(entry), false),
            PlannedEntry::Overwrite { index, entry } => {
                patient.replace_entry(index, entry);
                (index, true)
            }
        };
        indices.push(index);

        let Some(committed) = patient.record().get(index) else { continue };
        if !committed.has_environment() {
            continue;
        }
        let visit = Visit::from_entry(committed);
        if let Some(env) = environments.get_mut(committed.environment_id) {
            if overwrite {
                env.replace_visit(patient_id, visit);
            } else {
                env.record_visit(patient_id, visit);
            }
        }
    }

    if let Some(env) = environments.get_mut(current) {
        env.attach_documents(patient_id, documents);
    }
    indices
}
