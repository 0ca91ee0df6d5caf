//! Care environments (GP practice, lab, A&E, …) and the per-run set of them.
//!
//! An environment declares which interactions it supports and keeps, per
//! patient, the ordered visits that happened in it.  Every committed record
//! entry with a real environment id has exactly one matching [`Visit`] here;
//! the simulation loop maintains that pairing.
//!
//! Histories are mutated every step, so environments are never shared
//! between concurrent runs: the cohort runner clones the whole
//! [`EnvironmentSet`] per patient.

use std::collections::{BTreeMap, BTreeSet};

use pa_core::{EntryId, EnvironmentId, PatientId, PatientTime, Step};

use crate::{AgentError, AgentResult, PatientRecordEntry};

/// Interaction every environment declares.  Its handler is built in.
pub const DEATH_INTERACTION: &str = "death";

// ── Visit ─────────────────────────────────────────────────────────────────────

/// One patient contact, mirrored from a record entry.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Visit {
    pub patient_time: PatientTime,
    pub record_index: usize,
    pub entry_id:     EntryId,
    pub interactions: Vec<String>,
    pub step:         Option<Step>,
}

impl Visit {
    /// Visit for a committed entry (its `record_index` already assigned).
    pub fn from_entry(entry: &PatientRecordEntry) -> Self {
        Self {
            patient_time: entry.patient_time,
            record_index: entry.record_index,
            entry_id:     entry.entry_id,
            interactions: entry.interactions.clone(),
            step:         entry.step,
        }
    }

    /// `true` if this visit mirrors `entry`.
    pub fn matches(&self, entry: &PatientRecordEntry) -> bool {
        self.record_index == entry.record_index
            && self.entry_id == entry.entry_id
            && self.patient_time == entry.patient_time
            && self.interactions == entry.interactions
    }
}

// ── PatientDocument ───────────────────────────────────────────────────────────

/// Opaque document (letter, scan, report) an environment holds for a
/// patient.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatientDocument {
    pub name:         String,
    pub content_type: String,
    pub content:      String,
    pub patient_time: PatientTime,
}

impl PatientDocument {
    pub fn text(name: impl Into<String>, content: impl Into<String>, at: PatientTime) -> Self {
        Self {
            name:         name.into(),
            content_type: "text/plain".into(),
            content:      content.into(),
            patient_time: at,
        }
    }
}

// ── Environment ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Environment {
    pub environment_id: EnvironmentId,
    pub name:           String,
    /// Free-form category (`gp`, `a_and_e`, `lab`, …).
    pub kind:           String,
    /// Whether the patient is physically present (as opposed to a phone
    /// consultation or a letter).
    pub patient_present: bool,
    interactions:       BTreeSet<String>,
    history:            BTreeMap<PatientId, Vec<Visit>>,
    patient_data:       BTreeMap<PatientId, Vec<PatientDocument>>,
}

impl Environment {
    /// Environment declaring only [`DEATH_INTERACTION`].
    pub fn new(environment_id: EnvironmentId, name: impl Into<String>) -> Self {
        Self {
            environment_id,
            name:            name.into(),
            kind:            String::new(),
            patient_present: true,
            interactions:    BTreeSet::from([DEATH_INTERACTION.to_string()]),
            history:         BTreeMap::new(),
            patient_data:    BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_patient_present(mut self, present: bool) -> Self {
        self.patient_present = present;
        self
    }

    pub fn with_interactions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interactions.extend(names.into_iter().map(Into::into));
        self
    }

    /// `true` if the environment supports `interaction`.
    pub fn declares(&self, interaction: &str) -> bool {
        self.interactions.contains(interaction)
    }

    /// Supported interactions in sorted order, `death` included.
    pub fn interactions(&self) -> impl Iterator<Item = &str> {
        self.interactions.iter().map(String::as_str)
    }

    /// Visits of `patient`, oldest first.
    pub fn history_for(&self, patient: PatientId) -> &[Visit] {
        self.history.get(&patient).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Patients with at least one visit.
    pub fn patients(&self) -> impl Iterator<Item = PatientId> + '_ {
        self.history.keys().copied()
    }

    pub fn documents_for(&self, patient: PatientId) -> &[PatientDocument] {
        self.patient_data.get(&patient).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_visit(&mut self, patient: PatientId, visit: Visit) {
        self.history.entry(patient).or_default().push(visit);
    }

    /// Replace the visit with `visit.record_index`.  Returns `false` if no
    /// such visit exists.
    pub fn replace_visit(&mut self, patient: PatientId, visit: Visit) -> bool {
        let slot = self
            .history
            .get_mut(&patient)
            .and_then(|visits| visits.iter_mut().find(|v| v.record_index == visit.record_index));
        match slot {
            Some(slot) => {
                *slot = visit;
                true
            }
            None => false,
        }
    }

    pub fn attach_documents(
        &mut self,
        patient: PatientId,
        documents: impl IntoIterator<Item = PatientDocument>,
    ) {
        let mut documents = documents.into_iter().peekable();
        if documents.peek().is_some() {
            self.patient_data.entry(patient).or_default().extend(documents);
        }
    }
}

// ── EnvironmentSet ────────────────────────────────────────────────────────────

/// All environments of one run, keyed by id.
///
/// `Clone` is a deep copy (histories included); the cohort runner hands a
/// fresh clone of a pristine set to every patient.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvironmentSet {
    environments: BTreeMap<EnvironmentId, Environment>,
}

impl EnvironmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// [`AgentError::DuplicateEnvironment`] if two environments share an id.
    pub fn from_environments(
        environments: impl IntoIterator<Item = Environment>,
    ) -> AgentResult<Self> {
        let mut set = Self::new();
        for env in environments {
            set.insert(env)?;
        }
        Ok(set)
    }

    /// Add `env`.  Rejects [`EnvironmentId::NONE`] and ids already present.
    pub fn insert(&mut self, env: Environment) -> AgentResult<()> {
        if env.environment_id == EnvironmentId::NONE {
            return Err(AgentError::SentinelEnvironmentId(env.environment_id));
        }
        if self.environments.contains_key(&env.environment_id) {
            return Err(AgentError::DuplicateEnvironment(env.environment_id));
        }
        self.environments.insert(env.environment_id, env);
        Ok(())
    }

    pub fn get(&self, id: EnvironmentId) -> Option<&Environment> {
        self.environments.get(&id)
    }

    pub fn get_mut(&mut self, id: EnvironmentId) -> Option<&mut Environment> {
        self.environments.get_mut(&id)
    }

    /// Like [`get`](Self::get) but reports a missing id as an error.
    pub fn require(&self, id: EnvironmentId) -> AgentResult<&Environment> {
        self.get(id).ok_or(AgentError::EnvironmentNotFound(id))
    }

    /// First environment (in id order) named exactly `name`.
    pub fn by_name(&self, name: &str) -> Option<&Environment> {
        self.environments.values().find(|e| e.name == name)
    }

    pub fn contains(&self, id: EnvironmentId) -> bool {
        self.environments.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EnvironmentId> + '_ {
        self.environments.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.environments.values()
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}
