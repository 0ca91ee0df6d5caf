//! The patient agent.
//!
//! A `Patient` owns its clinical record and the tables derived from it.  It
//! is built once by [`PatientBuilder`](crate::PatientBuilder) and afterwards
//! only changed by the simulation loop through [`Patient::push_entry`] and
//! [`Patient::replace_entry`].

use std::collections::BTreeMap;

use chrono::NaiveDate;

use pa_core::{PatientId, PatientTime};

use crate::{
    AgentError, AgentResult, ClinicalState, ClinicalTable, PatientRecordEntry, RecordKey,
    TableKind,
};

// ── Demographics ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

impl Gender {
    /// FHIR `AdministrativeGender` code.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male    => "male",
            Gender::Female  => "female",
            Gender::Other   => "other",
            Gender::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = pa_core::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male"    => Ok(Gender::Male),
            "female"  => Ok(Gender::Female),
            "other"   => Ok(Gender::Other),
            "unknown" => Ok(Gender::Unknown),
            other => Err(pa_core::CoreError::Parse(format!("unknown gender {other:?}"))),
        }
    }
}

/// Immutable facts about the patient.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Demographics {
    pub gender:     Gender,
    pub birth_date: Option<NaiveDate>,
    pub name:       String,
    /// Patient time at which the pathway begins.
    pub start_time: PatientTime,
}

// ── Patient ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Patient {
    pub patient_id:   PatientId,
    pub demographics: Demographics,
    alive:            bool,
    deceased_at:      Option<PatientTime>,
    clinical:         ClinicalState,
    baseline:         ClinicalState,
    record:           Vec<PatientRecordEntry>,
    #[cfg_attr(feature = "serde", serde(skip))]
    record_keys:      BTreeMap<RecordKey, usize>,
    /// Record entries listing each interaction.
    #[cfg_attr(feature = "serde", serde(skip))]
    interactions:     BTreeMap<String, usize>,
}

impl Patient {
    pub(crate) fn new(
        patient_id: PatientId,
        demographics: Demographics,
        baseline: ClinicalState,
    ) -> Self {
        Self {
            patient_id,
            demographics,
            alive: true,
            deceased_at: None,
            clinical: baseline.clone(),
            baseline,
            record: Vec::new(),
            record_keys: BTreeMap::new(),
            interactions: BTreeMap::new(),
        }
    }

    // ── Read access ───────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.demographics.name
    }

    pub fn start_time(&self) -> PatientTime {
        self.demographics.start_time
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn deceased_at(&self) -> Option<PatientTime> {
        self.deceased_at
    }

    pub fn record(&self) -> &[PatientRecordEntry] {
        &self.record
    }

    pub fn clinical(&self) -> &ClinicalState {
        &self.clinical
    }

    pub fn table(&self, kind: TableKind) -> &ClinicalTable {
        self.clinical.table(kind)
    }

    pub fn conditions(&self) -> &ClinicalTable {
        &self.clinical.conditions
    }

    pub fn medications(&self) -> &ClinicalTable {
        &self.clinical.medications
    }

    pub fn actions(&self) -> &ClinicalTable {
        &self.clinical.actions
    }

    /// Patient time of the last record entry, if any.
    pub fn last_time(&self) -> Option<PatientTime> {
        self.record.last().map(|e| e.patient_time)
    }

    /// `true` if any record entry lists `interaction`.
    pub fn has_interaction(&self, interaction: &str) -> bool {
        self.interactions.contains_key(interaction)
    }

    // ── Validation ────────────────────────────────────────────────────────

    /// Record index of an existing entry with the same key.
    pub fn find_duplicate(&self, key: &RecordKey) -> Option<usize> {
        self.record_keys.get(key).copied()
    }

    /// Check that an entry at `proposed` would not precede `tail`, the
    /// effective end of the record (the record's last entry unless the
    /// caller is validating a batch).
    pub fn check_time_order(
        &self,
        tail: Option<PatientTime>,
        proposed: PatientTime,
    ) -> AgentResult<()> {
        match tail {
            Some(previous) if proposed < previous => Err(AgentError::NonMonotonicTime {
                patient: self.patient_id,
                previous,
                proposed,
            }),
            _ => Ok(()),
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Append a validated entry, assigning its `record_index`, and merge its
    /// effects.  Returns the assigned index.
    pub fn push_entry(&mut self, mut entry: PatientRecordEntry) -> usize {
        let index = self.record.len();
        entry.record_index = index;
        self.clinical.apply_entry(&entry);
        if entry.is_terminal() {
            self.mark_deceased(entry.patient_time);
        }
        self.record_keys.insert(entry.key(), index);
        self.index_interactions(&entry);
        self.record.push(entry);
        index
    }

    /// Replace the entry at `index` in place, keeping its `record_index`.
    ///
    /// Clinical tables and the alive flag are recomputed from the whole
    /// record, so the replaced entry's old effects disappear.
    pub fn replace_entry(&mut self, index: usize, mut entry: PatientRecordEntry) {
        let Some(slot) = self.record.get_mut(index) else { return };
        entry.record_index = index;
        self.record_keys.remove(&slot.key());
        self.record_keys.insert(entry.key(), index);
        for name in &slot.interactions {
            if let Some(n) = self.interactions.get_mut(name) {
                *n -= 1;
                if *n == 0 {
                    self.interactions.remove(name);
                }
            }
        }
        self.index_interactions(&entry);
        self.record[index] = entry;

        self.clinical = ClinicalState::rebuild(&self.baseline, &self.record);
        self.alive = true;
        self.deceased_at = None;
        if let Some(t) = self.record.iter().find(|e| e.is_terminal()).map(|e| e.patient_time) {
            self.mark_deceased(t);
        }
    }

    fn index_interactions(&mut self, entry: &PatientRecordEntry) {
        for name in &entry.interactions {
            *self.interactions.entry(name.clone()).or_insert(0) += 1;
        }
    }

    fn mark_deceased(&mut self, at: PatientTime) {
        if self.alive {
            self.alive = false;
            self.deceased_at = Some(at);
        }
    }
}
