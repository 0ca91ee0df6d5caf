//! Patient record entries.

use pa_core::{EntryId, EnvironmentId, PatientTime, Step};

use crate::{ClinicalEvent, Effect};

// ── RecordKey ─────────────────────────────────────────────────────────────────

/// Identity of a record entry for duplicate detection.
///
/// Two entries are duplicates when they happened at the same patient time,
/// in the same environment, through the same ordered interactions.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct RecordKey {
    pub patient_time:   PatientTime,
    pub environment_id: EnvironmentId,
    pub interactions:   Vec<String>,
}

// ── PatientRecordEntry ────────────────────────────────────────────────────────

/// One event in a patient's clinical history.
///
/// Entries are proposed by the intelligence layer with [`new`](Self::new)
/// and the chained setters.  `record_index` and `step` are assigned by the
/// simulation loop when the entry is committed.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatientRecordEntry {
    pub entry_id:       EntryId,
    /// Position in the patient record.
    pub record_index:   usize,
    pub patient_time:   PatientTime,
    /// `EnvironmentId::NONE` for events that did not happen in an
    /// environment (pre-existing history, patient-level events).
    pub environment_id: EnvironmentId,
    pub interactions:   Vec<String>,
    /// Step that produced the entry; `None` for history.
    pub step:           Option<Step>,
    pub effects:        Vec<Effect>,
    pub tag:            Option<String>,
}

impl PatientRecordEntry {
    pub fn new(patient_time: PatientTime, environment_id: EnvironmentId) -> Self {
        Self {
            entry_id: EntryId::new_v4(),
            record_index: 0,
            patient_time,
            environment_id,
            interactions: Vec::new(),
            step: None,
            effects: Vec::new(),
            tag: None,
        }
    }

    /// An entry that belongs to no environment.
    pub fn history(patient_time: PatientTime) -> Self {
        Self::new(patient_time, EnvironmentId::NONE)
    }

    pub fn interaction(mut self, name: impl Into<String>) -> Self {
        self.interactions.push(name.into());
        self
    }

    pub fn interactions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interactions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn event(self, event: ClinicalEvent) -> Self {
        self.effect(Effect::Event(event))
    }

    pub fn effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn death(self) -> Self {
        self.effect(Effect::Death)
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            patient_time:   self.patient_time,
            environment_id: self.environment_id,
            interactions:   self.interactions.clone(),
        }
    }

    /// `true` if applying this entry kills the patient.
    pub fn is_terminal(&self) -> bool {
        self.effects.iter().any(|e| matches!(e, Effect::Death))
    }

    /// `true` unless the entry carries the `NONE` environment sentinel.
    #[inline]
    pub fn has_environment(&self) -> bool {
        self.environment_id.is_valid()
    }

    pub fn events(&self) -> impl Iterator<Item = &ClinicalEvent> {
        self.effects.iter().filter_map(Effect::as_event)
    }
}
