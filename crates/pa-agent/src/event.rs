//! Clinical events and record-entry effects.
//!
//! An interaction produces a list of [`Effect`]s.  Most are
//! [`ClinicalEvent`]s: FHIR-shaped facts (a diagnosis, a prescription, an
//! observation) that are merged into the patient's clinical tables and later
//! exported as bundle resources.  [`Effect::Death`] is the only terminal
//! effect.

use serde_json::{Map, Value};

use pa_core::PatientTime;

use crate::TableKind;

// ── ResourceKind ──────────────────────────────────────────────────────────────

/// FHIR resource type a clinical event maps to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceKind {
    Encounter,
    Condition,
    Observation,
    Procedure,
    MedicationRequest,
    ServiceRequest,
    Appointment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Encounter,
        ResourceKind::Condition,
        ResourceKind::Observation,
        ResourceKind::Procedure,
        ResourceKind::MedicationRequest,
        ResourceKind::ServiceRequest,
        ResourceKind::Appointment,
    ];

    /// FHIR `resourceType` string.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Encounter         => "Encounter",
            ResourceKind::Condition         => "Condition",
            ResourceKind::Observation       => "Observation",
            ResourceKind::Procedure         => "Procedure",
            ResourceKind::MedicationRequest => "MedicationRequest",
            ResourceKind::ServiceRequest    => "ServiceRequest",
            ResourceKind::Appointment       => "Appointment",
        }
    }

    /// Clinical table that events of this kind are merged into, if any.
    ///
    /// Encounters, observations and procedures only live in the record.
    pub fn table(self) -> Option<TableKind> {
        match self {
            ResourceKind::Condition => Some(TableKind::Conditions),
            ResourceKind::MedicationRequest => Some(TableKind::Medications),
            ResourceKind::Appointment | ResourceKind::ServiceRequest => Some(TableKind::Actions),
            ResourceKind::Encounter | ResourceKind::Observation | ResourceKind::Procedure => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Quantity ──────────────────────────────────────────────────────────────────

/// A measured amount, exported as a FHIR `Quantity`.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quantity {
    pub value:  f64,
    pub unit:   Option<String>,
    pub system: Option<String>,
    pub code:   Option<String>,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self { value, unit: Some(unit.into()), system: None, code: None }
    }

    /// UCUM-coded quantity (`system = http://unitsofmeasure.org`).
    pub fn ucum(value: f64, unit: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            value,
            unit:   Some(unit.into()),
            system: Some("http://unitsofmeasure.org".into()),
            code:   Some(code.into()),
        }
    }
}

// ── ClinicalEvent ─────────────────────────────────────────────────────────────

/// One clinical fact produced by an interaction.
///
/// Built with [`ClinicalEvent::new`] and the chained setters:
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use pa_agent::{ClinicalEvent, ResourceKind};
///
/// let t = Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap();
/// let event = ClinicalEvent::new(ResourceKind::Condition, "fever", t)
///     .code("386661006")
///     .system("http://snomed.info/sct");
/// assert!(event.end.is_none());
/// ```
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClinicalEvent {
    pub kind:   ResourceKind,
    pub name:   String,
    pub start:  PatientTime,
    pub end:    Option<PatientTime>,
    pub code:   Option<String>,
    pub system: Option<String>,
    /// Observation value.
    pub value:  Option<Quantity>,
    /// Free-text dosage instruction (medications).
    pub dosage: Option<String>,
    pub reason: Option<String>,
    /// Expected supply duration (medications).
    pub duration: Option<Quantity>,
    /// Raw FHIR elements merged over the exported resource, top-level keys
    /// replacing generated ones.
    pub fhir:     Option<Map<String, Value>>,
}

impl ClinicalEvent {
    pub fn new(kind: ResourceKind, name: impl Into<String>, start: PatientTime) -> Self {
        Self {
            kind,
            name: name.into(),
            start,
            end:      None,
            code:     None,
            system:   None,
            value:    None,
            dosage:   None,
            reason:   None,
            duration: None,
            fhir:     None,
        }
    }

    pub fn end(mut self, end: PatientTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn value(mut self, value: Quantity) -> Self {
        self.value = Some(value);
        self
    }

    pub fn dosage(mut self, dosage: impl Into<String>) -> Self {
        self.dosage = Some(dosage.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn duration(mut self, duration: Quantity) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Overlay one raw FHIR element, e.g. `("category", json!([...]))`.
    pub fn fhir_element(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fhir.get_or_insert_with(Map::new).insert(key.into(), value);
        self
    }
}

// ── Effect ────────────────────────────────────────────────────────────────────

/// Payload of a record entry.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Effect {
    Event(ClinicalEvent),
    /// The patient dies at the entry's `patient_time`.  Terminal.
    Death,
}

impl Effect {
    pub fn as_event(&self) -> Option<&ClinicalEvent> {
        match self {
            Effect::Event(event) => Some(event),
            Effect::Death => None,
        }
    }
}

impl From<ClinicalEvent> for Effect {
    fn from(event: ClinicalEvent) -> Self {
        Effect::Event(event)
    }
}
