//! Record → FHIR resource mapping.
//!
//! Every [`ClinicalEvent`] of a record entry becomes one resource whose type
//! is the event's [`ResourceKind`].  The patient itself becomes a `Patient`
//! resource; a death effect only shows up there, as `deceasedDateTime`.
//!
//! Resource ids are derived from the entry id: the first event of an entry
//! uses the entry id itself, further events append `-<n>`.
//!
//! An event's raw `fhir` overlay is merged last, so its top-level keys win.

use serde_json::{Map, Value, json};

use pa_agent::{ClinicalEvent, Patient, PatientRecordEntry, Quantity, ResourceKind};
use pa_core::time::{format_date, format_datetime};

const CONDITION_CLINICAL_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/condition-clinical";

// ── Patient ───────────────────────────────────────────────────────────────────

pub fn patient_resource(patient: &Patient) -> Value {
    let mut resource = json!({
        "resourceType": "Patient",
        "id":           patient.patient_id.0.to_string(),
        "name":         [{ "text": patient.name() }],
        "gender":       patient.demographics.gender.as_str(),
    });
    if let Some(birth_date) = patient.demographics.birth_date {
        resource["birthDate"] = json!(format_date(birth_date));
    }
    if let Some(at) = patient.deceased_at() {
        resource["deceasedDateTime"] = json!(format_datetime(at));
    }
    resource
}

// ── Record entries ────────────────────────────────────────────────────────────

/// Resources for every clinical event of `entry`, in effect order.
pub fn entry_resources(entry: &PatientRecordEntry, patient: &Patient) -> Vec<Value> {
    entry
        .events()
        .enumerate()
        .map(|(n, event)| {
            let id = match n {
                0 => entry.entry_id.to_string(),
                n => format!("{}-{n}", entry.entry_id),
            };
            event_resource(event, &id, patient)
        })
        .collect()
}

/// One event as a FHIR resource with the given `id`.
pub fn event_resource(event: &ClinicalEvent, id: &str, patient: &Patient) -> Value {
    let start = format_datetime(event.start);
    let end = event.end.map(format_datetime);

    let mut resource = match event.kind {
        ResourceKind::Encounter => {
            let mut class = Map::new();
            class.insert("display".into(), json!(event.name));
            if let Some(code) = &event.code {
                class.insert("code".into(), json!(code));
            }
            json!({
                "status": "finished",
                "class":  class,
                "period": period(&start, end.as_deref()),
            })
        }
        ResourceKind::Condition => {
            let mut r = json!({
                "code":         coding(event),
                "recordedDate": start,
            });
            if let Some(end) = &end {
                r["abatementDateTime"] = json!(end);
                r["clinicalStatus"] = json!({
                    "coding": [{ "system": CONDITION_CLINICAL_SYSTEM, "code": "inactive" }],
                });
            }
            r
        }
        ResourceKind::Observation => {
            let mut r = json!({
                "status":          "final",
                "code":            coding(event),
                "effectivePeriod": period(&start, end.as_deref()),
            });
            if let Some(value) = &event.value {
                r["valueQuantity"] = quantity(value);
            }
            r
        }
        ResourceKind::Procedure => json!({
            "status":          "completed",
            "code":            coding(event),
            "performedPeriod": period(&start, end.as_deref()),
        }),
        ResourceKind::MedicationRequest => {
            let medication_id = format!("medication-{id}");
            let status = if end.is_some() { "completed" } else { "active" };
            let mut r = json!({
                "status":    status,
                "intent":    "order",
                "contained": [{
                    "resourceType": "Medication",
                    "id":           medication_id,
                    "code":         coding(event),
                }],
                "dispenseRequest": {
                    "validityPeriod": period(&start, end.as_deref()),
                },
                "medicationReference": { "reference": format!("#{medication_id}") },
            });
            if let Some(dosage) = &event.dosage {
                r["dosageInstruction"] = json!([{ "text": dosage }]);
            }
            if let Some(duration) = &event.duration {
                r["dispenseRequest"]["expectedSupplyDuration"] = quantity(duration);
            }
            r
        }
        ResourceKind::ServiceRequest => json!({
            "status":             "active",
            "intent":             "order",
            "code":               coding(event),
            "reasonCode":         [{ "text": event.reason.as_deref().unwrap_or(event.name.as_str()) }],
            "occurrenceDateTime": start,
        }),
        ResourceKind::Appointment => {
            let mut r = json!({
                "status":          "booked",
                "serviceCategory": [coding(event)],
                "reasonReference": [{ "display": event.reason.as_deref().unwrap_or(event.name.as_str()) }],
                "description":     event.name,
                "start":           start,
                "participant": [{
                    "actor": {
                        "reference": format!("Patient/{}", patient.patient_id.0),
                        "display":   patient.name(),
                    },
                    "status": "accepted",
                }],
            });
            if let Some(end) = &end {
                r["end"] = json!(end);
            }
            r
        }
    };

    // Appointments reference the patient through `participant` instead.
    if event.kind != ResourceKind::Appointment {
        resource["subject"] = json!({
            "reference": format!("Patient/{}", patient.patient_id.0),
            "display":   patient.name(),
        });
    }
    resource["id"] = json!(id);
    resource["resourceType"] = json!(event.kind.as_str());
    if let (Some(overlay), Value::Object(fields)) = (&event.fhir, &mut resource) {
        fields.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    resource
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn coding(event: &ClinicalEvent) -> Value {
    let mut coding = Map::new();
    coding.insert("display".into(), json!(event.name));
    if let Some(code) = &event.code {
        coding.insert("code".into(), json!(code));
    }
    if let Some(system) = &event.system {
        coding.insert("system".into(), json!(system));
    }
    json!({ "coding": [coding] })
}

fn period(start: &str, end: Option<&str>) -> Value {
    match end {
        Some(end) => json!({ "start": start, "end": end }),
        None => json!({ "start": start }),
    }
}

fn quantity(q: &Quantity) -> Value {
    let mut out = Map::new();
    out.insert("value".into(), json!(q.value));
    for (key, field) in [("unit", &q.unit), ("system", &q.system), ("code", &q.code)] {
        if let Some(v) = field {
            out.insert(key.into(), json!(v));
        }
    }
    Value::Object(out)
}
