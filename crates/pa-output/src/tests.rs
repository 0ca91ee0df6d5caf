//! Integration tests for pa-output.

use chrono::{Duration, NaiveDate, TimeZone, Utc};

use pa_agent::{
    ClinicalEvent, Gender, Patient, PatientBuilder, PatientRecordEntry, Quantity, ResourceKind,
};
use pa_core::{EnvironmentId, PatientId, PatientTime};

fn t(day: i64) -> PatientTime {
    Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap() + Duration::days(day)
}

/// A patient with one entry per resource kind, pushed the way the step loop
/// would commit them.
fn patient() -> Patient {
    let mut p = PatientBuilder::new(PatientId(7))
        .name("Ada")
        .gender(Gender::Female)
        .birth_date(NaiveDate::from_ymd_opt(1980, 5, 24).unwrap())
        .start_time(t(0))
        .build()
        .unwrap();

    let gp = EnvironmentId(0);
    p.push_entry(
        PatientRecordEntry::new(t(0), gp)
            .interaction("consult")
            .event(ClinicalEvent::new(ResourceKind::Encounter, "GP consultation", t(0)).code("185349003"))
            .event(
                ClinicalEvent::new(ResourceKind::Condition, "fever", t(0))
                    .code("386661006")
                    .system("http://snomed.info/sct")
                    .end(t(5)),
            ),
    );
    p.push_entry(
        PatientRecordEntry::new(t(1), gp)
            .interaction("measure_bmi")
            .event(
                ClinicalEvent::new(ResourceKind::Observation, "BMI", t(1))
                    .value(Quantity::ucum(24.1, "kg/m2", "kg/m2")),
            ),
    );
    p.push_entry(
        PatientRecordEntry::new(t(2), gp)
            .interaction("prescribe")
            .event(
                ClinicalEvent::new(ResourceKind::MedicationRequest, "paracetamol", t(2))
                    .dosage("500mg twice daily")
                    .duration(Quantity::new(7.0, "days")),
            ),
    );
    p.push_entry(
        PatientRecordEntry::new(t(3), gp)
            .interaction("refer")
            .event(ClinicalEvent::new(ResourceKind::ServiceRequest, "blood test", t(3)))
            .event(ClinicalEvent::new(ResourceKind::Appointment, "outpatient", t(10)).end(t(10)))
            .event(ClinicalEvent::new(ResourceKind::Procedure, "venepuncture", t(3))),
    );
    p
}

/// Drop generated ids so two exports can be compared.
fn strip_ids(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for key in ["id", "reference", "fullUrl"] {
                map.remove(key);
            }
            map.values_mut().for_each(strip_ids);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_ids),
        _ => {}
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod convert_tests {
    use serde_json::json;

    use super::*;
    use crate::convert::{entry_resources, patient_resource};

    #[test]
    fn patient_resource_fields() {
        let r = patient_resource(&patient());
        assert_eq!(r["resourceType"], "Patient");
        assert_eq!(r["id"], "7");
        assert_eq!(r["gender"], "female");
        assert_eq!(r["birthDate"], "1980-05-24");
        assert!(r.get("deceasedDateTime").is_none());
    }

    #[test]
    fn death_sets_deceased_date_time() {
        let mut p = patient();
        p.push_entry(PatientRecordEntry::new(t(20), EnvironmentId(0)).interaction("death").death());
        let r = patient_resource(&p);
        assert_eq!(r["deceasedDateTime"], "2021-03-21T09:00:00Z");
    }

    #[test]
    fn raw_fhir_overlay_wins() {
        let p = patient();
        let event = ClinicalEvent::new(ResourceKind::Observation, "heart rate", t(1))
            .fhir_element("status", json!("preliminary"))
            .fhir_element("category", json!([{ "text": "vital-signs" }]));
        let r = crate::convert::event_resource(&event, "obs-1", &p);
        assert_eq!(r["status"], "preliminary");
        assert_eq!(r["category"][0]["text"], "vital-signs");
        assert_eq!(r["id"], "obs-1");
        assert_eq!(r["subject"]["display"], "Ada");

        let plain = crate::convert::event_resource(
            &ClinicalEvent::new(ResourceKind::Observation, "heart rate", t(1)),
            "obs-1",
            &p,
        );
        assert_eq!(plain["status"], "final");
        assert!(plain.get("category").is_none());
    }

    #[test]
    fn encounter_and_condition() {
        let p = patient();
        let entry = &p.record()[0];
        let resources = entry_resources(entry, &p);
        assert_eq!(resources.len(), 2);

        let enc = &resources[0];
        assert_eq!(enc["resourceType"], "Encounter");
        assert_eq!(enc["id"], entry.entry_id.to_string());
        assert_eq!(enc["status"], "finished");
        assert_eq!(enc["class"], json!({ "display": "GP consultation", "code": "185349003" }));
        assert_eq!(enc["period"], json!({ "start": "2021-03-01T09:00:00Z" }));
        assert_eq!(enc["subject"]["display"], "Ada");

        let cond = &resources[1];
        assert_eq!(cond["id"], format!("{}-1", entry.entry_id));
        assert_eq!(cond["code"]["coding"][0]["code"], "386661006");
        assert_eq!(cond["code"]["coding"][0]["system"], "http://snomed.info/sct");
        assert_eq!(cond["recordedDate"], "2021-03-01T09:00:00Z");
        assert_eq!(cond["abatementDateTime"], "2021-03-06T09:00:00Z");
        assert_eq!(cond["clinicalStatus"]["coding"][0]["code"], "inactive");
    }

    #[test]
    fn observation_value() {
        let p = patient();
        let obs = &entry_resources(&p.record()[1], &p)[0];
        assert_eq!(obs["status"], "final");
        assert_eq!(
            obs["valueQuantity"],
            json!({ "value": 24.1, "unit": "kg/m2", "system": "http://unitsofmeasure.org", "code": "kg/m2" })
        );
    }

    #[test]
    fn medication_request_contains_medication() {
        let p = patient();
        let entry = &p.record()[2];
        let med = &entry_resources(entry, &p)[0];
        let contained_id = format!("medication-{}", entry.entry_id);
        assert_eq!(med["intent"], "order");
        assert_eq!(med["contained"][0]["resourceType"], "Medication");
        assert_eq!(med["contained"][0]["id"], contained_id);
        assert_eq!(med["medicationReference"]["reference"], format!("#{contained_id}"));
        assert_eq!(med["dosageInstruction"][0]["text"], "500mg twice daily");
        assert_eq!(
            med["dispenseRequest"]["expectedSupplyDuration"],
            json!({ "value": 7.0, "unit": "days" })
        );
    }

    #[test]
    fn appointment_has_participant_not_subject() {
        let p = patient();
        let resources = entry_resources(&p.record()[3], &p);
        let kinds: Vec<_> = resources.iter().map(|r| r["resourceType"].clone()).collect();
        assert_eq!(kinds, vec!["ServiceRequest", "Appointment", "Procedure"]);

        let appt = &resources[1];
        assert!(appt.get("subject").is_none());
        assert_eq!(appt["participant"][0]["actor"]["reference"], "Patient/7");
        assert_eq!(appt["participant"][0]["status"], "accepted");
        assert_eq!(appt["end"], "2021-03-11T09:00:00Z");
        assert_eq!(resources[0]["reasonCode"][0]["text"], "blood test");
    }

    #[test]
    fn entries_without_events_produce_nothing() {
        let mut p = patient();
        p.push_entry(PatientRecordEntry::history(t(30)).interaction("note"));
        let last = p.record().last().unwrap();
        assert!(entry_resources(last, &p).is_empty());
    }
}

// ── Export and validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod export_tests {
    use super::*;
    use crate::{BundleExporter, BundleType, BundleValidator, Severity, StructuralValidator};

    #[test]
    fn patient_first_then_record_order() {
        let bundle = BundleExporter::new().bundle(&patient());
        let kinds: Vec<&str> = bundle.entries.iter().map(|e| e.resource_type()).collect();
        assert_eq!(
            kinds,
            [
                "Patient",
                "Encounter",
                "Condition",
                "Observation",
                "MedicationRequest",
                "ServiceRequest",
                "Appointment",
                "Procedure",
            ]
        );
        assert_eq!(bundle.resources_of("Patient").count(), 1);
    }

    #[test]
    fn transaction_entries_carry_requests() {
        let value = BundleExporter::new().bundle(&patient()).to_value().unwrap();
        assert_eq!(value["resourceType"], "Bundle");
        assert_eq!(value["type"], "transaction");
        assert_eq!(value["entry"][1]["request"]["method"], "POST");
        assert_eq!(value["entry"][1]["request"]["url"], "Encounter");

        let collection = BundleExporter::new()
            .bundle_type(BundleType::Collection)
            .bundle(&patient())
            .to_value()
            .unwrap();
        assert_eq!(collection["type"], "collection");
        assert!(collection["entry"][0].get("request").is_none());
    }

    #[test]
    fn export_is_deterministic_apart_from_ids() {
        let p = patient();
        let exporter = BundleExporter::new();
        let mut a = exporter.bundle(&p).to_value().unwrap();
        let mut b = exporter.bundle(&p).to_value().unwrap();
        assert_ne!(a["id"], b["id"]);
        strip_ids(&mut a);
        strip_ids(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn exported_bundle_passes_structural_checks() {
        let result = BundleExporter::new().validator(StructuralValidator).export(&patient());
        assert!(result.is_valid(), "{:?}", result.diagnostics);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn structural_findings_are_reported() {
        let mut value = BundleExporter::new().bundle(&patient()).to_value().unwrap();
        value["entry"][1]["resource"]["status"] = "done".into();
        value["entry"][2]["resource"]["recordedDate"] = "yesterday".into();
        value["entry"][3]["resource"].as_object_mut().unwrap().remove("code");
        value["entry"][4]["request"]["url"] = "Patient".into();

        let diags = StructuralValidator.validate(&value);
        let locations: Vec<&str> = diags.iter().map(|d| d.location.as_str()).collect();
        assert!(locations.contains(&"Bundle.entry[1].resource.status"));
        assert!(locations.contains(&"Bundle.entry[2].resource.recordedDate"));
        assert!(locations.contains(&"Bundle.entry[3].resource.code"));
        assert!(locations.contains(&"Bundle.entry[4].request.url"));
        assert!(diags.iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn duplicate_resource_ids_flagged() {
        let mut value = BundleExporter::new().bundle(&patient()).to_value().unwrap();
        let id = value["entry"][1]["resource"]["id"].clone();
        value["entry"][6]["resource"]["resourceType"] = "Encounter".into();
        value["entry"][6]["resource"]["id"] = id;
        let diags = StructuralValidator.validate(&value);
        assert!(diags.iter().any(|d| d.message.starts_with("duplicate resource")));
    }

    #[test]
    fn validation_from_config() {
        let off = pa_core::ValidationConfig::default();
        let result = BundleExporter::from_config(&off).unwrap().export(&patient());
        assert!(result.diagnostics.is_empty());

        let on = pa_core::ValidationConfig { enabled: true, server_url: None };
        let result = BundleExporter::from_config(&on).unwrap().export(&patient());
        assert!(result.is_valid());
    }

    #[cfg(feature = "remote-validation")]
    #[test]
    fn unreachable_server_falls_back_to_structural() {
        let validator = crate::RemoteValidator::with_timeout(
            "http://127.0.0.1:9/fhir",
            std::time::Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(validator.url(), "http://127.0.0.1:9/fhir/Bundle/$validate");
        let result = BundleExporter::new().validator(validator).export(&patient());
        assert!(result.is_valid(), "{:?}", result.diagnostics);
    }
}

// ── Remote validation ─────────────────────────────────────────────────────────

#[cfg(all(test, feature = "remote-validation"))]
mod remote_tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::time::Duration as StdDuration;

    use reqwest::StatusCode;

    use super::*;
    use crate::validate::remote::response_diagnostics;
    use crate::{BundleExporter, RemoteValidator};

    const OUTCOME_422: &str = r#"{
        "resourceType": "OperationOutcome",
        "issue": [
            {
                "severity": "error",
                "code": "code-invalid",
                "expression": ["Bundle.entry[1].resource.status"],
                "diagnostics": "unknown status"
            },
            { "severity": "information", "code": "informational" }
        ]
    }"#;

    /// Answers a single request with `status_line` and `body`; returns the
    /// server base URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut len = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    len = v.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0; len];
            reader.read_exact(&mut request_body).unwrap();
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Type: application/fhir+json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
        });
        format!("http://{addr}/fhir")
    }

    fn export_against(status_line: &'static str, body: &'static str) -> crate::ExportResult {
        let url = serve_once(status_line, body);
        let validator = RemoteValidator::with_timeout(&url, StdDuration::from_secs(5)).unwrap();
        BundleExporter::new().validator(validator).export(&patient())
    }

    #[test]
    fn non_json_success_is_an_error() {
        let diags = response_diagnostics(StatusCode::OK, "<html>proxy error</html>");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert!(diags[0].message.contains("proxy error"), "{}", diags[0].message);
    }

    #[test]
    fn failure_status_outcome_issues_are_parsed() {
        let diags = response_diagnostics(StatusCode::UNPROCESSABLE_ENTITY, OUTCOME_422);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location, "Bundle.entry[1].resource.status");
        assert_eq!(diags[0].message, "unknown status");
        assert_eq!(diags[0].validator, "remote");
    }

    #[test]
    fn failure_status_without_errors_still_fails() {
        let clean = r#"{"resourceType": "OperationOutcome", "issue": []}"#;
        let diags = response_diagnostics(StatusCode::BAD_REQUEST, clean);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert!(response_diagnostics(StatusCode::OK, clean).is_empty());
    }

    #[test]
    fn server_html_reply_marks_export_invalid() {
        let result = export_against("200 OK", "<html>proxy error</html>");
        assert!(!result.is_valid(), "{:?}", result.diagnostics);
    }

    #[test]
    fn server_outcome_reply_locates_issue() {
        let result = export_against("422 Unprocessable Entity", OUTCOME_422);
        assert!(!result.is_valid());
        assert!(
            result
                .errors()
                .any(|d| d.location == "Bundle.entry[1].resource.status"),
            "{:?}",
            result.diagnostics
        );
    }
}

// ── Writers ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod writer_tests {
    use tempfile::TempDir;

    use super::*;
    use crate::csv::{CsvWriter, RUN_SUMMARY_FILE, STEP_LOG_FILE};
    use crate::record::PATIENT_RECORD_FILE;
    use crate::writer::OutputWriter;
    use crate::{BundleExporter, RunOutputObserver, RunSummaryRow, StepRow, write_bundle_json, write_patient_record};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn read_rows(path: &std::path::Path) -> (Vec<String>, Vec<csv::StringRecord>) {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        let headers = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        let rows = rdr.records().map(|r| r.unwrap()).collect();
        (headers, rows)
    }

    #[test]
    fn bundle_json_round_trip() {
        let dir = tmp();
        let path = dir.path().join("bundle.json");
        let bundle = BundleExporter::new().bundle(&patient());
        write_bundle_json(&path, &bundle).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, bundle.to_value().unwrap());
    }

    #[test]
    fn patient_record_csv() {
        let dir = tmp();
        let mut p = patient();
        p.push_entry(PatientRecordEntry::history(t(40)).interaction("note").tag("imported"));
        write_patient_record(dir.path(), &p).unwrap();

        let (headers, rows) = read_rows(&dir.path().join(PATIENT_RECORD_FILE));
        assert_eq!(headers[..3], ["patient_id", "record_index", "entry_id"]);
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows[0][0], "7");
        assert_eq!(&rows[0][4], "0");
        assert_eq!(&rows[0][7], "Encounter:GP consultation;Condition:fever");
        assert_eq!(&rows[4][4], "");
        assert_eq!(&rows[4][8], "imported");
    }

    #[test]
    fn csv_writer_headers_and_finish() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();

        let (steps, _) = read_rows(&dir.path().join(STEP_LOG_FILE));
        assert_eq!(steps.len(), 12);
        assert_eq!(steps[2], "step");
        let (summary, _) = read_rows(&dir.path().join(RUN_SUMMARY_FILE));
        assert_eq!(summary[2], "state");
    }

    /// Records rows in memory and fails on demand.
    #[derive(Default)]
    struct MemWriter {
        steps:     Vec<StepRow>,
        summaries: Vec<RunSummaryRow>,
        fail:      bool,
    }

    impl OutputWriter for MemWriter {
        fn write_step(&mut self, row: &StepRow) -> crate::OutputResult<()> {
            if self.fail {
                return Err(std::io::Error::other("disk full").into());
            }
            self.steps.push(row.clone());
            Ok(())
        }

        fn write_summary(&mut self, row: &RunSummaryRow) -> crate::OutputResult<()> {
            self.summaries.push(row.clone());
            Ok(())
        }

        fn finish(&mut self) -> crate::OutputResult<()> {
            Ok(())
        }
    }

    mod with_sim {
        use super::*;
        use pa_agent::{Environment, EnvironmentSet};
        use pa_core::{SimConfig, StoppingCondition};
        use pa_intelligence::{InteractionDispatcher, InteractionOutcome, SampledIntelligence};
        use pa_sim::SimulationBuilder;

        fn run_with<W: OutputWriter>(obs: &mut RunOutputObserver<W>) -> pa_sim::RunOutcome {
            let envs = EnvironmentSet::from_environments([
                Environment::new(EnvironmentId(0), "GP").with_interactions(["consult"]),
            ])
            .unwrap();
            let mut dispatcher = InteractionDispatcher::new();
            dispatcher
                .register_fn("consult", |ctx, _rng| {
                    InteractionOutcome::new()
                        .event(ClinicalEvent::new(ResourceKind::Encounter, "consult", ctx.patient_time))
                        .next(EnvironmentId(0), 1.0, pa_core::TimeSpan::days(1))
                })
                .unwrap();
            let cfg = SimConfig {
                stopping_condition: StoppingCondition::MaxNumSteps(4),
                log_every: 2,
                ..SimConfig::default()
            };
            let patient = PatientBuilder::new(PatientId(1)).start_time(t(0)).build().unwrap();
            SimulationBuilder::new(cfg, patient, envs, SampledIntelligence::new())
                .dispatcher(dispatcher)
                .build()
                .unwrap()
                .run(obs)
                .unwrap()
        }

        #[test]
        fn observer_writes_logged_steps_and_summary() {
            let mut obs = RunOutputObserver::new(MemWriter::default());
            let outcome = run_with(&mut obs);
            assert!(obs.take_error().is_none());

            let w = obs.into_writer();
            let steps: Vec<u64> = w.steps.iter().map(|r| r.step).collect();
            assert_eq!(steps, [1, 3]);
            assert_eq!(w.steps[0].interactions, "consult");
            assert_eq!(w.summaries.len(), 1);
            assert_eq!(w.summaries[0].state, "stopped_condition");
            assert_eq!(w.summaries[0].steps, outcome.steps);
            assert!(!w.summaries[0].hard_stop_reached);
        }

        #[test]
        fn observer_keeps_first_error() {
            let mut obs = RunOutputObserver::new(MemWriter { fail: true, ..MemWriter::default() });
            run_with(&mut obs);
            assert!(matches!(obs.take_error(), Some(crate::OutputError::Io(_))));
            assert!(obs.take_error().is_none());
        }

        #[test]
        fn csv_observer_end_to_end() {
            let dir = tmp();
            let mut obs = RunOutputObserver::new(CsvWriter::new(dir.path()).unwrap());
            run_with(&mut obs);
            assert!(obs.take_error().is_none());

            let (_, steps) = read_rows(&dir.path().join(STEP_LOG_FILE));
            assert_eq!(steps.len(), 2);
            let (_, summary) = read_rows(&dir.path().join(RUN_SUMMARY_FILE));
            assert_eq!(&summary[0][2], "stopped_condition");
        }
    }
}
