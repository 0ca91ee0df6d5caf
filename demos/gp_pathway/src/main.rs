//! gp_pathway — a small primary-care pathway for the patient_abm engine.
//!
//! Twenty patients start at a GP surgery.  Each visit either measures BMI or
//! diagnoses a fever; from there patients return to the GP, are sent to the
//! hospital outpatient clinic, or (rarely) to A&E.  Runs stop after 180 days
//! of patient time or when a patient is admitted.
//!
//! Writes, per patient, under `<out>/patient_<id>/`:
//! `step_log.csv`, `run_summary.csv`, `patient_record.csv`, `bundle.json`.
//!
//! Usage: `gp_pathway [out_dir]` (default `./output`).  Set `RUST_LOG` to
//! change verbosity.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pa_agent::{
    ClinicalEvent, ClinicalRow, Environment, EnvironmentSet, Gender, Patient, PatientBuilder,
    Quantity, ResourceKind,
};
use pa_core::{
    DuplicateAction, EnvironmentId, PatientId, PatientRng, SimConfig, StoppingCondition,
    TimeSpan, ValidationConfig,
};
use pa_intelligence::{InteractionContext, InteractionDispatcher, InteractionOutcome, SampledIntelligence};
use pa_output::{
    BundleExporter, CsvWriter, OutputError, RunOutputObserver, write_bundle_json,
    write_patient_record,
};
use pa_sim::{Cohort, RunOutcome, SimObserver, StepLogRecord};

// ── Constants ─────────────────────────────────────────────────────────────────

const PATIENT_COUNT: u32 = 20;
const SEED:          u64 = 42;
const LOG_EVERY:     u64 = 5;
const HORIZON_DAYS:  i64 = 180;

const GP:         EnvironmentId = EnvironmentId(0);
const OUTPATIENT: EnvironmentId = EnvironmentId(1);
const AE:         EnvironmentId = EnvironmentId(2);

const SNOMED: &str = "http://snomed.info/sct";

// ── Interactions ──────────────────────────────────────────────────────────────

fn measure_bmi(ctx: &InteractionContext<'_>, rng: &mut PatientRng) -> InteractionOutcome {
    let bmi = rng.gen_range(16.0..32.0_f64);
    InteractionOutcome::new()
        .event(ClinicalEvent::new(ResourceKind::Encounter, "outpatient encounter", ctx.patient_time))
        .event(
            ClinicalEvent::new(ResourceKind::Observation, "Body mass index (BMI)", ctx.patient_time + Duration::minutes(15))
                .code("60621009")
                .system(SNOMED)
                .value(Quantity::ucum((bmi * 10.0).round() / 10.0, "kg/m2", "kg/m2")),
        )
        .next(GP, 0.5, TimeSpan::days(10))
        .next(OUTPATIENT, 0.5, TimeSpan::days(20))
}

fn diagnose_fever(ctx: &InteractionContext<'_>, _rng: &mut PatientRng) -> InteractionOutcome {
    InteractionOutcome::new()
        .event(
            ClinicalEvent::new(ResourceKind::Condition, "Fever", ctx.patient_time)
                .code("386661006")
                .system(SNOMED)
                .end(ctx.patient_time + Duration::days(5)),
        )
        .event(
            ClinicalEvent::new(ResourceKind::MedicationRequest, "Paracetamol 500mg tablets", ctx.patient_time)
                .dosage("1 tablet every 6 hours")
                .duration(Quantity::new(5.0, "days")),
        )
        .next(GP, 0.2, TimeSpan::days(10))
        .next(OUTPATIENT, 0.75, TimeSpan::days(2))
        .next(AE, 0.05, TimeSpan::hours(6))
}

fn outpatient_review(ctx: &InteractionContext<'_>, _rng: &mut PatientRng) -> InteractionOutcome {
    let at = ctx.patient_time;
    InteractionOutcome::new()
        .event(ClinicalEvent::new(ResourceKind::Appointment, "outpatient review", at).end(at + Duration::minutes(30)))
        .event(ClinicalEvent::new(ResourceKind::ServiceRequest, "full blood count", at).reason("persistent fever"))
        .next(GP, 1.0, TimeSpan::days(14))
}

fn emergency_admission(ctx: &InteractionContext<'_>, _rng: &mut PatientRng) -> InteractionOutcome {
    InteractionOutcome::new()
        .event(ClinicalEvent::new(ResourceKind::Encounter, "emergency admission", ctx.patient_time).code("50849002"))
        .event(ClinicalEvent::new(ResourceKind::Procedure, "blood culture", ctx.patient_time + Duration::hours(1)))
}

fn dispatcher() -> Result<InteractionDispatcher> {
    Ok(InteractionDispatcher::new()
        .with("measure_bmi", measure_bmi)?
        .with("diagnose_fever", diagnose_fever)?
        .with("outpatient_review", outpatient_review)?
        .with("emergency_admission", emergency_admission)?)
}

fn environments() -> Result<EnvironmentSet> {
    Ok(EnvironmentSet::from_environments([
        Environment::new(GP, "GP surgery").with_kind("gp").with_interactions(["measure_bmi", "diagnose_fever"]),
        Environment::new(OUTPATIENT, "Outpatient clinic").with_kind("hospital").with_interactions(["outpatient_review"]),
        Environment::new(AE, "A&E").with_kind("hospital").with_interactions(["emergency_admission"]),
    ])?)
}

fn patients() -> Result<Vec<Patient>> {
    let start = Utc.with_ymd_and_hms(2021, 1, 4, 9, 0, 0).single().context("start time")?;
    (0..PATIENT_COUNT)
        .map(|i| {
            let birth = NaiveDate::from_ymd_opt(1950 + (i as i32 * 3) % 60, 1 + i % 12, 1 + i % 28)
                .context("birth date")?;
            let mut builder = PatientBuilder::new(PatientId(i))
                .name(format!("Patient {i}"))
                .gender(if i % 2 == 0 { Gender::Female } else { Gender::Male })
                .birth_date(birth)
                .start_time(start + Duration::days(i as i64));
            if i % 4 == 0 {
                builder = builder.condition(ClinicalRow::new("Asthma", start - Duration::days(900)).code("195967001"));
            }
            Ok(builder.build()?)
        })
        .collect()
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Writes CSV output when its directory could be created, and counts the
/// logged steps either way.
struct PatientObserver {
    csv:    Option<RunOutputObserver<CsvWriter>>,
    logged: usize,
}

impl PatientObserver {
    fn new(dir: &Path) -> Self {
        let csv = fs::create_dir_all(dir)
            .map_err(OutputError::from)
            .and_then(|()| CsvWriter::new(dir))
            .map(RunOutputObserver::new);
        match csv {
            Ok(csv) => Self { csv: Some(csv), logged: 0 },
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "step log disabled");
                Self { csv: None, logged: 0 }
            }
        }
    }

    fn take_error(&mut self) -> Option<OutputError> {
        self.csv.as_mut().and_then(RunOutputObserver::take_error)
    }
}

impl SimObserver for PatientObserver {
    fn on_step(&mut self, record: &StepLogRecord) {
        self.logged += 1;
        if let Some(csv) = &mut self.csv {
            csv.on_step(record);
        }
    }

    fn on_run_end(&mut self, outcome: &RunOutcome) {
        if let Some(csv) = &mut self.csv {
            csv.on_run_end(outcome);
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn patient_dir(out: &Path, id: PatientId) -> PathBuf {
    out.join(format!("patient_{}", id.0))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let out = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "output".into()));
    fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;

    let config = SimConfig {
        seed:               SEED,
        stopping_condition: StoppingCondition::Any(vec![
            StoppingCondition::MaxPatientTime(TimeSpan::days(HORIZON_DAYS)),
            StoppingCondition::InteractionOccurred("emergency_admission".into()),
        ]),
        hard_stop:          500,
        log_every:          LOG_EVERY,
        log_intermediate:   true,
        duplicate_action:   DuplicateAction::Skip,
        validation:         ValidationConfig { enabled: true, server_url: None },
        ..SimConfig::default()
    };
    config.validate()?;

    info!(patients = PATIENT_COUNT, seed = SEED, out = %out.display(), "gp_pathway starting");

    let exporter = BundleExporter::from_config(&config.validation)?;
    let cohort = Cohort::new(config, environments()?, dispatcher()?, SampledIntelligence::new());

    let t0 = Instant::now();
    let runs = cohort.run_with(patients()?, |id| PatientObserver::new(&patient_dir(&out, id)));
    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "cohort finished");

    let mut failed = 0;
    for mut run in runs {
        if let Some(e) = run.observer.take_error() {
            warn!(patient_id = run.patient_id.0, error = %e, "step log incomplete");
        }
        let done = match run.result {
            Ok(done) => done,
            Err(e) => {
                warn!(patient_id = run.patient_id.0, error = %e, "run failed");
                failed += 1;
                continue;
            }
        };

        let dir = patient_dir(&out, run.patient_id);
        write_patient_record(&dir, &done.patient)?;
        let export = exporter.export(&done.patient);
        write_bundle_json(&dir.join("bundle.json"), &export.bundle)?;

        println!(
            "{:>10}  {:<18} steps={:<4} record={:<4} conditions={:<2} logged={:<3} bundle={} resources{}",
            format!("patient {}", run.patient_id.0),
            done.outcome.state.as_str(),
            done.outcome.steps,
            done.outcome.record_len,
            done.patient.conditions().len(),
            run.observer.logged,
            export.bundle.len(),
            if export.is_valid() { "" } else { " (invalid)" },
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {PATIENT_COUNT} runs failed");
    }
    println!("\nOutput written to {}", out.display());
    Ok(())
}
