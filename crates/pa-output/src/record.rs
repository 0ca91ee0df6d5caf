//! `patient_record.csv` — the finished record, one row per entry.

use std::path::Path;

use csv::Writer;

use pa_agent::Patient;

use crate::{OutputResult, RecordRow};

pub const PATIENT_RECORD_FILE: &str = "patient_record.csv";

/// Write `patient`'s record to `dir/patient_record.csv`.
pub fn write_patient_record(dir: &Path, patient: &Patient) -> OutputResult<()> {
    let mut w = Writer::from_path(dir.join(PATIENT_RECORD_FILE))?;
    w.write_record([
        "patient_id",
        "record_index",
        "entry_id",
        "patient_time",
        "environment_id",
        "step",
        "interactions",
        "effects",
        "tag",
    ])?;
    let patient_id = patient.patient_id.0.to_string();
    for entry in patient.record() {
        let row = RecordRow::from(entry);
        w.write_record(&[
            patient_id.clone(),
            row.record_index.to_string(),
            row.entry_id,
            row.patient_time,
            row.environment_id.map(|id| id.to_string()).unwrap_or_default(),
            row.step.map(|s| s.to_string()).unwrap_or_default(),
            row.interactions,
            row.effects,
            row.tag,
        ])?;
    }
    w.flush()?;
    Ok(())
}
