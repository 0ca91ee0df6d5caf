//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `step_log.csv`
//! - `run_summary.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{OutputResult, RunSummaryRow, StepRow};

pub const STEP_LOG_FILE: &str = "step_log.csv";
pub const RUN_SUMMARY_FILE: &str = "run_summary.csv";

pub struct CsvWriter {
    steps:     Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut steps = Writer::from_path(dir.join(STEP_LOG_FILE))?;
        steps.write_record([
            "simulation_id",
            "patient_id",
            "step",
            "patient_time",
            "real_time",
            "environment_id",
            "environment_name",
            "patient_present",
            "next_environment",
            "interactions",
            "record_len",
            "alive",
        ])?;

        let mut summaries = Writer::from_path(dir.join(RUN_SUMMARY_FILE))?;
        summaries.write_record([
            "simulation_id",
            "patient_id",
            "state",
            "steps",
            "patient_time",
            "record_len",
            "hard_stop_reached",
        ])?;

        Ok(Self { steps, summaries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_step(&mut self, row: &StepRow) -> OutputResult<()> {
        self.steps.write_record(&[
            row.simulation_id.clone(),
            row.patient_id.to_string(),
            row.step.to_string(),
            row.patient_time.clone(),
            row.real_time.clone(),
            row.environment_id.to_string(),
            row.environment_name.clone(),
            (row.patient_present as u8).to_string(),
            row.next_environment.to_string(),
            row.interactions.clone(),
            row.record_len.to_string(),
            (row.alive as u8).to_string(),
        ])?;
        Ok(())
    }

    fn write_summary(&mut self, row: &RunSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.simulation_id.clone(),
            row.patient_id.to_string(),
            row.state.to_string(),
            row.steps.to_string(),
            row.patient_time.clone(),
            row.record_len.to_string(),
            (row.hard_stop_reached as u8).to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.steps.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
