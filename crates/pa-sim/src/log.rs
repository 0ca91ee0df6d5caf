//! Per-run logging handle.
//!
//! Each [`PatientSimulation`](crate::PatientSimulation) owns one
//! [`RunLogger`].  It carries the run's identity in a `tracing` span, applies
//! the `log_every` / `log_intermediate` cadence, and hands every record it
//! emits back to the caller so the run's observer sees exactly what was
//! logged.
//!
//! Cadence (with `n` the number of completed steps):
//!
//! - `log_intermediate = false`: one record when `n % log_every == 0`.
//! - `log_intermediate = true`: a record for every step is buffered and the
//!   buffer is flushed when `n % log_every == 0`, and once more when the run
//!   stops.

use chrono::{DateTime, Utc};
use tracing::{Span, info, info_span};

use pa_agent::PatientRecordEntry;
use pa_core::{EnvironmentId, PatientId, PatientTime, SimConfig, SimulationId, Step};

use crate::RunState;

/// One logged simulation step.
#[derive(Clone, Debug)]
pub struct StepLogRecord {
    pub simulation_id:    SimulationId,
    pub patient_id:       PatientId,
    pub step:             Step,
    /// Patient clock after the step.
    pub patient_time:     PatientTime,
    /// Wall-clock time the record was produced.
    pub real_time:        DateTime<Utc>,
    pub environment_id:   EnvironmentId,
    pub environment_name: String,
    pub patient_present:  bool,
    pub next_environment: EnvironmentId,
    pub interactions:     Vec<String>,
    pub record_len:       usize,
    pub alive:            bool,
    /// Entries committed this step; only with `log_patient_record`.
    pub entries:          Option<Vec<PatientRecordEntry>>,
}

pub struct RunLogger {
    span:               Span,
    log_every:          u64,
    log_intermediate:   bool,
    log_patient_record: bool,
    buffer:             Vec<StepLogRecord>,
}

impl RunLogger {
    pub fn new(simulation_id: SimulationId, patient_id: PatientId, config: &SimConfig) -> Self {
        let span = info_span!(
            "simulation",
            simulation_id = %simulation_id,
            patient_id = patient_id.0,
        );
        Self {
            span,
            log_every:          config.log_every.max(1),
            log_intermediate:   config.log_intermediate,
            log_patient_record: config.log_patient_record,
            buffer:             Vec::new(),
        }
    }

    /// The run's `simulation` span.  Enter it around work that should be
    /// attributed to this run.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Whether records should carry the step's entries.
    pub fn wants_entries(&self) -> bool {
        self.log_patient_record
    }

    /// Offer the record for step `record.step`.  Returns the records emitted
    /// now (possibly none).
    pub fn step(&mut self, record: StepLogRecord) -> Vec<StepLogRecord> {
        let completed = record.step.0 + 1;
        let boundary = completed % self.log_every == 0;

        if self.log_intermediate {
            self.buffer.push(record);
            if boundary { self.flush() } else { Vec::new() }
        } else if boundary {
            self.emit(&record);
            vec![record]
        } else {
            Vec::new()
        }
    }

    /// Flush buffered records and log the final state.
    pub fn finish(
        &mut self,
        state: RunState,
        steps: u64,
        patient_time: PatientTime,
    ) -> Vec<StepLogRecord> {
        let flushed = self.flush();
        let _guard = self.span.enter();
        info!(state = %state, steps, patient_time = %patient_time, "run finished");
        flushed
    }

    fn flush(&mut self) -> Vec<StepLogRecord> {
        let records = std::mem::take(&mut self.buffer);
        for record in &records {
            self.emit(record);
        }
        records
    }

    fn emit(&self, r: &StepLogRecord) {
        let _guard = self.span.enter();
        match &r.entries {
            Some(entries) => info!(
                step = r.step.0,
                patient_time = %r.patient_time,
                real_time = %r.real_time,
                environment_id = r.environment_id.0,
                environment_name = %r.environment_name,
                patient_present = r.patient_present,
                next_environment = r.next_environment.0,
                interactions = ?r.interactions,
                record_len = r.record_len,
                alive = r.alive,
                entries = ?entries,
                "step"
            ),
            None => info!(
                step = r.step.0,
                patient_time = %r.patient_time,
                real_time = %r.real_time,
                environment_id = r.environment_id.0,
                environment_name = %r.environment_name,
                patient_present = r.patient_present,
                next_environment = r.next_environment.0,
                interactions = ?r.interactions,
                record_len = r.record_len,
                alive = r.alive,
                "step"
            ),
        }
    }
}
