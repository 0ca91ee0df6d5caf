//! Plain data row types written by the CSV writers.

use pa_agent::{Effect, PatientRecordEntry};
use pa_core::EnvironmentId;
use pa_core::time::format_datetime;
use pa_sim::{RunOutcome, StepLogRecord};

/// One logged step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRow {
    pub simulation_id:    String,
    pub patient_id:       u32,
    pub step:             u64,
    pub patient_time:     String,
    pub real_time:        String,
    pub environment_id:   u32,
    pub environment_name: String,
    pub patient_present:  bool,
    pub next_environment: u32,
    /// `;`-separated.
    pub interactions:     String,
    pub record_len:       usize,
    pub alive:            bool,
}

impl From<&StepLogRecord> for StepRow {
    fn from(r: &StepLogRecord) -> Self {
        Self {
            simulation_id:    r.simulation_id.to_string(),
            patient_id:       r.patient_id.0,
            step:             r.step.0,
            patient_time:     format_datetime(r.patient_time),
            real_time:        format_datetime(r.real_time),
            environment_id:   r.environment_id.0,
            environment_name: r.environment_name.clone(),
            patient_present:  r.patient_present,
            next_environment: r.next_environment.0,
            interactions:     r.interactions.join(";"),
            record_len:       r.record_len,
            alive:            r.alive,
        }
    }
}

/// Final state of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummaryRow {
    pub simulation_id:     String,
    pub patient_id:        u32,
    pub state:             &'static str,
    pub steps:             u64,
    pub patient_time:      String,
    pub record_len:        usize,
    pub hard_stop_reached: bool,
}

impl From<&RunOutcome> for RunSummaryRow {
    fn from(o: &RunOutcome) -> Self {
        Self {
            simulation_id:     o.simulation_id.to_string(),
            patient_id:        o.patient_id.0,
            state:             o.state.as_str(),
            steps:             o.steps,
            patient_time:      format_datetime(o.patient_time),
            record_len:        o.record_len,
            hard_stop_reached: o.hard_stop.is_some(),
        }
    }
}

/// One patient record entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub record_index:   usize,
    pub entry_id:       String,
    pub patient_time:   String,
    /// `None` for entries outside any environment.
    pub environment_id: Option<u32>,
    pub step:           Option<u64>,
    pub interactions:   String,
    /// `;`-separated `Kind:name` pairs, `death` for the terminal effect.
    pub effects:        String,
    pub tag:            String,
}

impl From<&PatientRecordEntry> for RecordRow {
    fn from(e: &PatientRecordEntry) -> Self {
        let effects: Vec<String> = e
            .effects
            .iter()
            .map(|effect| match effect {
                Effect::Event(event) => format!("{}:{}", event.kind, event.name),
                Effect::Death => "death".to_string(),
            })
            .collect();
        Self {
            record_index:   e.record_index,
            entry_id:       e.entry_id.to_string(),
            patient_time:   format_datetime(e.patient_time),
            environment_id: (e.environment_id != EnvironmentId::NONE).then_some(e.environment_id.0),
            step:           e.step.map(|s| s.0),
            interactions:   e.interactions.join(";"),
            effects:        effects.join(";"),
            tag:            e.tag.clone().unwrap_or_default(),
        }
    }
}
