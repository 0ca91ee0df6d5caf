//! Fluent builder for [`Patient`].
//!
//! # Usage
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use pa_agent::{ClinicalRow, Gender, PatientBuilder};
//! use pa_core::PatientId;
//!
//! let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
//! let patient = PatientBuilder::new(PatientId(0))
//!     .name("Jane Doe")
//!     .gender(Gender::Female)
//!     .birth_date(NaiveDate::from_ymd_opt(1980, 5, 24).unwrap())
//!     .start_time(start)
//!     .condition(ClinicalRow::new("asthma", start))
//!     .build()
//!     .unwrap();
//!
//! assert!(patient.alive());
//! assert!(patient.conditions().contains_name("asthma"));
//! ```

use chrono::{NaiveDate, Utc};

use pa_core::{PatientId, PatientTime};

use crate::{
    AgentError, AgentResult, ClinicalRow, ClinicalState, ClinicalTable, Demographics, Gender,
    Patient, PatientRecordEntry, TableKind,
};

pub struct PatientBuilder {
    patient_id:  PatientId,
    name:        Option<String>,
    gender:      Gender,
    birth_date:  Option<NaiveDate>,
    start_time:  Option<PatientTime>,
    conditions:  Vec<ClinicalRow>,
    medications: Vec<ClinicalRow>,
    actions:     Vec<ClinicalRow>,
    history:     Vec<PatientRecordEntry>,
}

impl PatientBuilder {
    pub fn new(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            name:        None,
            gender:      Gender::Unknown,
            birth_date:  None,
            start_time:  None,
            conditions:  Vec::new(),
            medications: Vec::new(),
            actions:     Vec::new(),
            history:     Vec::new(),
        }
    }

    /// Display name.  Defaults to the numeric patient id.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    /// Patient time at which the pathway begins.  Defaults to the current
    /// wall-clock time at `build`.
    pub fn start_time(mut self, t: PatientTime) -> Self {
        self.start_time = Some(t);
        self
    }

    pub fn condition(mut self, row: ClinicalRow) -> Self {
        self.conditions.push(row);
        self
    }

    pub fn medication(mut self, row: ClinicalRow) -> Self {
        self.medications.push(row);
        self
    }

    pub fn action(mut self, row: ClinicalRow) -> Self {
        self.actions.push(row);
        self
    }

    /// Pre-existing record entry.  Must carry `EnvironmentId::NONE`.
    pub fn history(mut self, entry: PatientRecordEntry) -> Self {
        self.history.push(entry);
        self
    }

    /// # Errors
    ///
    /// - [`AgentError::DuplicateTableRow`] for repeated baseline rows.
    /// - [`AgentError::HistoryInEnvironment`] for a history entry that names
    ///   an environment.
    /// - [`AgentError::NonMonotonicTime`] / [`AgentError::DuplicateRecordEntry`]
    ///   for out-of-order or repeated history entries.
    pub fn build(self) -> AgentResult<Patient> {
        let baseline = ClinicalState {
            conditions:  ClinicalTable::from_baseline(TableKind::Conditions, self.conditions)?,
            medications: ClinicalTable::from_baseline(TableKind::Medications, self.medications)?,
            actions:     ClinicalTable::from_baseline(TableKind::Actions, self.actions)?,
        };

        let demographics = Demographics {
            gender:     self.gender,
            birth_date: self.birth_date,
            name:       self.name.unwrap_or_else(|| self.patient_id.0.to_string()),
            start_time: self.start_time.unwrap_or_else(Utc::now),
        };

        let mut patient = Patient::new(self.patient_id, demographics, baseline);

        for mut entry in self.history {
            if entry.has_environment() {
                return Err(AgentError::HistoryInEnvironment {
                    patient:     self.patient_id,
                    environment: entry.environment_id,
                });
            }
            if patient.find_duplicate(&entry.key()).is_some() {
                return Err(AgentError::DuplicateRecordEntry {
                    patient:      self.patient_id,
                    patient_time: entry.patient_time,
                    environment:  entry.environment_id,
                    interactions: entry.interactions,
                });
            }
            patient.check_time_order(patient.last_time(), entry.patient_time)?;
            entry.step = None;
            patient.push_entry(entry);
        }

        Ok(patient)
    }
}
