//! `pa-agent` — patient and environment agents for the `patient_abm` engine.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`event`]       | `ResourceKind`, `ClinicalEvent`, `Effect`                     |
//! | [`record`]      | `PatientRecordEntry`, `RecordKey`                             |
//! | [`clinical`]    | `ClinicalTable` / `ClinicalRow` (conditions, medications, …)  |
//! | [`patient`]     | `Patient`, `Demographics`, `Gender`                           |
//! | [`builder`]     | `PatientBuilder` (fluent construction with baseline state)    |
//! | [`environment`] | `Environment`, `EnvironmentSet`, `Visit`, `PatientDocument`   |
//! | [`error`]       | `AgentError`, `AgentResult<T>`                                |
//!
//! # Mutation model
//!
//! Patients and environments are only mutated by the simulation loop, after
//! a whole step has been validated.  The mutating methods here
//! (`Patient::push_entry`, `Environment::record_visit`, …) therefore assume
//! their input is already valid; the read-only checks
//! (`Patient::find_duplicate`, `Patient::check_time_order`) are what the loop
//! uses to validate first.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                 |
//! |---------|--------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on all public types. |

pub mod builder;
pub mod clinical;
pub mod environment;
pub mod error;
pub mod event;
pub mod patient;
pub mod record;

#[cfg(test)]
mod tests;

pub use builder::PatientBuilder;
pub use clinical::{ClinicalRow, ClinicalState, ClinicalTable, TableKind};
pub use environment::{DEATH_INTERACTION, Environment, EnvironmentSet, PatientDocument, Visit};
pub use error::{AgentError, AgentResult};
pub use event::{ClinicalEvent, Effect, Quantity, ResourceKind};
pub use patient::{Demographics, Gender, Patient};
pub use record::{PatientRecordEntry, RecordKey};
