//! `pa-core` — foundational types for the `patient_abm` simulation engine.
//!
//! This crate is a dependency of every other `pa-*` crate.  It has no `pa-*`
//! dependencies and only a handful of external ones (`rand`, `chrono`, `uuid`,
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `PatientId`, `EnvironmentId`, `SimulationId`, `EntryId`    |
//! | [`time`]        | `PatientTime`, `Step`, `TimeSpan`, FHIR date formatting    |
//! | [`rng`]         | `PatientRng` (per-patient, seeded from the global seed)   |
//! | [`config`]      | `SimConfig`, `StoppingCondition`, `DuplicateAction`, …     |
//! | [`error`]       | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types so the  |
//! |         | caller can load `SimConfig` from whatever format it likes. |

pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{
    DuplicateAction, InitialEnvironment, SimConfig, StoppingCondition, ValidationConfig,
};
pub use error::{CoreError, CoreResult};
pub use ids::{EntryId, EnvironmentId, PatientId, SimulationId};
pub use rng::PatientRng;
pub use time::{PatientTime, Step, TimeSpan};
