//! `pa-output` — record export and run output for the `patient_abm` engine.
//!
//! Two independent concerns live here:
//!
//! - **Record export**: a finished [`Patient`](pa_agent::Patient) is folded
//!   into a FHIR R4 [`Bundle`] by [`BundleExporter`], optionally checked by a
//!   [`BundleValidator`], and written as `bundle.json`.
//! - **Run output**: CSV files written while or after a run.
//!
//! | Writer                      | File                 | Driven by                    |
//! |-----------------------------|----------------------|------------------------------|
//! | [`write_bundle_json`]       | `bundle.json`        | caller, after export         |
//! | [`write_patient_record`]    | `patient_record.csv` | caller, after the run        |
//! | [`CsvWriter`]               | `step_log.csv`, `run_summary.csv` | [`RunOutputObserver`] |
//!
//! # Cargo features
//!
//! | Feature             | Effect                                                  |
//! |---------------------|---------------------------------------------------------|
//! | `remote-validation` | Adds [`RemoteValidator`] (blocking `reqwest` client).   |
//!
//! # Usage
//!
//! ```rust,ignore
//! use pa_output::{BundleExporter, CsvWriter, RunOutputObserver, write_bundle_json};
//!
//! let mut obs = RunOutputObserver::new(CsvWriter::new(&dir)?);
//! let outcome = sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() { eprintln!("output error: {e}"); }
//!
//! let export = BundleExporter::new().export(sim.patient());
//! write_bundle_json(&dir.join("bundle.json"), &export.bundle)?;
//! ```

pub mod bundle;
pub mod convert;
pub mod csv;
pub mod error;
pub mod exporter;
pub mod observer;
pub mod record;
pub mod row;
pub mod validate;
pub mod writer;

#[cfg(test)]
mod tests;

pub use bundle::{Bundle, BundleEntry, BundleRequest, BundleType};
pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use exporter::{BundleExporter, ExportResult, write_bundle_json};
pub use observer::RunOutputObserver;
pub use record::write_patient_record;
pub use row::{RecordRow, RunSummaryRow, StepRow};
pub use validate::{BundleValidator, Diagnostic, Severity, StructuralValidator};
pub use writer::OutputWriter;

#[cfg(feature = "remote-validation")]
pub use validate::RemoteValidator;
