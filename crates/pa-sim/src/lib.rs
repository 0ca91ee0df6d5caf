//! `pa-sim` — step loop orchestrator for the `patient_abm` engine.
//!
//! # Step loop
//!
//! ```text
//! check termination (death → condition → hard stop)
//! while Running:
//!   ① Decide   — Intelligence::decide(&StepContext, &mut PatientRng)
//!   ② Validate — every interaction, environment, clock move, duplicate and
//!                time-order rule; any failure rejects the whole step
//!   ③ Commit   — record entries, clinical tables, environment visits,
//!                documents
//!   ④ Log      — RunLogger (log_every / log_intermediate cadence)
//!   ⑤ Stop?    — death → StoppedDeath; condition → StoppedCondition;
//!                step ≥ hard_stop → StoppedHardLimit
//!   ⑥ Move     — to the selected next environment (or stay)
//! ```
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`sim`]        | `PatientSimulation`, `RunOutcome`, `StepReport`           |
//! | [`builder`]    | `SimulationBuilder`                                       |
//! | [`apply`]      | validate-then-commit step application                     |
//! | [`stopping`]   | `StoppingEvaluator`, `RunProgress`                        |
//! | [`state`]      | `RunState`                                                |
//! | [`log`]        | `RunLogger`, `StepLogRecord`                              |
//! | [`observer`]   | `SimObserver`, `NoopObserver`                             |
//! | [`cohort`]     | `Cohort` — one independent run per patient                |
//! | [`error`]      | `SimError`, `SimResult<T>`, `HardStopReached`             |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs cohort patients on Rayon's thread pool.           |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use pa_intelligence::{InteractionDispatcher, SampledIntelligence};
//! use pa_sim::{NoopObserver, SimulationBuilder};
//!
//! let mut sim = SimulationBuilder::new(config, patient, environments, SampledIntelligence::new())
//!     .dispatcher(dispatcher)
//!     .build()?;
//! let outcome = sim.run(&mut NoopObserver)?;
//! ```

pub mod apply;
pub mod builder;
pub mod cohort;
pub mod error;
pub mod log;
pub mod observer;
pub mod sim;
pub mod state;
pub mod stopping;


pub use builder::SimulationBuilder;
pub use cohort::{Cohort, CohortRun, CompletedRun};
pub use error::{HardStopReached, SimError, SimResult};
pub use log::{RunLogger, StepLogRecord};
pub use observer::{NoopObserver, SimObserver};
pub use sim::{PatientSimulation, RunOutcome, StepReport};
pub use state::RunState;
pub use stopping::{RunProgress, StoppingEvaluator};
