//! `pa-intelligence` — the decision layer plugged into the simulation loop.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                     |
//! |------------------|--------------------------------------------------------------|
//! | [`context`]      | `StepContext<'a>` — read-only state handed to the intelligence |
//! | [`decision`]     | `Decision` — record entries plus the next environment        |
//! | [`model`]        | `Intelligence` trait                                         |
//! | [`handler`]      | `InteractionHandler` trait, `InteractionContext`             |
//! | [`outcome`]      | `InteractionOutcome`, `NextEnvironment`                      |
//! | [`dispatcher`]   | `InteractionDispatcher` — name → handler, with validation    |
//! | [`sampled`]      | `SampledIntelligence` — random interaction, sampled next hop |
//! | [`noop`]         | `NoopIntelligence` — never produces entries                  |
//! | [`error`]        | `DispatchError`, `IntelligenceError`                         |
//!
//! # Design notes
//!
//! Each simulation step has two phases:
//!
//! 1. **Decide** (read-only): the loop builds a `StepContext` and calls
//!    `Intelligence::decide`.  The intelligence typically dispatches one or
//!    more interactions through the `InteractionDispatcher`; handlers only
//!    *describe* effects, they never mutate the patient.
//!
//! 2. **Apply** (in `pa-sim`): the returned `Decision` is validated as a
//!    whole and then committed, or rejected with no partial effects.
//!
//! Because nothing here mutates shared state, `Intelligence` and
//! `InteractionHandler` only need to be `Send + Sync`, and a cohort can share
//! one instance of each across threads.

pub mod context;
pub mod decision;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod model;
pub mod noop;
pub mod outcome;
pub mod sampled;


pub use context::StepContext;
pub use decision::Decision;
pub use dispatcher::InteractionDispatcher;
pub use error::{DispatchError, DispatchResult, IntelligenceError, IntelligenceResult};
pub use handler::{InteractionContext, InteractionHandler};
pub use model::Intelligence;
pub use noop::NoopIntelligence;
pub use outcome::{InteractionOutcome, NextEnvironment};
pub use sampled::SampledIntelligence;
