//! The `Intelligence` trait — the main extension point for user code.

use pa_core::PatientRng;

use crate::{Decision, IntelligenceResult, StepContext};

/// Pluggable per-step decision policy.
///
/// Receives a read-only [`StepContext`] and the patient's deterministic
/// [`PatientRng`], so a run is reproducible from its seed no matter which
/// thread executes it.
///
/// # Thread safety
///
/// The cohort runner shares one intelligence across all patients and may
/// call it from a Rayon pool, so implementations must be `Send + Sync`.
/// Per-patient state belongs in the patient record, not in the model.
///
/// # Example
///
/// ```rust,ignore
/// struct AlwaysMeasure;
///
/// impl Intelligence for AlwaysMeasure {
///     fn decide(&self, ctx: &StepContext<'_>, rng: &mut PatientRng) -> IntelligenceResult<Decision> {
///         let outcome = ctx.dispatch("measure_bmi", rng)?;
///         let entry = PatientRecordEntry::new(ctx.patient_time, ctx.environment.environment_id)
///             .interaction("measure_bmi")
///             .effects(outcome.effects);
///         Ok(Decision::stay().entry(entry))
///     }
/// }
/// ```
pub trait Intelligence: Send + Sync + 'static {
    fn decide(&self, ctx: &StepContext<'_>, rng: &mut PatientRng) -> IntelligenceResult<Decision>;
}

impl<F> Intelligence for F
where
    F: Fn(&StepContext<'_>, &mut PatientRng) -> IntelligenceResult<Decision> + Send + Sync + 'static,
{
    fn decide(&self, ctx: &StepContext<'_>, rng: &mut PatientRng) -> IntelligenceResult<Decision> {
        self(ctx, rng)
    }
}
