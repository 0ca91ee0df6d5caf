//! An intelligence that never does anything.

use pa_core::PatientRng;

use crate::{Decision, Intelligence, IntelligenceResult, StepContext};

/// An [`Intelligence`] that always returns [`Decision::stay`].
///
/// Useful in tests of stopping conditions and the hard stop.
pub struct NoopIntelligence;

impl Intelligence for NoopIntelligence {
    fn decide(&self, _ctx: &StepContext<'_>, _rng: &mut PatientRng) -> IntelligenceResult<Decision> {
        Ok(Decision::stay())
    }
}
