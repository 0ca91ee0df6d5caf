use pa_agent::{PatientDocument, PatientRecordEntry};
use pa_core::{EnvironmentId, PatientTime};

/// Result of one call to [`Intelligence::decide`](crate::Intelligence::decide).
///
/// An empty `Decision` (no entries, no next environment, no clock change) is
/// valid: the step still counts, and the patient stays where they are.
#[derive(Clone, Debug, Default)]
pub struct Decision {
    /// New record entries, applied in order.  An entry may name an
    /// environment other than the current one, or `EnvironmentId::NONE`.
    pub entries:          Vec<PatientRecordEntry>,
    /// Environment for the next step.  `None` stays put.
    pub next_environment: Option<EnvironmentId>,
    /// New patient clock.  Must not be earlier than the current one.
    pub advance_to:       Option<PatientTime>,
    /// Documents attached to the current environment for this patient.
    pub documents:        Vec<PatientDocument>,
}

impl Decision {
    /// Do nothing this step.
    pub fn stay() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: PatientRecordEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn move_to(mut self, environment: EnvironmentId) -> Self {
        self.next_environment = Some(environment);
        self
    }

    pub fn advance_to(mut self, t: PatientTime) -> Self {
        self.advance_to = Some(t);
        self
    }

    pub fn document(mut self, document: PatientDocument) -> Self {
        self.documents.push(document);
        self
    }
}
