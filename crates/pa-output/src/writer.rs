//! The `OutputWriter` trait implemented by run-output backends.

use crate::{OutputResult, RunSummaryRow, StepRow};

/// Sink for what a [`RunOutputObserver`](crate::RunOutputObserver) sees
/// during a run.
///
/// Errors are stored by the observer and retrieved with
/// [`take_error`](crate::RunOutputObserver::take_error).
pub trait OutputWriter {
    /// Write one logged step.
    fn write_step(&mut self, row: &StepRow) -> OutputResult<()>;

    /// Write the run's final state.
    fn write_summary(&mut self, row: &RunSummaryRow) -> OutputResult<()>;

    /// Flush all underlying file handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
