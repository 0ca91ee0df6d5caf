//! `RunOutputObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use pa_sim::{RunOutcome, SimObserver, StepLogRecord};

use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult, RunSummaryRow, StepRow};

/// A [`SimObserver`] that writes every logged step and the run summary to an
/// [`OutputWriter`].
///
/// Writer errors are stored because `SimObserver` methods return nothing.
/// After `sim.run()` returns, check with [`take_error`][Self::take_error].
pub struct RunOutputObserver<W: OutputWriter> {
    writer:     W,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> RunOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last_error: None }
    }

    /// Take the stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for RunOutputObserver<W> {
    fn on_step(&mut self, record: &StepLogRecord) {
        let result = self.writer.write_step(&StepRow::from(record));
        self.store_err(result);
    }

    fn on_run_end(&mut self, outcome: &RunOutcome) {
        let result = self.writer.write_summary(&RunSummaryRow::from(outcome));
        self.store_err(result);
        let result = self.writer.finish();
        self.store_err(result);
    }
}
