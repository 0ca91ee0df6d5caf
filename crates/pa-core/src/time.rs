//! Patient-time model.
//!
//! # Design
//!
//! Two clocks run side by side:
//!
//! - **Patient time** (`PatientTime`) is the clinical clock seen from the
//!   patient's point of view.  It only moves when the intelligence layer
//!   advances it and must never move backwards within a record.
//! - **Steps** (`Step`) count loop iterations.  `hard_stop` and
//!   `MaxNumSteps` are expressed in steps.
//!
//! Wall-clock time is only used for the `MaxRealTime` stopping condition and
//! for log timestamps; it never enters the clinical record.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// Timestamp on the patient clock.  Always UTC.
pub type PatientTime = DateTime<Utc>;

// ── Step ──────────────────────────────────────────────────────────────────────

/// Index of a simulation step.
///
/// `Step(0)` is the first step.  The run's step *counter* equals the index
/// of the next step to execute, i.e. the number of completed steps.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step(pub u64);

impl Step {
    pub const ZERO: Step = Step(0);

    /// The step after `self`.
    #[inline]
    pub fn next(self) -> Step {
        Step(self.0 + 1)
    }
}

impl std::ops::Add<u64> for Step {
    type Output = Step;
    #[inline]
    fn add(self, rhs: u64) -> Step {
        Step(self.0 + rhs)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ── TimeSpan ──────────────────────────────────────────────────────────────────

/// A human-friendly duration used in configuration, e.g. `{ days: 90 }`.
///
/// All fields default to zero so partial specifications deserialize.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimeSpan {
    pub days:    i64,
    pub hours:   i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeSpan {
    pub fn days(days: i64) -> Self {
        Self { days, ..Self::default() }
    }

    pub fn hours(hours: i64) -> Self {
        Self { hours, ..Self::default() }
    }

    pub fn seconds(seconds: i64) -> Self {
        Self { seconds, ..Self::default() }
    }

    /// Total length in seconds, or `None` if it overflows `i64`.
    #[inline]
    pub fn total_seconds(&self) -> Option<i64> {
        self.days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)
    }

    /// As a signed `chrono` duration on the patient clock, or `None` if the
    /// span is outside `TimeDelta`'s range.
    pub fn to_duration(&self) -> Option<Duration> {
        Duration::try_seconds(self.total_seconds()?)
    }

    /// As a wall-clock duration.  Negative spans clamp to zero; `None` on
    /// overflow.
    pub fn to_std(&self) -> Option<std::time::Duration> {
        self.total_seconds()
            .map(|s| std::time::Duration::from_secs(s.max(0) as u64))
    }
}

// ── FHIR formatting ───────────────────────────────────────────────────────────

/// Format a patient timestamp as a FHIR `dateTime` (`2020-12-01T09:30:00Z`).
pub fn format_datetime(t: PatientTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a calendar date as a FHIR `date` (`1985-05-24`).
pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Midnight UTC on `date`; convenient for building patient clocks in tests
/// and demos.
pub fn start_of_day(date: NaiveDate) -> PatientTime {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
