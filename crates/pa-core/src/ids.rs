//! Strongly typed identifier wrappers.
//!
//! Integer ids (`PatientId`, `EnvironmentId`) are `Copy + Ord + Hash` so they
//! can be used as `BTreeMap` keys; ordered maps keep every export and log
//! deterministic.  Generated ids (`SimulationId`, `EntryId`) wrap a v4 UUID.

use std::fmt;

use uuid::Uuid;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to `u32::MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// `true` unless this is the `INVALID` sentinel.
            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(n: $inner) -> Self {
                $name(n)
            }
        }
    };
}

typed_id! {
    /// Stable identifier of a simulated patient.
    pub struct PatientId(u32);
}

typed_id! {
    /// Identifier of a care environment (GP, lab, A&E, …).
    pub struct EnvironmentId(u32);
}

impl EnvironmentId {
    /// Sentinel carried by record entries that did not happen in any
    /// environment (pre-existing history, patient-level events).
    pub const NONE: EnvironmentId = EnvironmentId::INVALID;
}

/// Generate a UUID-backed identifier wrapper.
macro_rules! uuid_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub Uuid);

        impl $name {
            /// Fresh random (v4) identifier.
            pub fn new_v4() -> Self {
                $name(Uuid::new_v4())
            }

            /// Lower-case hex without hyphens.
            pub fn simple(&self) -> String {
                self.0.simple().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Identifier of one patient run.  Appears on every log record.
    pub struct SimulationId;
}

uuid_id! {
    /// Identifier of one patient record entry.  Becomes the FHIR resource id.
    pub struct EntryId;
}
