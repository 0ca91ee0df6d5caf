//! Deterministic per-patient RNG wrapper.
//!
//! # Determinism strategy
//!
//! Each patient run gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (patient_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive patient IDs uniformly across the seed space.
//! This means:
//!
//! - Runs never share RNG state, so a cohort gives identical results whether
//!   it executes sequentially or on a thread pool.
//! - Adding patients to a cohort does not disturb the seeds of existing ones.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::PatientId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── PatientRng ────────────────────────────────────────────────────────────────

/// Per-patient deterministic RNG, handed to the intelligence layer and to
/// interaction handlers on every step.
pub struct PatientRng(SmallRng);

impl PatientRng {
    /// Seed deterministically from the run's global seed and a patient ID.
    pub fn new(global_seed: u64, patient: PatientId) -> Self {
        let seed = global_seed ^ (patient.0 as u64).wrapping_mul(MIXING_CONSTANT);
        PatientRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice.
    /// Returns `None` if the slice is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }

    /// Sample an index with probability proportional to `weights[i]`.
    ///
    /// Returns `None` when the weights are empty, negative, or all zero.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let dist = WeightedIndex::new(weights).ok()?;
        Some(dist.sample(&mut self.0))
    }
}
