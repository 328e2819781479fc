use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::pipeline::stage3_distance::{DistanceEngine, SampleProfile};
use crate::pipeline::workers::Deadline;

/// Permutations drawn between deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 32;

/// Per-sample stream seed. Mixing the global seed with the sample index through
/// the SplitMix64 finalizer makes every sample's draws independent of how
/// samples are distributed across workers.
pub fn sample_seed(global_seed: u64, sample_index: usize) -> u64 {
    let mut z = global_seed
        .wrapping_add(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((sample_index as u64).wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// One-sided permutation p-value: the ascending rank of `observed` within
/// `{observed} ∪ null` (ties counted against the observation), divided by the
/// number of draws and capped at 1. The smallest attainable value is `1 / n_perm`.
pub fn permutation_p_value(observed: f64, null: &[f64]) -> f64 {
    if observed.is_nan() || null.is_empty() {
        return f64::NAN;
    }
    let at_or_below = null.iter().filter(|&&d| d <= observed).count();
    ((1 + at_or_below) as f64 / null.len() as f64).min(1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct PermutationTester<'a> {
    engine: &'a DistanceEngine,
    n_perm: usize,
    global_seed: u64,
}

impl<'a> PermutationTester<'a> {
    pub fn new(engine: &'a DistanceEngine, n_perm: usize, global_seed: u64) -> Self {
        Self {
            engine,
            n_perm,
            global_seed,
        }
    }

    pub fn n_perm(&self) -> usize {
        self.n_perm
    }

    /// Minimum class distance for each of `n_perm` shuffles of the sample's
    /// present values across its present template positions. A draw with no
    /// defined class distance is NaN and never counts as at-or-below.
    ///
    /// Returns `None` if the deadline passes before all draws are done.
    pub fn null_distribution(
        &self,
        profile: &SampleProfile,
        sample_index: usize,
        deadline: &Deadline,
    ) -> Option<Vec<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(sample_seed(self.global_seed, sample_index));
        let mut shuffled = profile.values.clone();
        let mut dist = vec![f64::NAN; self.engine.n_classes()];
        let mut null = Vec::with_capacity(self.n_perm);
        for i in 0..self.n_perm {
            if i % DEADLINE_CHECK_INTERVAL == 0 && deadline.expired() {
                return None;
            }
            shuffled.shuffle(&mut rng);
            self.engine.distances_into(profile, &shuffled, &mut dist);
            let min = dist
                .iter()
                .copied()
                .filter(|d| !d.is_nan())
                .fold(f64::INFINITY, f64::min);
            null.push(if min.is_finite() { min } else { f64::NAN });
        }
        Some(null)
    }

    pub fn p_value(
        &self,
        profile: &SampleProfile,
        sample_index: usize,
        observed: f64,
        deadline: &Deadline,
    ) -> Option<f64> {
        if observed.is_nan() {
            return Some(f64::NAN);
        }
        let null = self.null_distribution(profile, sample_index, deadline)?;
        Some(permutation_p_value(observed, &null))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_permutation.rs"]
mod tests;
