//! Fuzzing parameter sampling.
//!
//! Parameters fall into three classes, redrawn at different cadences:
//! *semi-dynamic* ones are drawn once per pattern
//! ([`FuzzingParameterSet::randomize_parameters`]), *dynamic* ones are drawn
//! per use (the `random_*` methods), and *static* ones are fixed for the
//! whole run.

use log::info;
use rand::Rng as _;
use serde::Serialize;

use anvil_core::util::RunRng;

/// Duration of one refresh interval (tREFI) in microseconds.
pub const REF_INTERVAL_US: f64 = 7.8;

/// Inclusive integer range, sampled uniformly.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Range {
    /// Smallest admissible value
    pub min: usize,
    /// Largest admissible value
    pub max: usize,
}

impl Range {
    /// Creates an inclusive range.
    pub const fn new(min: usize, max: usize) -> Self {
        Range { min, max }
    }

    /// Draws a uniform sample.
    pub fn sample(&self, rng: &mut RunRng) -> usize {
        if self.min >= self.max {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }
}

/// All knobs of the pattern generator and hammerer.
#[derive(Debug, Serialize)]
pub struct FuzzingParameterSet {
    // ---- static, fixed at construction ----
    /// Measured (or overridden) activations per tREFI, forced even
    num_activations_per_trefi: usize,
    /// Override coming from the command line; `randomize_parameters` keeps it
    fixed_acts_per_trefi: Option<usize>,
    /// Total activations one hammering run issues
    hammering_total_num_activations: usize,
    /// Row distance between aggressors of the same tuple
    agg_intra_distance: usize,
    /// Rows in the address space (geometry-dependent)
    max_row_no: usize,
    /// Banks in the address space (geometry-dependent)
    num_banks: usize,
    /// Weighted N-sidedness distribution as (N, weight) pairs
    n_sided_probabilities: Vec<(usize, usize)>,

    // ---- semi-dynamic, drawn once per pattern ----
    num_refresh_intervals: usize,
    total_acts_pattern: usize,
    base_period: usize,

    // ---- dynamic, drawn per use ----
    n_sided: Range,
    amplitude: Range,
    agg_inter_distance: Range,
    start_row: Range,
    bank_no: Range,
    use_sequential_aggressors: Range,
    sync_each_ref: Range,
    num_aggressors_for_sync: Range,
    wait_until_start_hammering_refs: Range,
}

impl FuzzingParameterSet {
    /// Creates a parameter set for a system admitting `measured_acts_per_trefi`
    /// activations per refresh interval, with `max_row_no` rows and
    /// `num_banks` banks per the selected geometry.
    ///
    /// The activation count is rounded down to an even value; pattern
    /// generation requires pairs.
    pub fn new(
        measured_acts_per_trefi: usize,
        max_row_no: usize,
        num_banks: usize,
        rng: &mut RunRng,
    ) -> Self {
        let mut params = FuzzingParameterSet {
            num_activations_per_trefi: (measured_acts_per_trefi / 2) * 2,
            fixed_acts_per_trefi: None,
            hammering_total_num_activations: 5_000_000,
            agg_intra_distance: 2,
            max_row_no,
            num_banks,
            n_sided_probabilities: vec![(2, 100)],
            num_refresh_intervals: 0,
            total_acts_pattern: 0,
            base_period: 0,
            n_sided: Range::new(2, 2),
            amplitude: Range::new(1, 8),
            agg_inter_distance: Range::new(2, 16),
            start_row: Range::new(0, 8192),
            bank_no: Range::new(0, num_banks.saturating_sub(1)),
            use_sequential_aggressors: Range::new(0, 1),
            sync_each_ref: Range::new(0, 0),
            num_aggressors_for_sync: Range::new(1, 2),
            wait_until_start_hammering_refs: Range::new(10, 128),
        };
        params.randomize_parameters(rng);
        params
    }

    /// Replaces the N-sidedness distribution with the given (N, weight)
    /// pairs.
    pub fn set_distribution(&mut self, n_sided: Range, probabilities: Vec<(usize, usize)>) {
        self.n_sided = n_sided;
        self.n_sided_probabilities = probabilities;
    }

    /// Forces a fixed activations-per-tREFI value (command-line override);
    /// survives re-randomization.
    pub fn set_fixed_acts_per_trefi(&mut self, acts: usize) {
        self.fixed_acts_per_trefi = Some((acts / 2) * 2);
        self.num_activations_per_trefi = (acts / 2) * 2;
    }

    /// Installs a measured activations-per-tREFI value. Dropped again by the
    /// next [`randomize_parameters`](Self::randomize_parameters) when a fixed
    /// override is present.
    pub fn set_acts_per_trefi(&mut self, acts: usize) {
        self.num_activations_per_trefi = (acts / 2) * 2;
    }

    /// Allows probing runs to widen or pin the per-REF synchronization
    /// behavior.
    pub fn set_sync_each_ref(&mut self, range: Range) {
        self.sync_each_ref = range;
    }

    /// Overrides the per-run total activation budget.
    pub fn set_hammering_total_num_activations(&mut self, total: usize) {
        self.hammering_total_num_activations = total;
    }

    /// Redraws all semi-dynamic parameters for the next pattern.
    pub fn randomize_parameters(&mut self, rng: &mut RunRng) {
        if let Some(fixed) = self.fixed_acts_per_trefi {
            self.num_activations_per_trefi = fixed;
        }

        // must be a power of two, otherwise the component frequencies of the
        // generated pattern do not line up with refresh intervals
        self.num_refresh_intervals = 1 << Range::new(0, 4).sample(rng);
        self.total_acts_pattern = self.num_activations_per_trefi * self.num_refresh_intervals;
        self.base_period = self
            .random_even_divisor(
                self.num_activations_per_trefi,
                self.num_activations_per_trefi / 6,
                rng,
            )
            .unwrap_or(self.num_activations_per_trefi);
    }

    /// Logs the parameters that stay fixed over the whole run.
    pub fn log_static_parameters(&self) {
        info!("static hammering parameters:");
        info!("  agg_intra_distance: {}", self.agg_intra_distance);
        info!(
            "  N-sided distribution: {:?}",
            self.n_sided_probabilities
        );
        info!(
            "  hammering_total_num_activations: {}",
            self.hammering_total_num_activations
        );
    }

    /// Logs the parameters drawn for the current pattern.
    pub fn log_pattern_parameters(&self) {
        info!("pattern-specific fuzzing parameters:");
        info!("  num_refresh_intervals: {}", self.num_refresh_intervals);
        info!("  total_acts_pattern: {}", self.total_acts_pattern);
        info!("  base_period: {}", self.base_period);
    }

    /// A random even divisor of `n` that is at least `min_value`.
    fn random_even_divisor(&self, n: usize, min_value: usize, rng: &mut RunRng) -> Option<usize> {
        let mut divisors: Vec<usize> = Vec::new();
        let mut i = 1;
        while i * i <= n {
            if n.is_multiple_of(i) {
                if i.is_multiple_of(2) {
                    divisors.push(i);
                }
                let other = n / i;
                if other != i && other.is_multiple_of(2) {
                    divisors.push(other);
                }
            }
            i += 1;
        }
        let eligible: Vec<usize> = divisors.into_iter().filter(|&d| d >= min_value).collect();
        if eligible.is_empty() {
            return None;
        }
        Some(eligible[rng.random_range(0..eligible.len())])
    }

    /// Number of base periods in the pattern (`total / base_period`), the
    /// bound on frequency multipliers.
    pub fn num_base_periods(&self) -> usize {
        self.total_acts_pattern / self.base_period
    }

    /// Activations per tREFI currently in effect.
    pub fn num_activations_per_trefi(&self) -> usize {
        self.num_activations_per_trefi
    }

    /// Slots in the pattern being generated.
    pub fn total_acts_pattern(&self) -> usize {
        self.total_acts_pattern
    }

    /// The pattern's base period in slots.
    pub fn base_period(&self) -> usize {
        self.base_period
    }

    /// Refresh intervals the pattern spans.
    pub fn num_refresh_intervals(&self) -> usize {
        self.num_refresh_intervals
    }

    /// Total activations one hammering run issues.
    pub fn hammering_total_num_activations(&self) -> usize {
        self.hammering_total_num_activations
    }

    /// Row distance between aggressors of one tuple.
    pub fn agg_intra_distance(&self) -> usize {
        self.agg_intra_distance
    }

    /// Rows in the address space.
    pub fn max_row_no(&self) -> usize {
        self.max_row_no
    }

    /// Banks in the address space.
    pub fn num_banks(&self) -> usize {
        self.num_banks
    }

    /// Draws an N-sidedness from the configured distribution, truncated to
    /// `upper_bound`.
    pub fn random_n_sided(&self, upper_bound: usize, rng: &mut RunRng) -> usize {
        if self.n_sided.max > upper_bound {
            return Range::new(self.n_sided.min.min(upper_bound), upper_bound).sample(rng);
        }
        let total: usize = self.n_sided_probabilities.iter().map(|&(_, w)| w).sum();
        let mut draw = rng.random_range(0..total.max(1));
        for &(n, weight) in &self.n_sided_probabilities {
            if draw < weight {
                return n;
            }
            draw -= weight;
        }
        self.n_sided.min
    }

    /// Draws an amplitude in `[amplitude.min, min(amplitude.max, max)]`.
    pub fn random_amplitude(&self, max: usize, rng: &mut RunRng) -> usize {
        Range::new(self.amplitude.min, self.amplitude.max.min(max.max(1))).sample(rng)
    }

    /// Draws the row distance to the previous aggressor tuple.
    pub fn random_inter_distance(&self, rng: &mut RunRng) -> usize {
        self.agg_inter_distance.sample(rng)
    }

    /// Draws the bank a mapping places its aggressors in.
    pub fn random_bank_no(&self, rng: &mut RunRng) -> usize {
        self.bank_no.sample(rng)
    }

    /// Draws the first row of a mapping.
    pub fn random_start_row(&self, rng: &mut RunRng) -> usize {
        self.start_row.sample(rng)
    }

    /// Whether the next mapping assigns rows sequentially or at random.
    pub fn random_use_seq_addresses(&self, rng: &mut RunRng) -> bool {
        self.use_sequential_aggressors.sample(rng) == 1
    }

    /// Whether the next run re-synchronizes at every refresh interval
    /// (instead of once per pattern iteration).
    pub fn random_sync_each_ref(&self, rng: &mut RunRng) -> bool {
        self.sync_each_ref.sample(rng) == 1
    }

    /// Number of sync addresses the next run times per sync round.
    pub fn random_num_aggressors_for_sync(&self, rng: &mut RunRng) -> usize {
        self.num_aggressors_for_sync.sample(rng)
    }

    /// Microseconds of filler accesses before hammering starts. Resets the
    /// DRAM sampler state and fuzzes at which REF the pattern begins.
    pub fn random_wait_until_start_hammering_us(&self, rng: &mut RunRng) -> u64 {
        let refs = self.wait_until_start_hammering_refs.sample(rng);
        (refs as f64 * REF_INTERVAL_US) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_with_acts(acts: usize, rng: &mut RunRng) -> FuzzingParameterSet {
        FuzzingParameterSet::new(acts, 8192, 16, rng)
    }

    #[test]
    fn acts_per_trefi_is_forced_even() {
        let mut rng = RunRng::seeded(1);
        let params = params_with_acts(101, &mut rng);
        assert_eq!(params.num_activations_per_trefi(), 100);
    }

    #[test]
    fn base_period_is_even_divisor_above_minimum() {
        let mut rng = RunRng::seeded(0xDEADBEEF);
        let mut params = params_with_acts(100, &mut rng);
        for _ in 0..50 {
            params.randomize_parameters(&mut rng);
            let bp = params.base_period();
            assert!(bp.is_multiple_of(2), "base period {bp} must be even");
            assert!(100usize.is_multiple_of(bp), "base period {bp} must divide 100");
            assert!(bp >= 100 / 6, "base period {bp} under minimum");
            // K is a power of two in [1, 16]
            let k = params.num_refresh_intervals();
            assert!(k.is_power_of_two() && k <= 16);
            assert_eq!(params.total_acts_pattern(), 100 * k);
        }
    }

    #[test]
    fn randomization_is_deterministic_under_fixed_seed() {
        let mut rng_a = RunRng::seeded(0xDEADBEEF);
        let mut rng_b = RunRng::seeded(0xDEADBEEF);
        let mut a = params_with_acts(100, &mut rng_a);
        let mut b = params_with_acts(100, &mut rng_b);
        for _ in 0..10 {
            a.randomize_parameters(&mut rng_a);
            b.randomize_parameters(&mut rng_b);
            assert_eq!(a.base_period(), b.base_period());
            assert_eq!(a.num_refresh_intervals(), b.num_refresh_intervals());
        }
    }

    #[test]
    fn fixed_acts_override_survives_randomization() {
        let mut rng = RunRng::seeded(3);
        let mut params = params_with_acts(100, &mut rng);
        params.set_fixed_acts_per_trefi(64);
        params.randomize_parameters(&mut rng);
        assert_eq!(params.num_activations_per_trefi(), 64);
        assert!(params.total_acts_pattern().is_multiple_of(64));
    }

    #[test]
    fn n_sided_truncates_to_upper_bound() {
        let mut rng = RunRng::seeded(5);
        let params = params_with_acts(100, &mut rng);
        for _ in 0..100 {
            assert_eq!(params.random_n_sided(1, &mut rng), 1);
            assert_eq!(params.random_n_sided(64, &mut rng), 2);
        }
    }

    #[test]
    fn amplitude_respects_cap() {
        let mut rng = RunRng::seeded(6);
        let params = params_with_acts(100, &mut rng);
        for _ in 0..100 {
            assert!(params.random_amplitude(3, &mut rng) <= 3);
        }
    }
}
