//! Frequency-domain pattern generation.
//!
//! The builder fills a [`HammeringPattern`]'s slot vector with randomly drawn
//! periodic components. Component frequencies are power-of-two multiples of
//! the base period, so every component lines up with refresh intervals; the
//! Gaussian draw over the remaining multiplier list biases patterns toward
//! mid-range frequencies, which empirically flip the most bits.

use std::f64::consts::TAU;

use log::debug;
use rand::Rng as _;
use thiserror::Error;

use crate::params::FuzzingParameterSet;
use crate::pattern::{Aggressor, AggressorAccessPattern, HammeringPattern, fill_slots};
use anvil_core::util::RunRng;

/// Errors produced while generating a pattern.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The builder could not fill a slot under the remaining constraints
    #[error("cannot fill slot {slot}: no admissible frequency multiplier left")]
    PatternFillStuck {
        /// index of the slot that could not be filled
        slot: usize,
    },
    /// A prefilled slot references an aggressor without a component
    #[error("prefilled slot {slot} holds aggressor {aggressor:?} with no access pattern")]
    OrphanedPrefill {
        /// index of the offending slot
        slot: usize,
        /// the unattributed aggressor id
        aggressor: Aggressor,
    },
}

/// Fills one [`HammeringPattern`] with randomly drawn periodic components.
pub struct PatternBuilder<'p> {
    pattern: &'p mut HammeringPattern,
    aggressor_id_counter: u32,
}

impl<'p> PatternBuilder<'p> {
    /// Creates a builder writing into `pattern`.
    pub fn new(pattern: &'p mut HammeringPattern) -> Self {
        PatternBuilder {
            pattern,
            aggressor_id_counter: 1,
        }
    }

    /// Hands out `n` fresh consecutive aggressor ids.
    fn next_aggressors(&mut self, n: usize) -> Vec<Aggressor> {
        let first = self.aggressor_id_counter;
        self.aggressor_id_counter += n as u32;
        (first..first + n as u32).map(Aggressor).collect()
    }

    /// The admissible frequency multipliers: powers of two up to the number
    /// of base periods.
    fn allowed_multipliers(num_base_periods: usize) -> Vec<usize> {
        let mut multipliers = Vec::new();
        let mut m = 1;
        while m <= num_base_periods {
            multipliers.push(m);
            m *= 2;
        }
        multipliers
    }

    /// Draws an index into a list of `len` elements from a Gaussian centered
    /// at the middle of the list (σ = 1), redrawing until the sample lands
    /// inside the list.
    fn random_gaussian_index(len: usize, rng: &mut RunRng) -> usize {
        debug_assert!(len > 0);
        let mean = if len.is_multiple_of(2) {
            (len / 2 - 1) as f64
        } else {
            ((len - 1) / 2) as f64
        };
        loop {
            // Box-Muller transform
            let u1: f64 = rng.random_range(f64::MIN_POSITIVE..1.0);
            let u2: f64 = rng.random();
            let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
            let value = mean + z;
            if value >= 0.0 && (value as usize) < len {
                return value as usize;
            }
        }
    }

    /// First still-unfilled slot among the base-period repetitions of offset
    /// `k`.
    fn first_unfilled_repetition(&self, k: usize) -> Option<usize> {
        let base_period = self.pattern.base_period;
        (k..self.pattern.accesses.len())
            .step_by(base_period)
            .find(|&idx| self.pattern.accesses[idx].is_none())
    }

    /// Generates a complete frequency-based pattern.
    ///
    /// Walks the base period left to right. For every unfilled slot it draws
    /// a frequency multiplier, an N-sidedness and an amplitude, registers the
    /// resulting component and writes its slots; repetitions of the same
    /// offset left unfilled by the chosen frequency are covered by additional
    /// components drawn from the remaining (larger) multipliers. A pattern
    /// that was prefilled with fixed components is completed around them,
    /// never overwriting an occupied slot.
    ///
    /// # Errors
    ///
    /// [`BuildError::PatternFillStuck`] when a slot cannot be filled with the
    /// remaining multipliers, [`BuildError::OrphanedPrefill`] on corrupt
    /// prefilled input.
    pub fn generate_frequency_based_pattern(
        &mut self,
        params: &FuzzingParameterSet,
        rng: &mut RunRng,
    ) -> Result<(), BuildError> {
        let pattern_length = params.total_acts_pattern();
        let base_period = params.base_period();
        self.pattern.base_period = base_period;

        // never hand out ids already taken by prefilled components
        if let Some(max_id) = self
            .pattern
            .agg_access_patterns
            .iter()
            .flat_map(|aap| &aap.aggressors)
            .map(|agg| agg.0)
            .max()
        {
            self.aggressor_id_counter = self.aggressor_id_counter.max(max_id + 1);
        }

        // scan for prefilled areas (replay analysis path); remember the start
        // index of each contiguous occupied run within the base period
        let mut prefilled_starts: Vec<usize> = Vec::new();
        if self.pattern.accesses.is_empty() {
            self.pattern.accesses = vec![None; pattern_length];
        } else {
            let mut in_prefilled_area = false;
            for i in 0..base_period {
                if self.pattern.accesses[i].is_some() {
                    if !in_prefilled_area {
                        in_prefilled_area = true;
                        prefilled_starts.push(i);
                    }
                } else {
                    in_prefilled_area = false;
                }
            }
        }

        // bound for N and amplitude at offset k: the next prefilled run (we
        // must not grow into it), or the base period
        let next_prefilled_bound = |k: usize| -> usize {
            prefilled_starts
                .iter()
                .copied()
                .find(|&start| start > k)
                .unwrap_or(base_period)
        };

        let allowed_multipliers = Self::allowed_multipliers(params.num_base_periods());
        self.pattern.max_period = allowed_multipliers.last().copied().unwrap_or(1) * base_period;

        let mut k = 0;
        while k < base_period {
            let mut multipliers = allowed_multipliers.clone();

            let (num_aggressors, amplitude) = match self.pattern.accesses[k] {
                None => {
                    let pick = multipliers[Self::random_gaussian_index(multipliers.len(), rng)];
                    multipliers.retain(|&m| m >= pick);
                    let frequency = base_period * pick;

                    let bound = next_prefilled_bound(k);
                    let slots_left = bound - k;
                    let num_aggressors = if slots_left == 1 {
                        1
                    } else {
                        params.random_n_sided(slots_left, rng)
                    };
                    let amplitude = params.random_amplitude(slots_left / num_aggressors, rng);

                    let aggressors = self.next_aggressors(num_aggressors);
                    self.pattern.agg_access_patterns.push(AggressorAccessPattern {
                        frequency,
                        amplitude,
                        start_offset: k,
                        aggressors: aggressors.clone(),
                    });
                    fill_slots(k, frequency, amplitude, &aggressors, &mut self.pattern.accesses);
                    (num_aggressors, amplitude)
                }
                Some(aggressor) => {
                    // prefilled slot: adopt N and amplitude from its component
                    // so the cursor advances past the whole occupied block
                    let aap = self
                        .pattern
                        .access_pattern_by_aggressor(aggressor)
                        .ok_or(BuildError::OrphanedPrefill { slot: k, aggressor })?;
                    multipliers.retain(|&m| m >= aap.frequency / base_period);
                    (aap.aggressors.len(), aap.amplitude)
                }
            };

            // repetitions of offset k that the chosen frequency left
            // unfilled: fill them with fresh components at the remaining
            // (larger) multipliers
            while let Some(next_slot) = self.first_unfilled_repetition(k) {
                if multipliers.is_empty() {
                    return Err(BuildError::PatternFillStuck { slot: next_slot });
                }
                let pick = multipliers[Self::random_gaussian_index(multipliers.len(), rng)];
                multipliers.retain(|&m| m >= pick);
                let frequency = base_period * pick;

                let aggressors = self.next_aggressors(num_aggressors);
                self.pattern.agg_access_patterns.push(AggressorAccessPattern {
                    frequency,
                    amplitude,
                    start_offset: next_slot,
                    aggressors: aggressors.clone(),
                });
                fill_slots(
                    next_slot,
                    frequency,
                    amplitude,
                    &aggressors,
                    &mut self.pattern.accesses,
                );
            }

            k += num_aggressors * amplitude;
        }

        self.pattern.total_activations = self.pattern.accesses.len();
        self.pattern.num_refresh_intervals = params.num_refresh_intervals();
        debug!(
            "generated pattern {}: {} components over {} slots",
            self.pattern.id,
            self.pattern.agg_access_patterns.len(),
            self.pattern.total_activations
        );
        Ok(())
    }

    /// Seeds the pattern with fixed components before generation, assigning
    /// fresh consecutive ids to their aggressors. Used by replay analysis to
    /// hold parts of an effective pattern constant while the rest is
    /// regenerated.
    pub fn prefill_pattern(&mut self, total_acts: usize, fixed: &[AggressorAccessPattern]) {
        self.aggressor_id_counter = 1;
        self.pattern.accesses = vec![None; total_acts];
        for template in fixed {
            let aggressors = self.next_aggressors(template.aggressors.len());
            let aap = AggressorAccessPattern {
                frequency: template.frequency,
                amplitude: template.amplitude,
                start_offset: template.start_offset,
                aggressors: aggressors.clone(),
            };
            fill_slots(
                aap.start_offset,
                aap.frequency,
                aap.amplitude,
                &aggressors,
                &mut self.pattern.accesses,
            );
            self.pattern.agg_access_patterns.push(aap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_pattern(seed: u64, acts: usize) -> HammeringPattern {
        let mut rng = RunRng::seeded(seed);
        let params = FuzzingParameterSet::new(acts, 8192, 16, &mut rng);
        let mut pattern = HammeringPattern::new(params.base_period(), &mut rng);
        PatternBuilder::new(&mut pattern)
            .generate_frequency_based_pattern(&params, &mut rng)
            .expect("generation");
        pattern
    }

    #[test]
    fn generated_pattern_has_no_unfilled_slots() {
        for seed in 0..20 {
            let pattern = build_pattern(seed, 100);
            assert!(pattern.is_fully_filled(), "seed {seed}");
            assert_eq!(pattern.total_activations, pattern.accesses.len());
        }
    }

    #[test]
    fn frequencies_are_power_of_two_multiples_of_base_period() {
        for seed in 0..20 {
            let pattern = build_pattern(seed, 100);
            let num_base_periods = pattern.total_activations / pattern.base_period;
            for aap in &pattern.agg_access_patterns {
                assert!(aap.frequency.is_multiple_of(pattern.base_period));
                let multiplier = aap.frequency / pattern.base_period;
                assert!(
                    multiplier.is_power_of_two() && multiplier <= num_base_periods,
                    "seed {seed}: multiplier {multiplier} of {num_base_periods}"
                );
            }
        }
    }

    #[test]
    fn components_satisfy_their_invariants() {
        for seed in 0..20 {
            let pattern = build_pattern(seed, 100);
            for aap in &pattern.agg_access_patterns {
                assert!(aap.start_offset < pattern.total_activations);
                // the block never crosses a base-period boundary, and repeats
                // before its own frequency elapses
                let phase = aap.start_offset % pattern.base_period;
                assert!(aap.amplitude * aap.aggressors.len() + phase <= pattern.base_period);
                assert!(aap.start_offset < aap.frequency);
            }
        }
    }

    #[test]
    fn every_slot_is_owned_by_exactly_one_component() {
        let pattern = build_pattern(11, 100);
        let mut owners = vec![0usize; pattern.accesses.len()];
        for aap in &pattern.agg_access_patterns {
            let mut shadow: Vec<Option<Aggressor>> = vec![None; pattern.accesses.len()];
            fill_slots(
                aap.start_offset,
                aap.frequency,
                aap.amplitude,
                &aap.aggressors,
                &mut shadow,
            );
            for (i, slot) in shadow.iter().enumerate() {
                if let Some(agg) = slot {
                    owners[i] += 1;
                    assert_eq!(pattern.accesses[i], Some(*agg), "slot {i}");
                }
            }
        }
        assert!(owners.iter().all(|&count| count == 1));
    }

    #[test]
    fn generation_is_deterministic_under_fixed_seed() {
        let a = build_pattern(0xDEADBEEF, 100);
        let b = build_pattern(0xDEADBEEF, 100);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn prefilled_components_survive_generation_untouched() {
        let mut rng = RunRng::seeded(21);
        let params = FuzzingParameterSet::new(100, 8192, 16, &mut rng);
        let fixed = vec![AggressorAccessPattern {
            frequency: params.base_period(),
            amplitude: 1,
            start_offset: 2,
            aggressors: vec![Aggressor(0), Aggressor(0)],
        }];

        let mut pattern = HammeringPattern::new(params.base_period(), &mut rng);
        let mut builder = PatternBuilder::new(&mut pattern);
        builder.prefill_pattern(params.total_acts_pattern(), &fixed);
        let before: Vec<(usize, Aggressor)> = pattern
            .accesses
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|a| (i, a)))
            .collect();

        PatternBuilder::new(&mut pattern)
            .generate_frequency_based_pattern(&params, &mut rng)
            .expect("generation");

        assert!(pattern.is_fully_filled());
        for (i, agg) in before {
            assert_eq!(pattern.accesses[i], Some(agg), "prefilled slot {i} changed");
        }
    }
}
