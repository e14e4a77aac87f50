//! Timing-based DRAM topology discovery.
//!
//! Everything the fuzzer needs to know about the memory controller at runtime
//! is recovered here from access timing alone:
//!
//! - a latency threshold separating same-bank from different-bank address
//!   pairs ([`DramAnalyzer::find_threshold`]),
//! - one address bucket per bank ([`DramAnalyzer::find_bank_conflicts`],
//!   [`DramAnalyzer::find_targets`]),
//! - the number of activations the controller lets through between two
//!   REFRESH commands, and the cycle threshold that marks a REF
//!   ([`DramAnalyzer::count_acts_per_trefi`],
//!   [`DramAnalyzer::find_sync_ref_threshold`]),
//! - which bank index of a second memory region corresponds to each bank of
//!   this one ([`DramAnalyzer::corresponding_banks_for_mapping`]).
//!
//! Timing measurements are intrinsically flaky; every discovery step retries
//! within a fixed budget and only fails once that budget is exhausted.

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::Rng as _;
use thiserror::Error;

use crate::dram::{AddressModel, DramAddr};
use crate::memory::{AggressorPtr, MemoryRegion};
use crate::timing;
use crate::util::{self, CL_SIZE, NUM_TARGETS, RunRng};

/// Retry budget multiplier for bank discovery (`banks * 256` draws).
const BANK_DISCOVERY_TRIES_PER_BANK: usize = 256;

/// Samples drawn when estimating the bank-conflict threshold.
const THRESHOLD_SAMPLES: usize = 512;

/// Timed rounds in the activation-counting loop.
const ACT_COUNT_ROUNDS: usize = 500_000;

/// Address pairs averaged in the activation-counting loop.
const ACT_COUNT_PAIRS: usize = 5;

/// Spike counts below this are treated as noise when searching the
/// activations-per-REF mode.
const MIN_PLAUSIBLE_ACTS: usize = 10;

/// Errors produced by timing-based discovery.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Could not populate one address bucket per bank within the retry budget
    #[error(
        "could not find conflicting address sets for all {banks} banks ({found} found); is the bank count correct?"
    )]
    BankDiscoveryFailed {
        /// configured number of banks
        banks: usize,
        /// buckets populated before the budget ran out
        found: usize,
    },
    /// The sampled latencies did not split into two clusters
    #[error("latency samples are not bimodal; cannot derive a conflict threshold")]
    ThresholdNotFound,
    /// No REF spikes observed while counting activations
    #[error("no refresh spikes observed; cannot count activations per tREFI")]
    NoRefreshSpikes,
}

/// Statistics over a latency sample vector.
#[derive(Debug, Default, Clone, Copy)]
struct LatencyStats {
    min: u64,
    median: u64,
    avg: u64,
    std: u64,
}

fn latency_stats(samples: &[u64]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }
    let sorted = samples.iter().copied().sorted_unstable().collect_vec();
    let avg = sorted.iter().sum::<u64>() / sorted.len() as u64;
    let var = sorted
        .iter()
        .map(|&s| {
            let d = s.abs_diff(avg);
            d * d
        })
        .sum::<u64>()
        / sorted.len() as u64;
    LatencyStats {
        min: sorted[0],
        median: sorted[sorted.len() / 2],
        avg,
        std: var.isqrt(),
    }
}

/// Timing-based DRAM topology analyzer for one memory region.
pub struct DramAnalyzer<'a> {
    region: &'a MemoryRegion,
    num_banks: usize,
    threshold: u64,
    ref_threshold: u64,
    banks: Vec<Vec<AggressorPtr>>,
    rng: RunRng,
}

impl<'a> DramAnalyzer<'a> {
    /// Creates an analyzer over `region` for a geometry with `num_banks`
    /// banks.
    pub fn new(region: &'a MemoryRegion, num_banks: usize, rng: RunRng) -> Self {
        DramAnalyzer {
            region,
            num_banks,
            threshold: 0,
            ref_threshold: 0,
            banks: vec![Vec::new(); num_banks],
            rng,
        }
    }

    /// The bank-conflict threshold, valid after
    /// [`find_threshold`](Self::find_threshold).
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Address buckets per bank, valid after
    /// [`find_bank_conflicts`](Self::find_bank_conflicts).
    pub fn banks(&self) -> &[Vec<AggressorPtr>] {
        &self.banks
    }

    /// A cache-line aligned random address inside the region.
    fn random_address(&mut self) -> AggressorPtr {
        let lines = self.region.len() / CL_SIZE;
        let line = self.rng.random_range(0..lines);
        self.region.addr(line * CL_SIZE) as AggressorPtr
    }

    /// Derives the same-bank conflict threshold from the latency distribution
    /// of random address pairs.
    ///
    /// Random pairs hit the same bank with probability `1/banks` and show a
    /// clearly higher access latency (row-buffer conflict). The sorted sample
    /// vector therefore splits into two clusters; the threshold is placed in
    /// the widest gap of the upper half, between the cluster medians.
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::ThresholdNotFound`] when the samples show no usable
    /// split.
    pub fn find_threshold(&mut self) -> Result<u64, AnalyzerError> {
        info!("measuring bank-conflict threshold over {THRESHOLD_SAMPLES} random pairs");
        let bar = ProgressBar::new(THRESHOLD_SAMPLES as u64);
        bar.set_style(progress_style("conflict threshold"));

        let mut samples = Vec::with_capacity(THRESHOLD_SAMPLES);
        for _ in 0..THRESHOLD_SAMPLES {
            let a1 = self.random_address();
            let a2 = self.random_address();
            if a1 == a2 {
                continue;
            }
            samples.push(unsafe { timing::measure_conflict(a1, a2) });
            bar.inc(1);
            util::yield_cpu();
        }
        bar.finish_and_clear();

        samples.sort_unstable();
        // search the widest latency gap, excluding the tails
        let lo = samples.len() / 2;
        let hi = samples.len() - samples.len() / 50;
        let mut split = 0;
        let mut widest = 0;
        for i in lo..hi.saturating_sub(1) {
            let gap = samples[i + 1] - samples[i];
            if gap > widest {
                widest = gap;
                split = i;
            }
        }
        if widest < 20 {
            return Err(AnalyzerError::ThresholdNotFound);
        }

        let low = latency_stats(&samples[..=split]);
        let high = latency_stats(&samples[split + 1..]);
        self.threshold = (low.median + high.median) / 2;
        info!(
            "conflict threshold: {} cycles (hit median {}, conflict median {})",
            self.threshold, low.median, high.median
        );
        Ok(self.threshold)
    }

    /// Greedily finds one pair of conflicting (same-bank) addresses per bank.
    ///
    /// A candidate pair is kept when both its members conflict with each
    /// other (twice, to reject noise) and neither conflicts with any already
    /// placed bucket representative.
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::BankDiscoveryFailed`] once the retry budget of
    /// `banks * 256` draws is exhausted.
    pub fn find_bank_conflicts(&mut self) -> Result<(), AnalyzerError> {
        info!("searching conflicting address pairs for {} banks", self.num_banks);
        let bar = ProgressBar::new(self.num_banks as u64);
        bar.set_style(progress_style("bank conflicts"));

        let mut found = 0usize;
        let mut remaining_tries = self.num_banks * BANK_DISCOVERY_TRIES_PER_BANK;

        'outer: while found < self.num_banks && remaining_tries > 0 {
            remaining_tries -= 1;
            let a1 = self.random_address();
            let a2 = self.random_address();
            let t1 = unsafe { timing::measure_conflict(a1, a2) };
            let t2 = unsafe { timing::measure_conflict(a1, a2) };
            if t1 <= self.threshold || t2 <= self.threshold {
                continue;
            }

            // reject the pair if either member conflicts with a bucket that
            // is already taken; a single high measurement may be noise, both
            // high means same bank as that bucket
            for bucket in self.banks.iter().filter(|b| !b.is_empty()) {
                let r1 = unsafe { timing::measure_conflict(a1, bucket[0]) };
                let r2 = unsafe { timing::measure_conflict(a2, bucket[0]) };
                if r1 > self.threshold || r2 > self.threshold {
                    continue 'outer;
                }
            }

            self.banks[found].push(a1);
            self.banks[found].push(a2);
            found += 1;
            bar.set_position(found as u64);
            debug!(
                "bank bucket {} populated ({} tries left)",
                found, remaining_tries
            );
        }
        bar.finish_and_clear();

        if found < self.num_banks {
            return Err(AnalyzerError::BankDiscoveryFailed {
                banks: self.num_banks,
                found,
            });
        }
        info!("found conflicting address pairs for all banks");
        Ok(())
    }

    /// Grows every bank bucket to [`NUM_TARGETS`] addresses.
    ///
    /// A sampled address joins a bucket when its conflict time against the
    /// current bucket members, averaged over 5 repetitions, exceeds the
    /// threshold.
    pub fn find_targets(&mut self) {
        const REPETITIONS: u64 = 5;
        info!("growing each bank bucket to {} addresses", NUM_TARGETS);
        let bar = ProgressBar::new((self.num_banks * NUM_TARGETS) as u64);
        bar.set_style(progress_style("bank targets"));

        for bank_no in 0..self.num_banks {
            while self.banks[bank_no].len() < NUM_TARGETS {
                let lines = self.region.len() / CL_SIZE;
                let line = self.rng.random_range(0..lines);
                let candidate = self.region.addr(line * CL_SIZE) as AggressorPtr;
                let bucket = &self.banks[bank_no];
                if bucket.contains(&candidate) {
                    continue;
                }
                let mut cumulative = 0u64;
                for _ in 0..REPETITIONS {
                    for &member in bucket {
                        cumulative += unsafe { timing::measure_conflict(candidate, member) };
                    }
                }
                let avg = cumulative / (REPETITIONS * bucket.len() as u64);
                if avg > self.threshold {
                    self.banks[bank_no].push(candidate);
                    bar.inc(1);
                }
            }
            util::yield_cpu();
        }
        bar.finish_and_clear();
        info!("populated {} addresses per bank", NUM_TARGETS);
    }

    /// Counts how many activations the controller admits between two REFRESH
    /// commands.
    ///
    /// A same-bank address pair is accessed (flushed) in a tight timed loop.
    /// A REF blocks the bank and shows up as a latency spike; samples above
    /// `mean * 1.15` (but below one standard deviation over it, rejecting
    /// outliers) are classified as REF events. The number of accesses between
    /// consecutive spikes is recorded and the most frequent count is the
    /// result. The same pass derives the REF threshold installed for
    /// synchronized hammering as the midpoint between the sub-spike median
    /// and the smallest spike.
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::NoRefreshSpikes`] when no plausible spike distance
    /// was observed.
    pub fn count_acts_per_trefi(&mut self) -> Result<usize, AnalyzerError> {
        info!("counting activations per tREFI");
        let bar = ProgressBar::new(ACT_COUNT_PAIRS as u64);
        bar.set_style(progress_style("acts per tREFI"));

        let mut count_per_acts: std::collections::HashMap<usize, usize> =
            std::collections::HashMap::new();
        let mut spike_samples: Vec<u64> = Vec::new();
        let mut all_samples: Vec<u64> = Vec::new();

        for pair_no in 0..ACT_COUNT_PAIRS {
            let bucket = &self.banks[pair_no % self.num_banks];
            assert!(bucket.len() >= 2, "bank buckets not populated");
            let (a1, a2) = (bucket[0], bucket[1]);

            // warm up the addresses and evict them so every access activates
            unsafe {
                timing::access(a1);
                timing::access(a2);
                timing::flush(a1);
                timing::flush(a2);
            }
            timing::fence_store();

            let mut samples = vec![0u64; ACT_COUNT_ROUNDS];
            let mut t_end = timing::timestamp();
            for sample in samples.iter_mut() {
                let t_start = t_end;
                timing::fence_store();
                unsafe {
                    timing::access(a1);
                    timing::flush(a1);
                    timing::access(a2);
                    timing::flush(a2);
                }
                t_end = timing::timestamp();
                *sample = t_end - t_start;
            }

            let stats = latency_stats(&samples);
            let spike_threshold = (stats.avg as f64 * 1.15) as u64;
            debug!(
                "pair {}: avg={} std={} spike threshold={}",
                pair_no, stats.avg, stats.std, spike_threshold
            );

            let mut acts_since_spike = 0usize;
            for &sample in &samples {
                if sample > spike_threshold && sample < spike_threshold + stats.std {
                    if acts_since_spike >= MIN_PLAUSIBLE_ACTS {
                        *count_per_acts.entry(acts_since_spike).or_insert(0) += 1;
                        spike_samples.push(sample);
                    }
                    acts_since_spike = 0;
                } else {
                    // two accesses per timed round
                    acts_since_spike += 2;
                }
            }
            all_samples.extend_from_slice(&samples);
            bar.inc(1);
            util::yield_cpu();
        }
        bar.finish_and_clear();

        let (&acts, &count) = count_per_acts
            .iter()
            .max_by_key(|&(_, &count)| count)
            .ok_or(AnalyzerError::NoRefreshSpikes)?;
        info!("acts per tREFI: {} (seen {} times)", acts, count);

        // REF threshold: midpoint between the normal-access median and the
        // smallest genuine spike
        let spike_stats = latency_stats(&spike_samples);
        let below: Vec<u64> = all_samples
            .iter()
            .copied()
            .filter(|&s| s < spike_stats.median)
            .collect();
        let below_stats = latency_stats(&below);
        self.ref_threshold = (below_stats.median + spike_stats.min) / 2;
        info!("REF threshold: {} cycles", self.ref_threshold);

        Ok(acts)
    }

    /// Returns the calibrated REF threshold, refining it from the timing
    /// floor of non-REF accesses when necessary.
    ///
    /// # Errors
    ///
    /// Propagates [`count_acts_per_trefi`](Self::count_acts_per_trefi) errors
    /// when the counting pass has not run yet.
    pub fn find_sync_ref_threshold(&mut self) -> Result<u64, AnalyzerError> {
        if self.ref_threshold == 0 {
            self.count_acts_per_trefi()?;
        }
        Ok(self.ref_threshold)
    }

    /// Sanity-checks a calibrated REF threshold by measuring how often a
    /// timed sync loop actually crosses it. Logs a warning when REF detection
    /// looks implausible (threshold mis-calibrated).
    pub fn check_sync_ref_threshold(&mut self, threshold: u64) {
        const ROUNDS: usize = 50_000;
        let bucket = &self.banks[0];
        let (a1, a2) = (bucket[0], bucket[1]);
        let mut crossings = 0usize;
        let mut t_end = timing::timestamp();
        for _ in 0..ROUNDS {
            let t_start = t_end;
            unsafe {
                timing::access(a1);
                timing::flush(a1);
                timing::access(a2);
                timing::flush(a2);
            }
            timing::fence_load();
            t_end = timing::timestamp();
            if t_end - t_start > threshold {
                crossings += 1;
            }
        }
        let ratio = crossings as f64 / ROUNDS as f64;
        // tREFI admits dozens of activations, so crossings must be rare but
        // not absent
        if ratio == 0.0 || ratio > 0.2 {
            warn!(
                "sync REF threshold {} looks mis-calibrated: {:.2}% of rounds cross it",
                threshold,
                ratio * 100.0
            );
        } else {
            info!(
                "sync REF threshold {} verified ({:.2}% of rounds cross it)",
                threshold,
                ratio * 100.0
            );
        }
    }

    /// For every bank of this region, finds the bank index of a second
    /// region (`other_id` in `model`) that maps to the same physical bank.
    ///
    /// A representative of our bank is timed against candidate addresses of
    /// each bank of the other region; the candidate bank whose conflict time
    /// exceeds the threshold is the corresponding one. The result vector is
    /// meant for [`AddressModel::initialize_bank_translation`].
    ///
    /// # Errors
    ///
    /// [`AnalyzerError::BankDiscoveryFailed`] when some bank has no
    /// conflicting counterpart (wrong geometry or threshold).
    pub fn corresponding_banks_for_mapping(
        &mut self,
        model: &AddressModel,
        my_id: usize,
        other_id: usize,
    ) -> Result<Vec<usize>, AnalyzerError> {
        const PROBE_ROWS: [usize; 3] = [64, 1024, 4096];
        info!(
            "matching banks of mapping {} against mapping {}",
            my_id, other_id
        );
        let mut translation = Vec::with_capacity(self.num_banks);

        for bank_no in 0..self.num_banks {
            let rep = self.banks[bank_no][0];
            let rep_dram = model.from_virt(rep, my_id);

            let mut matched = None;
            'candidates: for candidate_bank in 0..self.num_banks {
                for &row in &PROBE_ROWS {
                    let candidate = model.to_virt(&DramAddr::with_mapping(
                        candidate_bank,
                        row,
                        rep_dram.col,
                        other_id,
                    ));
                    let t = unsafe { timing::measure_conflict(rep, candidate) };
                    if t > self.threshold {
                        matched = Some(candidate_bank);
                        break 'candidates;
                    }
                }
            }

            match matched {
                Some(other_bank) => {
                    debug!("bank {} of mapping {} -> bank {}", bank_no, my_id, other_bank);
                    translation.push(other_bank);
                }
                None => {
                    return Err(AnalyzerError::BankDiscoveryFailed {
                        banks: self.num_banks,
                        found: bank_no,
                    });
                }
            }
        }
        Ok(translation)
    }
}

fn progress_style(name: &str) -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "{name:<20} {{bar:40.cyan/blue}} {{pos}}/{{len}}"
    ))
    .expect("static template")
    .progress_chars("##-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_stats_basics() {
        let stats = latency_stats(&[10, 20, 30, 40, 50]);
        assert_eq!(stats.min, 10);
        assert_eq!(stats.median, 30);
        assert_eq!(stats.avg, 30);
        assert!(stats.std > 0);

        let empty = latency_stats(&[]);
        assert_eq!(empty.min, 0);
    }
}
