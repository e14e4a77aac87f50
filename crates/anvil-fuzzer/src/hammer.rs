//! The synchronized hammering contract and its software implementation.
//!
//! Both execution paths (the JIT emitter in [`crate::jitter`] and the
//! interpreter here) run the same loop: synchronize with the tail of a
//! REFRESH interval using timed accesses to dedicated sync rows, stream
//! through the exported access sequence with the configured flushing and
//! fencing behavior, and re-synchronize after every refresh interval's worth
//! of activations (or after every full pattern iteration), until the
//! activation budget is spent.

use std::collections::HashMap;
use std::str::FromStr;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapper::PatternStep;
use anvil_core::memory::AggressorPtr;
use anvil_core::timing;

/// When an accessed aggressor's cache line is evicted again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushingStrategy {
    /// Flush immediately after the access
    EarliestPossible,
    /// Flush everything after a full pattern iteration
    Batched,
    /// Flush just before the next access of the same address
    LatestPossible,
}

/// When fences guard a re-access of a previously flushed address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FencingStrategy {
    /// Fence right before the next access of a flushed address
    LatestPossible,
    /// Never fence for ordering (throughput over precision)
    OmitFencing,
}

/// Which fence instruction the emitted code uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FenceType {
    /// No fences at all
    None,
    /// `mfence`
    Mfence,
    /// `lfence`
    Lfence,
    /// `sfence`
    Sfence,
}

impl FromStr for FenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(FenceType::None),
            "mfence" => Ok(FenceType::Mfence),
            "lfence" => Ok(FenceType::Lfence),
            "sfence" => Ok(FenceType::Sfence),
            other => Err(format!("unknown fence type '{other}'")),
        }
    }
}

impl FenceType {
    /// Executes this fence (no-op for [`FenceType::None`]).
    #[inline(always)]
    pub fn issue(&self) {
        match self {
            FenceType::None => {}
            FenceType::Mfence => timing::fence_full(),
            FenceType::Lfence => timing::fence_load(),
            FenceType::Sfence => timing::fence_store(),
        }
    }
}

/// Multiple of `acts_per_trefi` after which a sync loop gives up.
pub const SYNC_CAP_FACTOR: usize = 16;

/// A timed sync round this far above the REF threshold is an outlier
/// (preemption, SMI), not a REF.
pub const SYNC_OUTLIER_FACTOR: u64 = 3;

/// Synchronization parameters shared by both execution paths.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Rows (in a conflicting bank) timed to detect REF
    pub sync_rows: Vec<AggressorPtr>,
    /// Cycle threshold above which a sync round saw a REF
    pub ref_threshold: u64,
    /// Activations the controller admits per tREFI
    pub num_acts_per_trefi: usize,
    /// Re-sync after every tREFI worth of accesses instead of once per
    /// pattern iteration
    pub sync_each_ref: bool,
    /// Sync rows accessed per timed round (1 or 2)
    pub num_aggs_for_sync: usize,
}

impl SyncConfig {
    /// Upper bound of timed sync rounds before [`HammerError::SyncTimeout`].
    pub fn max_sync_rounds(&self) -> usize {
        SYNC_CAP_FACTOR * self.num_acts_per_trefi.max(1)
    }
}

/// Execution statistics of one hammering run.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct HammeringData {
    /// Aggressor activations issued
    pub total_activations: u64,
    /// Additional activations spent inside sync loops
    pub sync_activations: u64,
    /// Wall cycles of the whole run
    pub elapsed_cycles: u64,
}

/// Errors during synchronized hammering.
#[derive(Debug, Error)]
pub enum HammerError {
    /// A REF-sync loop exceeded its iteration bound; the threshold is
    /// mis-calibrated for this mapping
    #[error("REF sync did not detect a refresh within {rounds} timed rounds")]
    SyncTimeout {
        /// rounds spent before giving up
        rounds: usize,
    },
    /// The access sequence contains no accesses
    #[error("empty access sequence")]
    EmptyPattern,
    /// No function is currently jitted
    #[error("no hammering function loaded; call jit_strict first")]
    NotJitted,
}

/// Waits for the tail of a REFRESH interval using timed accesses to the sync
/// rows.
///
/// Each round accesses `num_aggs_for_sync` sync rows (bracketed by flushes),
/// timing the round trip. A round slower than the REF threshold but below the
/// outlier bound means the memory controller just issued a REF. Every access
/// is counted into `sync_acts`.
///
/// # Errors
///
/// [`HammerError::SyncTimeout`] after [`SyncConfig::max_sync_rounds`] rounds.
pub fn sync_ref(
    sync: &SyncConfig,
    sync_idx: &mut usize,
    sync_acts: &mut u64,
) -> Result<(), HammerError> {
    let rows = &sync.sync_rows;
    let outlier_bound = sync.ref_threshold * SYNC_OUTLIER_FACTOR;
    let max_rounds = sync.max_sync_rounds();

    let mut after = timing::timestamp();
    for _ in 0..max_rounds {
        let before = after;
        for q in 0..sync.num_aggs_for_sync {
            let row = rows[(*sync_idx + q) % rows.len()];
            unsafe {
                timing::access(row);
            }
            *sync_acts += 1;
        }
        timing::fence_load();
        after = timing::timestamp();
        let delta = after - before;
        for q in 0..sync.num_aggs_for_sync {
            let row = rows[(*sync_idx + q) % rows.len()];
            unsafe {
                timing::flush(row);
            }
        }
        *sync_idx = (*sync_idx + sync.num_aggs_for_sync) % rows.len();

        if delta > sync.ref_threshold && delta < outlier_bound {
            return Ok(());
        }
    }
    Err(HammerError::SyncTimeout { rounds: max_rounds })
}

/// The software implementation of the hammering contract.
///
/// Slower than the JIT path by the loop and dispatch overhead (roughly 20%
/// fewer activations per interval), but available on any build and easier to
/// instrument.
pub struct InterpHammerer {
    flushing: FlushingStrategy,
    fencing: FencingStrategy,
    fence_type: FenceType,
}

impl InterpHammerer {
    /// Creates an interpreter with the given strategies.
    pub fn new(flushing: FlushingStrategy, fencing: FencingStrategy, fence_type: FenceType) -> Self {
        InterpHammerer {
            flushing,
            fencing,
            fence_type,
        }
    }

    /// Runs the synchronized hammering loop until `total_activations`
    /// aggressor accesses were issued.
    ///
    /// # Errors
    ///
    /// [`HammerError::SyncTimeout`] when REF detection fails,
    /// [`HammerError::EmptyPattern`] for an access-free sequence.
    pub fn hammer_pattern(
        &self,
        steps: &[PatternStep],
        sync: &SyncConfig,
        total_activations: u64,
    ) -> Result<HammeringData, HammerError> {
        let addresses: Vec<AggressorPtr> = steps
            .iter()
            .filter_map(|step| match step {
                PatternStep::Access(ptr) => Some(*ptr),
                PatternStep::Fence => None,
            })
            .collect();
        if addresses.is_empty() {
            return Err(HammerError::EmptyPattern);
        }

        debug!(
            "interpreting pattern: {} accesses/iteration, {} sync rows, budget {}",
            addresses.len(),
            sync.sync_rows.len(),
            total_activations
        );

        // warm the address vector itself, then evict all aggressors so the
        // first iteration activates rows instead of hitting cache
        for &addr in &addresses {
            unsafe {
                timing::access(addr);
                timing::flush(addr);
            }
        }
        timing::fence_full();

        let mut accessed_before: HashMap<AggressorPtr, bool> = HashMap::new();
        let mut sync_idx = 0usize;
        let mut data = HammeringData::default();

        let start = timing::timestamp();
        sync_ref(sync, &mut sync_idx, &mut data.sync_activations)?;

        let mut acts_since_sync = 0usize;
        while data.total_activations < total_activations {
            for step in steps {
                match *step {
                    PatternStep::Fence => self.fence_type.issue(),
                    PatternStep::Access(addr) => {
                        let seen = accessed_before.entry(addr).or_insert(false);
                        if *seen {
                            if self.flushing == FlushingStrategy::LatestPossible {
                                unsafe { timing::flush(addr) };
                            }
                            if self.fencing == FencingStrategy::LatestPossible {
                                self.fence_type.issue();
                            }
                        }
                        unsafe { timing::access(addr) };
                        *seen = true;
                        data.total_activations += 1;
                        acts_since_sync += 1;
                        if self.flushing == FlushingStrategy::EarliestPossible {
                            unsafe { timing::flush(addr) };
                        }
                        if sync.sync_each_ref && acts_since_sync >= sync.num_acts_per_trefi {
                            timing::fence_load();
                            sync_ref(sync, &mut sync_idx, &mut data.sync_activations)?;
                            acts_since_sync = 0;
                        }
                    }
                }
            }

            if self.flushing == FlushingStrategy::Batched {
                for &addr in accessed_before.keys() {
                    unsafe { timing::flush(addr) };
                }
            }
            // pattern iterations never overlap in the access stream
            timing::fence_full();

            if !sync.sync_each_ref {
                sync_ref(sync, &mut sync_idx, &mut data.sync_activations)?;
                acts_since_sync = 0;
            }
        }
        data.elapsed_cycles = timing::timestamp() - start;

        trace!(
            "interpreter done: {} activations, {} sync activations, {} cycles",
            data.total_activations, data.sync_activations, data.elapsed_cycles
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Median round-trip of a flushed pair access, so tests can pick a
    /// threshold the current machine actually crosses.
    fn measured_round_trip(rows: &[AggressorPtr]) -> u64 {
        let mut deltas = Vec::with_capacity(64);
        let mut after = timing::timestamp();
        for _ in 0..64 {
            let before = after;
            unsafe {
                timing::access(rows[0]);
                timing::access(rows[1]);
            }
            timing::fence_load();
            after = timing::timestamp();
            deltas.push(after - before);
            unsafe {
                timing::flush(rows[0]);
                timing::flush(rows[1]);
            }
        }
        deltas.sort_unstable();
        deltas[deltas.len() / 2]
    }

    fn calibrated_sync(buf: &[u8]) -> SyncConfig {
        let sync_rows: Vec<AggressorPtr> =
            (0..8).map(|i| unsafe { buf.as_ptr().add(i * 64) }).collect();
        // half the typical round trip: crossed by a typical round, while the
        // outlier bound still admits it
        let ref_threshold = (measured_round_trip(&sync_rows) / 2).max(1);
        SyncConfig {
            sync_rows,
            ref_threshold,
            num_acts_per_trefi: 32,
            sync_each_ref: false,
            num_aggs_for_sync: 2,
        }
    }

    #[test]
    fn sync_ref_times_out_on_unreachable_threshold() {
        let buf = vec![0u8; 4096];
        let mut sync = calibrated_sync(&buf);
        // no access pair takes forever, so an absurd threshold must trip the cap
        sync.ref_threshold = u64::MAX / SYNC_OUTLIER_FACTOR - 1;
        let mut idx = 0;
        let mut acts = 0;
        let result = sync_ref(&sync, &mut idx, &mut acts);
        assert!(matches!(result, Err(HammerError::SyncTimeout { .. })));
        assert_eq!(acts as usize, sync.max_sync_rounds() * 2);
    }

    #[test]
    fn sync_ref_returns_once_threshold_crossed() {
        let buf = vec![0u8; 4096];
        let sync = calibrated_sync(&buf);
        let mut idx = 0;
        let mut acts = 0;
        sync_ref(&sync, &mut idx, &mut acts).expect("typical round crosses threshold");
        assert!(acts >= 2);
    }

    #[test]
    fn interpreter_spends_the_activation_budget() {
        let buf = vec![0u8; 1 << 16];
        let sync = calibrated_sync(&buf);
        let steps: Vec<PatternStep> = (0..16)
            .map(|i| PatternStep::Access(unsafe { buf.as_ptr().add(i * 4096) }))
            .collect();

        let hammerer = InterpHammerer::new(
            FlushingStrategy::EarliestPossible,
            FencingStrategy::LatestPossible,
            FenceType::Mfence,
        );
        let data = hammerer.hammer_pattern(&steps, &sync, 256).expect("hammer");
        assert!(data.total_activations >= 256);
        assert!(data.elapsed_cycles > 0);
    }

    #[test]
    fn interpreter_rejects_empty_patterns() {
        let buf = vec![0u8; 4096];
        let sync = calibrated_sync(&buf);
        let hammerer = InterpHammerer::new(
            FlushingStrategy::Batched,
            FencingStrategy::OmitFencing,
            FenceType::None,
        );
        assert!(matches!(
            hammerer.hammer_pattern(&[PatternStep::Fence], &sync, 10),
            Err(HammerError::EmptyPattern)
        ));
    }

    #[test]
    fn fence_type_parsing() {
        assert_eq!("mfence".parse::<FenceType>().unwrap(), FenceType::Mfence);
        assert_eq!("none".parse::<FenceType>().unwrap(), FenceType::None);
        assert!("pause".parse::<FenceType>().is_err());
    }
}
