//! Fuzzing orchestration: the generate→map→hammer→scan loop and replay.
//!
//! [`fuzzy`] drives randomized fuzzing within a wall-clock budget; [`replay`]
//! re-executes archived patterns and profiles their effectiveness. Both share
//! the [`ForgeContext`] (memory, address model, calibration results) and the
//! [`ForgeConfig`] (strategies and budgets fixed at startup).

pub mod fuzzy;
pub mod replay;

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::hammer::{
    FenceType, FencingStrategy, FlushingStrategy, HammerError, HammeringData, InterpHammerer,
    SyncConfig,
};
use crate::jitter::{CodeJitter, JitError};
use crate::mapper::{PatternStep, SchedulingPolicy};
use anvil_core::dram::AddressModel;
use anvil_core::memory::{AggressorPtr, DataPattern, MemoryRegion};
use anvil_core::timing;
use anvil_core::util::RunRng;

/// Fatal orchestration errors. Local per-mapping failures (sync timeouts,
/// stuck patterns, unbound aggressors) are logged and skipped instead.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Code emission failed; no run can proceed
    #[error(transparent)]
    Jit(#[from] JitError),
    /// The archive could not be written or read
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Which execution path runs the patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitterKind {
    /// JIT-emitted unrolled loop
    Jit,
    /// Software interpreter over the access sequence
    Interpreter,
}

/// Run-level configuration fixed at startup.
#[derive(Clone, Debug)]
pub struct ForgeConfig {
    /// Fence placement policy for exported patterns
    pub scheduling_policy: SchedulingPolicy,
    /// Fence instruction for all emitted fences
    pub fence_type: FenceType,
    /// Cache eviction strategy
    pub flushing: FlushingStrategy,
    /// Re-access fencing strategy
    pub fencing: FencingStrategy,
    /// JIT or interpreter execution
    pub emitter: EmitterKind,
    /// Wall-clock budget of the fuzzing loop
    pub runtime_limit: Duration,
    /// Address mappings probed per pattern
    pub probes_per_pattern: usize,
    /// Sweep the best pattern over memory after fuzzing
    pub sweep_best_pattern: bool,
    /// Victim fill pattern
    pub data_pattern: DataPattern,
}

/// Everything a forge needs to execute patterns against real memory.
pub struct ForgeContext<'a> {
    /// The hammering region
    pub region: &'a MemoryRegion,
    /// The address model with both mappings registered
    pub model: &'a AddressModel,
    /// Mapping id of the hammering region
    pub mapping_id: usize,
    /// REF-sync addresses (in the dedicated sync region, bank-translated)
    pub sync_rows: Vec<AggressorPtr>,
    /// Calibrated activations per tREFI
    pub acts_per_trefi: usize,
    /// The run's random number generator
    pub rng: RunRng,
}

impl ForgeContext<'_> {
    /// Assembles the sync parameters for one run.
    pub fn sync_config(&self, sync_each_ref: bool, num_aggs_for_sync: usize) -> SyncConfig {
        SyncConfig {
            sync_rows: self.sync_rows.clone(),
            ref_threshold: self.model.config().sync_ref_threshold,
            num_acts_per_trefi: self.acts_per_trefi,
            sync_each_ref,
            num_aggs_for_sync,
        }
    }
}

/// One ready-to-run execution of an exported access sequence.
///
/// Owns the jitted function (if any); dropping it releases the code buffer,
/// which keeps the one-function-per-jitter invariant without manual cleanup
/// at every early return.
pub struct ProbeExecutor {
    executor: Executor,
    sync: SyncConfig,
}

enum Executor {
    Jit(CodeJitter),
    Interp {
        interp: InterpHammerer,
        steps: Vec<PatternStep>,
        total_activations: u64,
    },
}

impl ProbeExecutor {
    /// Emits (or prepares) the execution of `steps` with the configured
    /// strategies.
    ///
    /// # Errors
    ///
    /// [`JitError`] when code emission fails; fatal per the error policy.
    pub fn new(
        config: &ForgeConfig,
        steps: Vec<PatternStep>,
        sync: SyncConfig,
        total_activations: u64,
    ) -> Result<Self, JitError> {
        let executor = match config.emitter {
            EmitterKind::Jit => {
                let mut jitter =
                    CodeJitter::new(config.flushing, config.fencing, config.fence_type);
                jitter.jit_strict(&steps, &sync, total_activations)?;
                Executor::Jit(jitter)
            }
            EmitterKind::Interpreter => Executor::Interp {
                interp: InterpHammerer::new(config.flushing, config.fencing, config.fence_type),
                steps,
                total_activations,
            },
        };
        Ok(ProbeExecutor { executor, sync })
    }

    /// Runs the pattern once.
    ///
    /// # Errors
    ///
    /// [`HammerError::SyncTimeout`] when REF detection failed mid-run.
    pub fn run(&self) -> Result<HammeringData, HammerError> {
        match &self.executor {
            Executor::Jit(jitter) => jitter.hammer_pattern(&self.sync),
            Executor::Interp {
                interp,
                steps,
                total_activations,
            } => interp.hammer_pattern(steps, &self.sync, *total_activations),
        }
    }
}

/// Issues plain reads over `rows` for `duration_us` microseconds.
///
/// Run between hammering rounds to reset the DRAM sampler state and to fuzz
/// at which REF the next pattern starts.
pub fn do_random_accesses(rows: &[AggressorPtr], duration_us: u64) {
    if rows.is_empty() {
        return;
    }
    let deadline = Instant::now() + Duration::from_micros(duration_us);
    while Instant::now() < deadline {
        for &row in rows {
            unsafe {
                timing::access(row);
            }
        }
        timing::fence_load();
    }
}
