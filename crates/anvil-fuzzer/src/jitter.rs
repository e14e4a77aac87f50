//! JIT emission of the synchronized hammering loop.
//!
//! The [`CodeJitter`] assembles one flat function per (pattern, mapping)
//! probe: REF synchronization, the fully unrolled access sequence with the
//! configured flushing/fencing behavior, and periodic re-synchronization.
//! Unrolling removes all loop and dispatch overhead from the access stream,
//! which buys roughly 20% more activations per refresh interval than the
//! interpreter path.
//!
//! Register plan (System V, caller-saved only):
//! `rsi` remaining activation budget, `r11d` sync-activation counter,
//! `r10d` timestamp of the last sync round, `r8` sync-round watchdog,
//! `r9` timeout flag, `rax`/`rcx`/`rdx` scratch (`rdtscp` clobbers
//! `eax`/`edx`/`ecx`).
//!
//! The emitted function returns the sync-activation count; bit 63 is set when
//! a sync loop hit its watchdog, which callers surface as
//! [`HammerError::SyncTimeout`].

use std::collections::HashMap;
use std::path::Path;

use iced_x86::IcedError;
use iced_x86::code_asm::*;
use log::{debug, info};
use memmap2::{Mmap, MmapMut};
use thiserror::Error;

use crate::hammer::{
    FenceType, FencingStrategy, FlushingStrategy, HammerError, HammeringData, SYNC_OUTLIER_FACTOR,
    SyncConfig,
};
use crate::mapper::PatternStep;
use anvil_core::memory::AggressorPtr;
use anvil_core::timing;

/// Errors from code emission.
#[derive(Debug, Error)]
pub enum JitError {
    /// The assembler rejected the instruction sequence
    #[error("assembler rejected the emitted sequence: {0}")]
    JitFailed(#[from] IcedError),
    /// Mapping the code buffer failed
    #[error("cannot map executable code buffer: {0}")]
    CodeBuffer(#[from] std::io::Error),
    /// `jit_strict` was called while a previous function was still loaded
    #[error("previous jitted function not released; call cleanup() first")]
    PreviousFunctionNotReleased,
    /// The access sequence contains no accesses
    #[error("refusing to emit an access-free pattern")]
    EmptyPattern,
}

/// One assembled, executable hammering function.
pub struct Program {
    code: Mmap,
    len: usize,
}

impl Program {
    /// Copies `code_bytes` into a fresh executable mapping.
    ///
    /// # Errors
    ///
    /// [`JitError::CodeBuffer`] when the anonymous mapping cannot be created
    /// or its protection cannot be switched to executable.
    pub fn new(code_bytes: &[u8]) -> Result<Self, JitError> {
        let mut map = MmapMut::map_anon(code_bytes.len())?;
        map[..code_bytes.len()].copy_from_slice(code_bytes);
        let code = map.make_exec()?;
        Ok(Program {
            code,
            len: code_bytes.len(),
        })
    }

    /// Runs the function.
    ///
    /// # Safety
    ///
    /// The code was assembled by [`CodeJitter::jit_strict`] and accesses the
    /// addresses baked into it; every one of them must still be mapped.
    pub unsafe fn call(&self) -> u64 {
        let entry: extern "C" fn() -> u64 = unsafe { std::mem::transmute(self.code.as_ptr()) };
        entry()
    }

    /// Dumps the raw machine code, for offline disassembly.
    ///
    /// # Errors
    ///
    /// Propagates the underlying file write error.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.code[..self.len])
    }
}

/// Emits and owns one synchronized hammering function at a time.
///
/// The function must be released with [`cleanup`](CodeJitter::cleanup) before
/// the next [`jit_strict`](CodeJitter::jit_strict) on the same instance.
pub struct CodeJitter {
    /// When aggressor cache lines are evicted
    pub flushing: FlushingStrategy,
    /// When re-accesses are fenced
    pub fencing: FencingStrategy,
    /// Fence instruction used for all emitted fences
    pub fence_type: FenceType,
    /// Activation budget baked into the current function
    pub total_activations: u64,
    program: Option<Program>,
    sync_row_cursor: usize,
}

impl CodeJitter {
    /// Creates a jitter with the given strategies.
    pub fn new(flushing: FlushingStrategy, fencing: FencingStrategy, fence_type: FenceType) -> Self {
        CodeJitter {
            flushing,
            fencing,
            fence_type,
            total_activations: 0,
            program: None,
            sync_row_cursor: 0,
        }
    }

    /// Releases the current function. Must be called between `jit_strict`
    /// invocations.
    pub fn cleanup(&mut self) {
        self.program = None;
        self.sync_row_cursor = 0;
    }

    /// True while a function is loaded.
    pub fn is_jitted(&self) -> bool {
        self.program.is_some()
    }

    fn emit_fence(&self, a: &mut CodeAssembler) -> Result<(), IcedError> {
        match self.fence_type {
            FenceType::None => Ok(()),
            FenceType::Mfence => a.mfence(),
            FenceType::Lfence => a.lfence(),
            FenceType::Sfence => a.sfence(),
        }
    }

    /// Emits one REF-sync loop timing `sync.num_aggs_for_sync` rows.
    ///
    /// The rows are chosen here, at emission time, from a cursor rolling over
    /// the sync-row set, so successive sync blocks spread their activations
    /// over different rows. On watchdog expiry the block sets the timeout
    /// flag and bails out to `abort_label`.
    fn emit_sync(
        &mut self,
        a: &mut CodeAssembler,
        sync: &SyncConfig,
        abort_label: CodeLabel,
    ) -> Result<(), IcedError> {
        let rows: Vec<AggressorPtr> = (0..sync.num_aggs_for_sync)
            .map(|q| sync.sync_rows[(self.sync_row_cursor + q) % sync.sync_rows.len()])
            .collect();
        self.sync_row_cursor =
            (self.sync_row_cursor + sync.num_aggs_for_sync) % sync.sync_rows.len();

        let mut round = a.create_label();
        let mut done = a.create_label();
        let mut timeout = a.create_label();

        // evict the timed rows so the first round activates them
        for &row in &rows {
            a.mov(rax, row as u64)?;
            a.clflushopt(byte_ptr(rax))?;
        }
        a.mfence()?;
        a.mov(r8, sync.max_sync_rounds() as u64)?;

        a.set_label(&mut round)?;
        a.dec(r8)?;
        a.jle(timeout)?;

        a.rdtscp()?;
        a.lfence()?;
        a.mov(r10d, eax)?;
        for &row in &rows {
            a.mov(rax, row as u64)?;
            a.mov(rcx, qword_ptr(rax))?;
            a.inc(r11d)?;
        }
        a.lfence()?;
        a.rdtscp()?;
        a.sub(eax, r10d)?;
        // flush the rows for the next round; there is enough slack until
        // they are timed again, so no fence is needed here
        for &row in &rows {
            a.mov(rcx, row as u64)?;
            a.clflushopt(byte_ptr(rcx))?;
        }
        // delta must exceed the REF threshold but stay below the outlier
        // bound (preemption, SMI)
        let low = sync.ref_threshold.min(i32::MAX as u64) as i32;
        let high = (sync.ref_threshold * SYNC_OUTLIER_FACTOR).min(i32::MAX as u64) as i32;
        a.cmp(eax, low)?;
        a.jle(round)?;
        a.cmp(eax, high)?;
        a.jg(round)?;
        a.jmp(done)?;

        a.set_label(&mut timeout)?;
        a.mov(r9, 1u64)?;
        a.jmp(abort_label)?;

        a.set_label(&mut done)?;
        Ok(())
    }

    /// Assembles the full synchronized hammering function for the given
    /// access sequence.
    ///
    /// # Errors
    ///
    /// [`JitError::PreviousFunctionNotReleased`] when a function is still
    /// loaded, [`JitError::EmptyPattern`] for an access-free sequence,
    /// [`JitError::JitFailed`] / [`JitError::CodeBuffer`] on assembly or
    /// mapping failures.
    pub fn jit_strict(
        &mut self,
        steps: &[PatternStep],
        sync: &SyncConfig,
        total_activations: u64,
    ) -> Result<(), JitError> {
        if self.program.is_some() {
            return Err(JitError::PreviousFunctionNotReleased);
        }
        let num_accesses = steps
            .iter()
            .filter(|s| matches!(s, PatternStep::Access(_)))
            .count();
        if num_accesses == 0 {
            return Err(JitError::EmptyPattern);
        }
        self.total_activations = total_activations;

        let mut a = CodeAssembler::new(64)?;
        let mut for_begin = a.create_label();
        let mut for_end = a.create_label();

        a.mov(rsi, total_activations)?;
        a.xor(r11d, r11d)?;
        a.xor(r9, r9)?;

        // part 1: wait for the tail of a refresh interval
        self.emit_sync(&mut a, sync, for_end)?;

        // part 2: the unrolled hammering loop
        // (the assembler rejects two labels pointing at the same
        // instruction, so the loop-begin label needs its own nop to bind to)
        a.nop()?;
        a.set_label(&mut for_begin)?;
        a.cmp(rsi, 0)?;
        a.jle(for_end)?;

        let mut accessed_before: HashMap<usize, bool> = HashMap::new();
        let mut acts_since_sync = 0usize;
        for step in steps {
            match *step {
                PatternStep::Fence => self.emit_fence(&mut a)?,
                PatternStep::Access(addr) => {
                    let addr = addr as usize;
                    let seen = accessed_before.entry(addr).or_insert(false);
                    let mut addr_in_rax = false;
                    if *seen {
                        if self.flushing == FlushingStrategy::LatestPossible {
                            a.mov(rax, addr as u64)?;
                            a.clflushopt(byte_ptr(rax))?;
                            addr_in_rax = true;
                        }
                        if self.fencing == FencingStrategy::LatestPossible {
                            self.emit_fence(&mut a)?;
                        }
                    }
                    if !addr_in_rax {
                        a.mov(rax, addr as u64)?;
                    }
                    a.mov(rcx, qword_ptr(rax))?;
                    a.dec(rsi)?;
                    if self.flushing == FlushingStrategy::EarliestPossible {
                        a.clflushopt(byte_ptr(rax))?;
                    }
                    *seen = true;

                    acts_since_sync += 1;
                    if sync.sync_each_ref && acts_since_sync >= sync.num_acts_per_trefi {
                        a.lfence()?;
                        self.emit_sync(&mut a, sync, for_end)?;
                        acts_since_sync = 0;
                    }
                }
            }
        }

        if self.flushing == FlushingStrategy::Batched {
            for (&addr, _) in accessed_before.iter() {
                a.mov(rax, addr as u64)?;
                a.clflushopt(byte_ptr(rax))?;
            }
        }
        // pattern iterations never overlap in the access stream
        a.mfence()?;

        if !sync.sync_each_ref {
            self.emit_sync(&mut a, sync, for_end)?;
        }
        a.jmp(for_begin)?;

        // epilogue: sync activations in the low bits, timeout flag at bit 63
        a.set_label(&mut for_end)?;
        a.mov(eax, r11d)?;
        a.shl(r9, 63)?;
        a.or(rax, r9)?;
        a.ret()?;

        // all jumps are relative and all data references are absolute
        // immediates, so the code can be assembled at zero and relocated
        let code_bytes = a.assemble(0)?;
        info!(
            "jitted {} bytes for {} accesses/iteration",
            code_bytes.len(),
            num_accesses
        );
        self.program = Some(Program::new(&code_bytes)?);
        Ok(())
    }

    /// Runs the jitted function once and reports its statistics.
    ///
    /// # Errors
    ///
    /// [`HammerError::NotJitted`] without a loaded function,
    /// [`HammerError::SyncTimeout`] when the function bailed out of a sync
    /// loop.
    pub fn hammer_pattern(&self, sync: &SyncConfig) -> Result<HammeringData, HammerError> {
        let program = self.program.as_ref().ok_or(HammerError::NotJitted)?;

        timing::fence_full();
        let start = timing::timestamp();
        let ret = unsafe { program.call() };
        timing::fence_full();
        let elapsed_cycles = timing::timestamp() - start;

        if ret & (1 << 63) != 0 {
            return Err(HammerError::SyncTimeout {
                rounds: sync.max_sync_rounds(),
            });
        }
        let data = HammeringData {
            total_activations: self.total_activations,
            sync_activations: ret & 0xffff_ffff,
            elapsed_cycles,
        };
        debug!(
            "jit run: {} activations, {} sync activations, {} cycles",
            data.total_activations, data.sync_activations, data.elapsed_cycles
        );
        Ok(data)
    }

    /// Dumps the current function's machine code for offline disassembly.
    ///
    /// # Errors
    ///
    /// I/O errors from the write; does nothing without a loaded function.
    pub fn dump(&self, path: &Path) -> std::io::Result<()> {
        if let Some(program) = &self.program {
            program.write(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_for(buf: &[u8]) -> SyncConfig {
        SyncConfig {
            sync_rows: (0..8).map(|i| unsafe { buf.as_ptr().add(i * 64) }).collect(),
            ref_threshold: 1,
            num_acts_per_trefi: 16,
            sync_each_ref: false,
            num_aggs_for_sync: 2,
        }
    }

    #[test]
    fn program_runs_assembled_code() {
        // mov eax, 42; ret
        let mut a = CodeAssembler::new(64).unwrap();
        a.mov(eax, 42i32).unwrap();
        a.ret().unwrap();
        let bytes = a.assemble(0).unwrap();
        let program = Program::new(&bytes).unwrap();
        assert_eq!(unsafe { program.call() }, 42);
    }

    #[test]
    fn jit_rejects_empty_pattern() {
        let buf = vec![0u8; 4096];
        let mut jitter = CodeJitter::new(
            FlushingStrategy::EarliestPossible,
            FencingStrategy::LatestPossible,
            FenceType::Mfence,
        );
        assert!(matches!(
            jitter.jit_strict(&[PatternStep::Fence], &sync_for(&buf), 100),
            Err(JitError::EmptyPattern)
        ));
    }

    #[test]
    fn jit_requires_cleanup_between_uses() {
        let buf = vec![0u8; 1 << 14];
        let steps = vec![
            PatternStep::Access(buf.as_ptr()),
            PatternStep::Access(unsafe { buf.as_ptr().add(4096) }),
        ];
        let mut jitter = CodeJitter::new(
            FlushingStrategy::EarliestPossible,
            FencingStrategy::LatestPossible,
            FenceType::Mfence,
        );
        jitter.jit_strict(&steps, &sync_for(&buf), 100).unwrap();
        assert!(matches!(
            jitter.jit_strict(&steps, &sync_for(&buf), 100),
            Err(JitError::PreviousFunctionNotReleased)
        ));
        jitter.cleanup();
        jitter.jit_strict(&steps, &sync_for(&buf), 100).unwrap();
    }

    #[test]
    fn hammer_without_program_errors() {
        let buf = vec![0u8; 4096];
        let jitter = CodeJitter::new(
            FlushingStrategy::Batched,
            FencingStrategy::OmitFencing,
            FenceType::None,
        );
        assert!(matches!(
            jitter.hammer_pattern(&sync_for(&buf)),
            Err(HammerError::NotJitted)
        ));
    }

    #[test]
    fn jitted_function_spends_budget_and_reports_sync_acts() {
        let buf = vec![0u8; 1 << 16];
        let steps: Vec<PatternStep> = (0..8)
            .map(|i| PatternStep::Access(unsafe { buf.as_ptr().add(i * 4096) }))
            .collect();

        // pick a threshold a typical flushed pair round-trip crosses so the
        // emitted sync loops terminate
        let sync_rows: Vec<AggressorPtr> =
            (0..8).map(|i| unsafe { buf.as_ptr().add(i * 64) }).collect();
        let mut deltas = Vec::new();
        let mut after = timing::timestamp();
        for _ in 0..64 {
            let before = after;
            unsafe {
                timing::access(sync_rows[0]);
                timing::access(sync_rows[1]);
            }
            timing::fence_load();
            after = timing::timestamp();
            deltas.push(after - before);
            unsafe {
                timing::flush(sync_rows[0]);
                timing::flush(sync_rows[1]);
            }
        }
        deltas.sort_unstable();
        let sync = SyncConfig {
            sync_rows,
            ref_threshold: (deltas[deltas.len() / 2] / 2).max(1),
            num_acts_per_trefi: 16,
            sync_each_ref: false,
            num_aggs_for_sync: 2,
        };

        let mut jitter = CodeJitter::new(
            FlushingStrategy::EarliestPossible,
            FencingStrategy::LatestPossible,
            FenceType::Mfence,
        );
        jitter.jit_strict(&steps, &sync, 64).unwrap();
        let data = jitter.hammer_pattern(&sync).expect("jitted run");
        assert_eq!(data.total_activations, 64);
        assert!(data.sync_activations >= 2);
        assert!(data.elapsed_cycles > 0);
    }
}
