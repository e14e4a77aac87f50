//! Low-level timing and cache maintenance primitives.
//!
//! Everything in this module compiles down to a handful of instructions and is
//! safe to use inside tight measurement loops: no allocation, no I/O, no
//! library calls.
//!
//! Memory-ordering contract:
//! - [`timestamp`] orders loads around the counter read (`lfence` on both
//!   sides); [`timestamp_serializing`] additionally serializes the instruction
//!   stream with `cpuid`.
//! - [`flush`] is unordered with respect to surrounding accesses until a store
//!   fence ([`fence_store`] or [`fence_full`]) intervenes.

use std::arch::asm;
use std::arch::x86_64::{__cpuid, __rdtscp, _mm_lfence, _mm_mfence, _mm_sfence};

use crate::util::DRAMA_ROUNDS;

/// Number of repetitions of the timed inner loop in [`measure_conflict`]; the
/// minimum over these repetitions rejects interference from REF and preemption.
pub const CONFLICT_ITERS: usize = 10;

/// Reads the CPU cycle counter.
///
/// Loads issued before the call complete before the counter is read, and the
/// counter is read before any subsequent load executes.
#[inline(always)]
pub fn timestamp() -> u64 {
    unsafe {
        _mm_lfence();
        let mut aux = 0u32;
        let tsc = __rdtscp(&mut aux);
        _mm_lfence();
        tsc
    }
}

/// Reads the CPU cycle counter with full instruction-stream serialization.
///
/// Slower than [`timestamp`]; used where speculative execution across the
/// measurement boundary must be ruled out entirely.
#[inline(always)]
pub fn timestamp_serializing() -> u64 {
    unsafe {
        let _ = __cpuid(0);
        let mut aux = 0u32;
        let tsc = __rdtscp(&mut aux);
        _mm_lfence();
        tsc
    }
}

/// Evicts the cache line containing `addr` from all cache levels.
///
/// # Safety
///
/// `addr` must be a valid, mapped address.
#[inline(always)]
pub unsafe fn flush(addr: *const u8) {
    unsafe {
        asm!("clflushopt [{}]", in(reg) addr, options(nostack));
    }
}

/// Performs a single volatile read of `addr`.
///
/// # Safety
///
/// `addr` must be a valid, mapped address.
#[inline(always)]
pub unsafe fn access(addr: *const u8) {
    unsafe {
        std::ptr::read_volatile(addr);
    }
}

/// Full memory barrier (`mfence`).
#[inline(always)]
pub fn fence_full() {
    unsafe { _mm_mfence() }
}

/// Load barrier (`lfence`).
#[inline(always)]
pub fn fence_load() {
    unsafe { _mm_lfence() }
}

/// Store barrier (`sfence`).
#[inline(always)]
pub fn fence_store() {
    unsafe { _mm_sfence() }
}

/// Measures the average round-trip time of alternating uncached accesses to
/// `a1` and `a2`.
///
/// Runs [`CONFLICT_ITERS`] timed loops of [`DRAMA_ROUNDS`] flushed access
/// pairs each and returns the minimum per-round delta. Same-bank address
/// pairs conflict in the row buffer and show a clearly higher value than
/// pairs hitting different banks.
///
/// # Safety
///
/// Both addresses must be valid, mapped addresses.
pub unsafe fn measure_conflict(a1: *const u8, a2: *const u8) -> u64 {
    let mut min_delta = u64::MAX;
    for _ in 0..CONFLICT_ITERS {
        let before = timestamp();
        for _ in 0..DRAMA_ROUNDS {
            unsafe {
                access(a1);
                access(a2);
                flush(a1);
                flush(a2);
            }
            fence_full();
        }
        let after = timestamp();
        let delta = (after - before) / DRAMA_ROUNDS as u64;
        if delta < min_delta {
            min_delta = delta;
        }
    }
    min_delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_monotonic() {
        let a = timestamp();
        let b = timestamp();
        assert!(b >= a);
        let c = timestamp_serializing();
        let d = timestamp_serializing();
        assert!(d >= c);
    }

    #[test]
    fn measure_conflict_is_nonzero() {
        let buf = vec![0u8; 4096];
        let t = unsafe { measure_conflict(buf.as_ptr(), buf.as_ptr().wrapping_add(64)) };
        assert!(t > 0);
    }
}
