//! # Anvil Core
//!
//! `anvil-core` is the foundational library of the Anvil DRAM fault-injection
//! fuzzer. It contains everything below the pattern level:
//!
//! - [`timing`] - cycle-accurate timestamps, cache-line flushes and fences
//!   with an explicit memory-ordering contract.
//! - [`memory`] - the physically contiguous [`memory::MemoryRegion`] all
//!   hammering runs on, its reproducible pseudorandom fill, and bit-flip
//!   detection over arbitrary ranges.
//! - [`dram`] - the DRAM address model: bit-linear matrices over GF(2)
//!   translating between virtual addresses and (bank, row, column)
//!   coordinates, with precompiled matrix pairs per microarchitecture.
//! - [`analyzer`] - timing-based discovery of bank-conflict sets, the
//!   activations-per-REFRESH budget and the REF detection threshold.
//!
//! ## Platform support
//!
//! x86_64 Linux only. A working setup needs 1 GB hugepages (hugetlbfs) for
//! physically contiguous allocations and benefits from CAP_SYS_NICE for
//! low-noise timing.

#![warn(missing_docs)]

pub mod analyzer;
pub mod dram;
pub mod memory;
pub mod timing;
pub mod util;

pub use crate::analyzer::{AnalyzerError, DramAnalyzer};
pub use crate::dram::{AddressModel, DramAddr, DramConfig, DramError, Microarchitecture, RowMapping};
pub use crate::memory::{BitFlip, DataPattern, MemoryRegion};
