//! # Anvil
//!
//! Anvil is a DRAM fault-injection (Rowhammer) fuzzer for hardware-security
//! research on DDR3/DDR4/DDR5 systems. It discovers the DRAM topology of the
//! machine it runs on by timing, synthesizes frequency-domain hammering
//! patterns, executes them synchronized to the memory controller's REFRESH
//! interval, and records every induced bit flip.
//!
//! This crate re-exports the two workspace libraries:
//!
//! - [`anvil_core`] - timing primitives, memory regions, the DRAM address
//!   model and the topology analyzer.
//! - [`anvil_fuzzer`] (feature `fuzzer`, default) - the pattern builder,
//!   address mapper, synchronized code emitter and fuzzing forges.
//!
//! The `anvil` binary in this workspace wires both into the full
//! calibrate→fuzz→archive pipeline.

pub use anvil_core;

#[cfg(feature = "fuzzer")]
pub use anvil_fuzzer;
