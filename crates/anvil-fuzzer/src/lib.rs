//! # Anvil Fuzzer
//!
//! `anvil-fuzzer` is the pattern fuzzing engine of the Anvil DRAM
//! fault-injection fuzzer. On top of the address model and timing analysis of
//! [`anvil_core`], it provides:
//!
//! - [`params`] / [`pattern`] / [`builder`] - randomized generation of
//!   frequency-domain hammering patterns: abstract access schedules whose
//!   components repeat at power-of-two multiples of a base period aligned to
//!   the DRAM refresh interval.
//! - [`mapper`] - binding the abstract aggressor ids to concrete DRAM rows
//!   under spatial constraints, victim derivation, and export of the flat
//!   access sequence with configurable fence scheduling.
//! - [`jitter`] / [`hammer`] - two implementations of the synchronized
//!   hammering contract: a JIT emitter assembling an unrolled access loop,
//!   and a software interpreter.
//! - [`scanner`] - bit-flip detection over a mapping's victim rows.
//! - [`forges`] - the fuzzing orchestrator (generate → map → hammer → scan,
//!   with reproducibility scoring and sweeping) and the replay engine for
//!   archived patterns.
//! - [`archive`] - the append-only JSON result archive.
//!
//! # References
//!
//! The pattern model follows Jattke et al., "Blacksmith: Scalable
//! Rowhammering in the Frequency Domain", IEEE S&P 2022.

#![warn(missing_docs)]

pub mod archive;
pub mod builder;
pub mod forges;
pub mod hammer;
pub mod jitter;
pub mod mapper;
pub mod params;
pub mod pattern;
pub mod scanner;

pub use crate::builder::{BuildError, PatternBuilder};
pub use crate::forges::{EmitterKind, ForgeConfig, ForgeContext, ForgeError};
pub use crate::hammer::{
    FenceType, FencingStrategy, FlushingStrategy, HammerError, HammeringData, InterpHammerer,
    SyncConfig,
};
pub use crate::jitter::{CodeJitter, JitError};
pub use crate::mapper::{PatternAddressMapping, PatternStep, SchedulingPolicy};
pub use crate::params::FuzzingParameterSet;
pub use crate::pattern::{Aggressor, AggressorAccessPattern, HammeringPattern};
