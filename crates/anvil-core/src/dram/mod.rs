//! The DRAM address model.
//!
//! Translates between virtual/physical addresses and DRAM coordinates
//! (bank, row, column) through bit-linear matrices over GF(2):
//!
//! - [`DramConfig`] - one memory controller + geometry: shifts, masks and the
//!   matrix pair; precompiled tables live in the `matrices` module.
//! - [`DramAddr`] - a (bank, row, column) coordinate, wrapping modulo the
//!   geometry.
//! - [`AddressModel`] - process-wide translation state: registered memory
//!   mappings and bank-translation tables between them.
//! - [`BitDef`] / [`CustomConfigFile`] - custom configs from measured bit
//!   functions, inverted numerically.

mod addr;
mod bitdefs;
mod config;
mod matrices;
mod model;

pub use self::addr::DramAddr;
pub use self::bitdefs::{BitDef, CustomConfigFile, from_bitdefs};
pub use self::config::{DramConfig, DramError, Microarchitecture, RowMapping, check_cpu_model};
pub use self::model::AddressModel;
