use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::matrices;

/// CPU microarchitectures with known DRAM address matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Microarchitecture {
    /// Intel Coffee Lake
    CoffeeLake,
    /// AMD Zen+ (Zen 1+)
    Zen1Plus,
    /// AMD Zen 2
    Zen2,
    /// AMD Zen 3
    Zen3,
    /// AMD Zen 4
    Zen4,
}

impl fmt::Display for Microarchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Microarchitecture::CoffeeLake => "coffeelake",
            Microarchitecture::Zen1Plus => "zen1plus",
            Microarchitecture::Zen2 => "zen2",
            Microarchitecture::Zen3 => "zen3",
            Microarchitecture::Zen4 => "zen4",
        };
        f.write_str(s)
    }
}

impl FromStr for Microarchitecture {
    type Err = DramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coffeelake" => Ok(Microarchitecture::CoffeeLake),
            "zen1plus" => Ok(Microarchitecture::Zen1Plus),
            "zen2" => Ok(Microarchitecture::Zen2),
            "zen3" => Ok(Microarchitecture::Zen3),
            "zen4" => Ok(Microarchitecture::Zen4),
            other => Err(DramError::UnknownMicroarchitecture(other.to_string())),
        }
    }
}

impl Microarchitecture {
    /// CPU model substrings the matrices of this microarchitecture were
    /// measured on. A CPU outside this list needs re-measured matrices.
    pub fn supported_cpu_models(&self) -> &'static [&'static str] {
        match self {
            Microarchitecture::CoffeeLake => &[
                "i5-8400", "i5-8500", "i5-8600", "i5-9400", "i5-9500", "i5-9600", "i7-8086",
                "i7-8700", "i7-9700", "i7-9900",
            ],
            Microarchitecture::Zen1Plus => &["Ryzen 5 2600X"],
            Microarchitecture::Zen2 => &["Ryzen 5 3600X", "Ryzen 5 3600"],
            Microarchitecture::Zen3 => &["Ryzen 5 5600G"],
            Microarchitecture::Zen4 => &["Ryzen 7 7700X"],
        }
    }
}

/// The DRAM device's logical-to-physical row relabeling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowMapping {
    /// Logical rows map to physical rows in order
    Sequential,
    /// Samsung-style row swizzling
    Samsung,
}

/// Errors related to DRAM configuration selection and validation.
#[derive(Debug, Error)]
pub enum DramError {
    /// Unknown microarchitecture identifier string
    #[error("unknown microarchitecture '{0}' (expected one of coffeelake, zen1plus, zen2, zen3, zen4)")]
    UnknownMicroarchitecture(String),
    /// No matrix pair exists for the requested tuple
    #[error(
        "no DRAM config for uarch={uarch}, ranks={ranks}, bank_groups={bank_groups}, banks={banks}, {row_mapping:?} row mapping"
    )]
    UnsupportedGeometry {
        /// requested microarchitecture
        uarch: Microarchitecture,
        /// requested rank count
        ranks: usize,
        /// requested bank group count
        bank_groups: usize,
        /// requested banks per group
        banks: usize,
        /// requested row mapping
        row_mapping: RowMapping,
    },
    /// The selected config failed its internal consistency checks
    #[error("invalid DRAM config: {0}")]
    ConfigMatrixInvalid(String),
    /// The installed CPU is not among the models the matrices were measured on
    #[error("CPU model '{model}' is not supported for {uarch}; re-measure the DRAM matrices")]
    UnsupportedCpu {
        /// detected model string
        model: String,
        /// requested microarchitecture
        uarch: Microarchitecture,
    },
}

/// Description of one memory controller + DIMM geometry.
///
/// Holds the two bit-linear matrices over GF(2) that translate between a
/// physical address and the linearized DRAM coordinate, plus the shift/mask
/// pairs that split the linearized form into (bank, row, column). All
/// "higher-order" address parts (rank, bank group, bank) are lumped together
/// as "bank".
///
/// Immutable after selection, except for [`sync_ref_threshold`] which is
/// installed by timing calibration.
///
/// [`sync_ref_threshold`]: DramConfig::sync_ref_threshold
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DramConfig {
    /// Microarchitecture these matrices were measured on
    pub uarch: Microarchitecture,
    /// Row relabeling the matrices assume
    pub row_mapping: RowMapping,
    /// Cycle threshold above which a timed sync access pair indicates a REF;
    /// starts at [`DramConfig::INITIAL_SYNC_REF_THRESHOLD`] and is replaced
    /// during calibration
    pub sync_ref_threshold: u64,
    /// Physical start address of the DRAM address space
    /// (`phys_addr - phys_dram_offset = dram_addr`); only affects bits above
    /// the matrix domain
    pub phys_dram_offset: usize,
    /// Shift of the bank field in the linearized DRAM coordinate
    pub bank_shift: usize,
    /// Mask of the bank field (applied after shifting)
    pub bank_mask: usize,
    /// Shift of the row field
    pub row_shift: usize,
    /// Mask of the row field
    pub row_mask: usize,
    /// Shift of the column field
    pub col_shift: usize,
    /// Mask of the column field
    pub col_mask: usize,
    /// Number of address bits the matrices cover
    pub matrix_size: usize,
    /// Maps physical address -> linearized DRAM coordinate; row `i` computes
    /// output bit `matrix_size - 1 - i` as the parity of `row & addr`
    pub dram_matrix: Vec<u64>,
    /// Inverse of `dram_matrix` over GF(2)
    pub addr_matrix: Vec<u64>,
}

impl DramConfig {
    /// Sync threshold used before calibration has run. Matches the absolute
    /// cycle cutoff hard-coded in early synchronized-hammering loops.
    pub const INITIAL_SYNC_REF_THRESHOLD: u64 = 1000;

    /// Selects the precompiled config for the given tuple and validates it.
    ///
    /// # Errors
    ///
    /// [`DramError::UnsupportedGeometry`] when no matrix pair exists for the
    /// tuple; [`DramError::ConfigMatrixInvalid`] when the selected pair fails
    /// validation (which indicates a broken table, not user error).
    pub fn select(
        uarch: Microarchitecture,
        ranks: usize,
        bank_groups: usize,
        banks: usize,
        row_mapping: RowMapping,
    ) -> Result<DramConfig, DramError> {
        info!(
            "selecting DRAM config: uarch={}, ranks={}, bank groups={}, banks={}, {:?} rows",
            uarch, ranks, bank_groups, banks, row_mapping
        );
        let config = matrices::lookup(uarch, ranks, bank_groups, banks, row_mapping).ok_or(
            DramError::UnsupportedGeometry {
                uarch,
                ranks,
                bank_groups,
                banks,
                row_mapping,
            },
        )?;
        config.validate()?;
        debug!(
            "selected config: {} bank bits, {} row bits, {} column bits, {} matrix bits",
            config.bank_bits(),
            config.row_bits(),
            config.column_bits(),
            config.matrix_size
        );
        Ok(config)
    }

    /// Size of the address space the matrices cover, in bytes.
    pub fn memory_size(&self) -> usize {
        1 << self.matrix_size
    }

    /// Number of bank bits (rank + bank group + bank).
    pub fn bank_bits(&self) -> usize {
        self.bank_mask.count_ones() as usize
    }

    /// Number of row bits inside the matrix domain.
    pub fn row_bits(&self) -> usize {
        self.row_mask.count_ones() as usize
    }

    /// Number of column bits.
    pub fn column_bits(&self) -> usize {
        self.col_mask.count_ones() as usize
    }

    /// Number of addressable banks.
    pub fn banks(&self) -> usize {
        1 << self.bank_bits()
    }

    /// Number of addressable rows inside the matrix domain.
    pub fn rows(&self) -> usize {
        1 << self.row_bits()
    }

    /// Number of addressable columns.
    pub fn columns(&self) -> usize {
        1 << self.column_bits()
    }

    /// Byte offset that moves an address by exactly one row, leaving bank and
    /// column untouched.
    ///
    /// This is the image of the least significant row bit under the inverse
    /// matrix. Matrix application is GF(2)-linear, so the offset combines by
    /// XOR; plain addition gives the same result whenever the involved
    /// address bits are clear (e.g. stepping from an even row).
    pub fn row_to_row_offset(&self) -> usize {
        self.apply_addr_matrix(1 << self.row_shift)
    }

    /// Applies the physical-address -> DRAM-coordinate matrix.
    pub fn apply_dram_matrix(&self, phys_addr: usize) -> usize {
        Self::apply_matrix(&self.dram_matrix, phys_addr)
    }

    /// Applies the DRAM-coordinate -> physical-address matrix.
    pub fn apply_addr_matrix(&self, linearized: usize) -> usize {
        Self::apply_matrix(&self.addr_matrix, linearized)
    }

    fn apply_matrix(matrix: &[u64], addr: usize) -> usize {
        let mut result = 0usize;
        for &row in matrix {
            result <<= 1;
            result |= ((row & addr as u64).count_ones() & 1) as usize;
        }
        result
    }

    /// Packs (bank, row, column) into the linearized DRAM coordinate.
    /// Components larger than the geometry wrap around.
    pub fn linearize(&self, bank: usize, row: usize, col: usize) -> usize {
        ((bank & self.bank_mask) << self.bank_shift)
            | ((row & self.row_mask) << self.row_shift)
            | ((col & self.col_mask) << self.col_shift)
    }

    /// Splits the linearized DRAM coordinate into (bank, row, column).
    pub fn delinearize(&self, linearized: usize) -> (usize, usize, usize) {
        (
            (linearized >> self.bank_shift) & self.bank_mask,
            (linearized >> self.row_shift) & self.row_mask,
            (linearized >> self.col_shift) & self.col_mask,
        )
    }

    /// Checks all structural invariants of this config.
    ///
    /// # Errors
    ///
    /// [`DramError::ConfigMatrixInvalid`] naming the violated invariant.
    pub fn validate(&self) -> Result<(), DramError> {
        let invalid = |msg: String| Err(DramError::ConfigMatrixInvalid(msg));

        let total_bits = self.bank_bits() + self.row_bits() + self.column_bits();
        if total_bits != self.matrix_size {
            return invalid(format!(
                "bank + row + column bits ({}) != matrix size ({})",
                total_bits, self.matrix_size
            ));
        }

        if self.dram_matrix.len() != self.matrix_size || self.addr_matrix.len() != self.matrix_size
        {
            return invalid(format!(
                "matrix row counts ({}, {}) != matrix size ({})",
                self.dram_matrix.len(),
                self.addr_matrix.len(),
                self.matrix_size
            ));
        }

        // the three masks must partition the low matrix_size bits: no overlap,
        // no gap
        let combined = (self.bank_mask << self.bank_shift)
            | (self.row_mask << self.row_shift)
            | (self.col_mask << self.col_shift);
        let required = (1usize << self.matrix_size) - 1;
        if combined != required {
            return invalid(format!(
                "masks do not partition the low {} bits: combined {:#b}",
                self.matrix_size, combined
            ));
        }

        if !self.phys_dram_offset.is_multiple_of(self.memory_size()) {
            return invalid(format!(
                "phys_dram_offset {:#x} is not aligned to the matrix domain ({:#x})",
                self.phys_dram_offset,
                self.memory_size()
            ));
        }

        if !self.matrix_product_is_identity() {
            return invalid("dram_matrix * addr_matrix != identity (mod 2)".to_string());
        }

        Ok(())
    }

    /// Verifies `dram_matrix * addr_matrix == I` over GF(2).
    fn matrix_product_is_identity(&self) -> bool {
        let n = self.matrix_size;
        for i in 0..n {
            // row i of the product: XOR of addr_matrix rows selected by the
            // set bits of dram_matrix row i (column-major bit order is
            // MSB-first)
            let mut acc = 0u64;
            for j in 0..n {
                if (self.dram_matrix[i] >> (n - j - 1)) & 1 == 1 {
                    acc ^= self.addr_matrix[j];
                }
            }
            if acc != 1u64 << (n - i - 1) {
                return false;
            }
        }
        true
    }
}

/// Reads the CPU model name from `/proc/cpuinfo` and checks it against the
/// supported model list of `uarch`.
///
/// # Errors
///
/// [`DramError::UnsupportedCpu`] when the model is absent from the list. The
/// caller may choose to continue anyway (matrices from a different CPU of the
/// same microarchitecture sometimes transfer), but the result is then
/// unvalidated.
pub fn check_cpu_model(uarch: Microarchitecture) -> Result<String, DramError> {
    let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").unwrap_or_default();
    let model = cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split(':').nth(1))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    info!("detected CPU model: {}", model);

    if uarch
        .supported_cpu_models()
        .iter()
        .any(|supported| model.contains(supported))
    {
        Ok(model)
    } else {
        Err(DramError::UnsupportedCpu { model, uarch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_supported_tuples() -> Vec<(Microarchitecture, usize, usize, usize, RowMapping)> {
        use Microarchitecture::*;
        use RowMapping::*;
        let mut tuples = vec![
            (CoffeeLake, 1, 4, 4, Sequential),
            (CoffeeLake, 2, 4, 4, Sequential),
        ];
        for rm in [Sequential, Samsung] {
            tuples.extend_from_slice(&[
                (Zen1Plus, 1, 4, 4, rm),
                (Zen1Plus, 2, 4, 4, rm),
                (Zen2, 1, 4, 4, rm),
                (Zen2, 2, 4, 4, rm),
                (Zen3, 1, 4, 4, rm),
                (Zen3, 2, 4, 4, rm),
                (Zen4, 1, 8, 4, rm),
                (Zen4, 1, 4, 4, rm),
                (Zen4, 2, 8, 4, rm),
            ]);
        }
        tuples
    }

    #[test]
    fn every_compiled_config_is_valid() {
        for (uarch, ranks, bgs, banks, rm) in all_supported_tuples() {
            let config = DramConfig::select(uarch, ranks, bgs, banks, rm)
                .unwrap_or_else(|e| panic!("{uarch} {ranks},{bgs},{banks} {rm:?}: {e}"));
            config.validate().expect("validation");
        }
    }

    #[test]
    fn matrix_roundtrip_within_domain() {
        for (uarch, ranks, bgs, banks, rm) in all_supported_tuples() {
            let config = DramConfig::select(uarch, ranks, bgs, banks, rm).unwrap();
            for addr in [0usize, 0xDEAD_BEE0, 0x1234_5678, (1 << config.matrix_size) - 1] {
                let addr = addr & (config.memory_size() - 1);
                let lin = config.apply_dram_matrix(addr);
                let back = config.apply_addr_matrix(lin);
                assert_eq!(addr, back, "{uarch} {rm:?} addr {addr:#x}");
            }
        }
    }

    #[test]
    fn unsupported_geometry_is_rejected() {
        let err = DramConfig::select(Microarchitecture::CoffeeLake, 4, 4, 4, RowMapping::Sequential)
            .unwrap_err();
        assert!(matches!(err, DramError::UnsupportedGeometry { .. }));

        // coffeelake has no Samsung mapping tables
        let err = DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Samsung)
            .unwrap_err();
        assert!(matches!(err, DramError::UnsupportedGeometry { .. }));
    }

    #[test]
    fn broken_matrix_fails_validation() {
        let mut config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        config.dram_matrix[0] ^= 1;
        assert!(matches!(
            config.validate(),
            Err(DramError::ConfigMatrixInvalid(_))
        ));
    }

    #[test]
    fn geometry_accessors() {
        let config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        assert_eq!(config.banks(), 16);
        assert_eq!(config.rows(), 8192);
        assert_eq!(config.memory_size(), 1 << 30);
        // one-row step must stay within the matrix domain and be nonzero
        let step = config.row_to_row_offset();
        assert!(step > 0 && step < config.memory_size());
    }

    #[test]
    fn uarch_string_roundtrip() {
        for s in ["coffeelake", "zen1plus", "zen2", "zen3", "zen4"] {
            let uarch: Microarchitecture = s.parse().unwrap();
            assert_eq!(uarch.to_string(), s);
        }
        assert!("skylake".parse::<Microarchitecture>().is_err());
    }
}
