//! Custom DRAM configurations from measured bit functions.
//!
//! Platforms without a precompiled matrix pair can supply the bank/row/column
//! functions measured with a DRAMA-style tool as a JSON file. The DRAM matrix
//! is assembled from the bit definitions and its inverse is derived
//! numerically, then both pass the same validation as the precompiled pairs.

use nalgebra::DMatrix;
use serde::Deserialize;
use std::path::Path;

use super::config::{DramConfig, DramError, Microarchitecture, RowMapping};

/// Physical address bits feeding one DRAM address function.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum BitDef {
    /// Single bit function
    Single(u64),
    /// XOR of multiple bits
    Multi(Vec<u64>),
}

impl BitDef {
    /// Converts the bit definition to a bitmask.
    pub fn to_mask(&self) -> u64 {
        match self {
            BitDef::Single(bit) => 1 << bit,
            BitDef::Multi(bits) => bits.iter().fold(0, |acc, bit| acc | (1 << bit)),
        }
    }
}

/// JSON shape of a custom DRAM function definition file.
#[derive(Debug, Deserialize)]
pub struct CustomConfigFile {
    /// Microarchitecture the functions were measured on
    pub uarch: Microarchitecture,
    /// Bank-conflict timing threshold measured together with the functions
    pub threshold: u64,
    /// Physical address bits used for DRAM row selection
    pub row_bits: Vec<BitDef>,
    /// Physical address bits used for DRAM column selection
    pub col_bits: Vec<BitDef>,
    /// Physical address bits used for DRAM bank selection
    pub bank_bits: Vec<BitDef>,
}

impl CustomConfigFile {
    /// Loads a custom config definition from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<CustomConfigFile, std::io::Error> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(std::io::Error::other)
    }

    /// Builds a validated [`DramConfig`] from these bit definitions.
    ///
    /// # Errors
    ///
    /// [`DramError::ConfigMatrixInvalid`] when the functions are not
    /// invertible over GF(2).
    pub fn to_config(&self) -> Result<DramConfig, DramError> {
        from_bitdefs(
            self.uarch,
            &self.bank_bits,
            &self.row_bits,
            &self.col_bits,
        )
    }
}

/// Assembles a [`DramConfig`] from bank/row/column bit definitions.
///
/// Field order in the linearized coordinate is bank (most significant),
/// column, row; the address matrix is obtained by inverting the DRAM matrix.
///
/// # Errors
///
/// [`DramError::ConfigMatrixInvalid`] when the combined function matrix is
/// singular or its inverse is not a 0/1 matrix (i.e. the functions are not
/// GF(2)-invertible via real arithmetic).
pub fn from_bitdefs(
    uarch: Microarchitecture,
    bank_bits: &[BitDef],
    row_bits: &[BitDef],
    col_bits: &[BitDef],
) -> Result<DramConfig, DramError> {
    let n = bank_bits.len() + row_bits.len() + col_bits.len();

    let mut dram_matrix: Vec<u64> = Vec::with_capacity(n);
    for def in bank_bits.iter().chain(col_bits).chain(row_bits) {
        dram_matrix.push(def.to_mask());
    }

    // dense 0/1 matrix with the first function in the top row and matrix
    // column 0 at the most significant bit, same layout as the precompiled
    // tables
    let dense = DMatrix::<f64>::from_fn(n, n, |row, col| {
        ((dram_matrix[row] >> (n - col - 1)) & 1) as f64
    });

    let inverse = dense.try_inverse().ok_or_else(|| {
        DramError::ConfigMatrixInvalid("bit functions are not invertible".to_string())
    })?;

    let mut addr_matrix: Vec<u64> = vec![0; n];
    for row in 0..n {
        for col in 0..n {
            let element = inverse[(row, col)].abs().round();
            if element != 0.0 && element != 1.0 {
                return Err(DramError::ConfigMatrixInvalid(format!(
                    "inverse element ({row},{col}) is {element}, expected 0 or 1"
                )));
            }
            addr_matrix[row] |= (element as u64) << (n - col - 1);
        }
    }

    let config = DramConfig {
        uarch,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 0,
        bank_shift: n - bank_bits.len(),
        bank_mask: (1 << bank_bits.len()) - 1,
        col_shift: row_bits.len(),
        col_mask: (1 << col_bits.len()) - 1,
        row_shift: 0,
        row_mask: (1 << row_bits.len()) - 1,
        matrix_size: n,
        dram_matrix,
        addr_matrix,
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitdef_masks() {
        assert_eq!(BitDef::Single(6).to_mask(), 0x40);
        assert_eq!(BitDef::Multi(vec![6, 13]).to_mask(), 0x2040);
    }

    #[test]
    fn coffeelake_functions_rebuild_a_valid_config() {
        // the Coffee Lake single-rank functions, expressed as bit definitions
        let bank_bits = vec![
            BitDef::Multi(vec![6, 13]),
            BitDef::Multi(vec![14, 17]),
            BitDef::Multi(vec![15, 18]),
            BitDef::Multi(vec![16, 19]),
        ];
        let col_bits: Vec<BitDef> = [13, 12, 11, 10, 9, 8, 7, 5, 4, 3, 2, 1, 0]
            .iter()
            .map(|&b| BitDef::Single(b))
            .collect();
        let row_bits: Vec<BitDef> = (17u64..30).rev().map(BitDef::Single).collect();

        let config =
            from_bitdefs(Microarchitecture::CoffeeLake, &bank_bits, &row_bits, &col_bits).unwrap();
        assert_eq!(config.matrix_size, 30);
        assert_eq!(config.banks(), 16);
        config.validate().unwrap();

        // translation through the derived matrices must round-trip
        for addr in [0usize, 0x1234_5678, 0x3FFF_FFFF] {
            let lin = config.apply_dram_matrix(addr);
            assert_eq!(config.apply_addr_matrix(lin), addr);
        }
    }

    #[test]
    fn singular_functions_are_rejected() {
        // two identical bank functions cannot be inverted
        let bank_bits = vec![BitDef::Single(6), BitDef::Single(6)];
        let row_bits = vec![BitDef::Single(8)];
        let col_bits = vec![BitDef::Single(0)];
        assert!(matches!(
            from_bitdefs(Microarchitecture::Zen3, &bank_bits, &row_bits, &col_bits),
            Err(DramError::ConfigMatrixInvalid(_))
        ));
    }
}
