use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::config::DramConfig;

/// DRAM coordinate of a memory cell: (bank, row, column) plus the id of the
/// memory mapping it is relative to.
///
/// All components may overflow their geometry; they are interpreted modulo the
/// respective count (e.g. with 16 banks, `bank = 18` means bank 2). This lets
/// callers do unbounded `row += k` arithmetic and normalize late.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DramAddr {
    /// Bank index (rank, bank group and bank lumped together)
    pub bank: usize,
    /// Row index
    pub row: usize,
    /// Column index
    pub col: usize,
    /// Which registered memory mapping this coordinate refers to
    pub mapping_id: usize,
}

impl Display for DramAddr {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(
            fmt,
            "({},{},{})@{}",
            self.bank, self.row, self.col, self.mapping_id
        )
    }
}

impl DramAddr {
    /// Creates a coordinate in mapping 0.
    pub fn new(bank: usize, row: usize, col: usize) -> Self {
        DramAddr {
            bank,
            row,
            col,
            mapping_id: 0,
        }
    }

    /// Creates a coordinate in the given mapping.
    pub fn with_mapping(bank: usize, row: usize, col: usize, mapping_id: usize) -> Self {
        DramAddr {
            bank,
            row,
            col,
            mapping_id,
        }
    }

    /// Bank index normalized to the geometry.
    pub fn actual_bank(&self, config: &DramConfig) -> usize {
        self.bank % config.banks()
    }

    /// Row index normalized to the geometry.
    pub fn actual_row(&self, config: &DramConfig) -> usize {
        self.row % config.rows()
    }

    /// Column index normalized to the geometry.
    pub fn actual_col(&self, config: &DramConfig) -> usize {
        self.col % config.columns()
    }

    /// Returns this coordinate displaced by the given component increments.
    pub fn add(&self, bank: usize, row: usize, col: usize) -> DramAddr {
        DramAddr {
            bank: self.bank.wrapping_add(bank),
            row: self.row.wrapping_add(row),
            col: self.col.wrapping_add(col),
            mapping_id: self.mapping_id,
        }
    }

    /// Displaces this coordinate in place.
    pub fn add_inplace(&mut self, bank: usize, row: usize, col: usize) {
        self.bank = self.bank.wrapping_add(bank);
        self.row = self.row.wrapping_add(row);
        self.col = self.col.wrapping_add(col);
    }

    /// Returns this coordinate moved by a signed number of rows.
    pub fn shift_row(&self, delta: isize) -> DramAddr {
        DramAddr {
            row: self.row.wrapping_add_signed(delta),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dram::config::{Microarchitecture, RowMapping};

    #[test]
    fn components_wrap_modulo_geometry() {
        let config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        let addr = DramAddr::new(18, 8192 + 5, 0);
        assert_eq!(addr.actual_bank(&config), 2);
        assert_eq!(addr.actual_row(&config), 5);
    }

    #[test]
    fn shift_row_roundtrip() {
        let addr = DramAddr::new(3, 100, 0);
        assert_eq!(addr.shift_row(7).shift_row(-7), addr);
    }
}
