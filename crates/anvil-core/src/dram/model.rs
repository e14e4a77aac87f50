use std::collections::HashMap;

use log::debug;

use super::addr::DramAddr;
use super::config::DramConfig;

/// Address model for one process: the selected [`DramConfig`] plus the
/// per-mapping state needed to translate between virtual addresses and DRAM
/// coordinates.
///
/// A *mapping* is one contiguous memory region (e.g. the hammering superpage,
/// or the separate REF-sync superpage). The model records, per mapping id, the
/// virtual-address bits above the matrix domain so translations round-trip,
/// and bank-translation tables between mappings (the same physical bank
/// generally has different indices in two different regions).
///
/// Created once at startup and passed by reference into every component that
/// translates addresses; only the calibrated sync threshold mutates after
/// construction.
pub struct AddressModel {
    config: DramConfig,
    /// mapping id -> virtual-address bits above the matrix domain
    base_msbs: HashMap<usize, usize>,
    /// (from mapping, to mapping) -> per-bank translation vector
    bank_translations: HashMap<(usize, usize), Vec<usize>>,
}

impl AddressModel {
    /// Wraps a selected config into an empty model.
    pub fn new(config: DramConfig) -> Self {
        AddressModel {
            config,
            base_msbs: HashMap::new(),
            bank_translations: HashMap::new(),
        }
    }

    /// The installed DRAM configuration.
    pub fn config(&self) -> &DramConfig {
        &self.config
    }

    /// Installs the calibrated REF detection threshold (cycles).
    pub fn set_sync_ref_threshold(&mut self, threshold: u64) {
        debug!("installing sync REF threshold: {} cycles", threshold);
        self.config.sync_ref_threshold = threshold;
    }

    /// Registers a memory region under `mapping_id`, recording the bits of
    /// `base` above the matrix domain.
    pub fn initialize_mapping(&mut self, mapping_id: usize, base: *const u8) {
        let msb = (base as usize) & !(self.config.memory_size() - 1);
        debug!("mapping {}: base msb {:#x}", mapping_id, msb);
        self.base_msbs.insert(mapping_id, msb);
    }

    /// Installs the bank translation vector from `from_id`'s banks to
    /// `to_id`'s banks (`vector[from_bank] = to_bank`).
    pub fn initialize_bank_translation(
        &mut self,
        from_id: usize,
        to_id: usize,
        translation: Vec<usize>,
    ) {
        assert_eq!(
            translation.len(),
            self.config.banks(),
            "bank translation must cover every bank"
        );
        self.bank_translations
            .insert((from_id, to_id), translation);
    }

    /// Maps a bank index of mapping `from_id` to the corresponding bank index
    /// of mapping `to_id`. Identity when the ids are equal.
    pub fn translate_bank(&self, from_id: usize, to_id: usize, bank: usize) -> usize {
        if from_id == to_id {
            return bank % self.config.banks();
        }
        let table = self
            .bank_translations
            .get(&(from_id, to_id))
            .unwrap_or_else(|| {
                panic!("no bank translation installed for {} -> {}", from_id, to_id)
            });
        table[bank % self.config.banks()]
    }

    /// Decodes a virtual address inside the region of `mapping_id` into its
    /// DRAM coordinate. Cost is one parity fold per matrix row.
    pub fn from_virt(&self, vaddr: *const u8, mapping_id: usize) -> DramAddr {
        let low = (vaddr as usize) & (self.config.memory_size() - 1);
        let linearized = self.config.apply_dram_matrix(low);
        let (bank, row, col) = self.config.delinearize(linearized);
        DramAddr {
            bank,
            row,
            col,
            mapping_id,
        }
    }

    /// Encodes a DRAM coordinate back into a virtual address inside its
    /// mapping's region.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate's mapping was never registered with
    /// [`initialize_mapping`](Self::initialize_mapping).
    pub fn to_virt(&self, addr: &DramAddr) -> *const u8 {
        let base = *self
            .base_msbs
            .get(&addr.mapping_id)
            .unwrap_or_else(|| panic!("mapping {} not initialized", addr.mapping_id));
        let linearized = self.config.linearize(addr.bank, addr.row, addr.col);
        let low = self.config.apply_addr_matrix(linearized);
        (base | low) as *const u8
    }

    /// Bytes added to a virtual address to move by exactly one row.
    pub fn row_to_row_offset(&self) -> usize {
        self.config.row_to_row_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dram::config::{Microarchitecture, RowMapping};

    const REGION_BASE: usize = 0x2000000000;

    fn coffeelake_model() -> AddressModel {
        let config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        let mut model = AddressModel::new(config);
        model.initialize_mapping(0, REGION_BASE as *const u8);
        model
    }

    #[test]
    fn virt_roundtrip() {
        let model = coffeelake_model();
        for offset in [0usize, 0xDEAD_BEE0, 0x3FFF_FFC0, 0x1234_5678] {
            let vaddr = REGION_BASE | (offset & (model.config().memory_size() - 1));
            let dram = model.from_virt(vaddr as *const u8, 0);
            let back = model.to_virt(&dram);
            assert_eq!(back as usize, vaddr, "round trip for {vaddr:#x}");
        }
    }

    #[test]
    fn virt_roundtrip_spec_vector() {
        // the canonical end-to-end vector: a fixed address inside a superpage
        // mapped in the 0x2000_0DEAD_BEE0 window
        let vaddr = 0x2000_0DEA_DBEE0usize;
        let config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        let base = vaddr & !(config.memory_size() - 1);
        let mut model = AddressModel::new(config);
        model.initialize_mapping(0, base as *const u8);
        let dram = model.from_virt(vaddr as *const u8, 0);
        assert_eq!(model.to_virt(&dram) as usize, vaddr);
    }

    #[test]
    fn row_offset_moves_one_row() {
        let model = coffeelake_model();
        let base = REGION_BASE as *const u8;
        let a = model.from_virt(base, 0);
        let b = model.from_virt((base as usize + model.row_to_row_offset()) as *const u8, 0);
        assert_eq!(b.bank, a.bank);
        assert_eq!(b.col, a.col);
        assert_eq!(b.row, a.row + 1);
    }

    #[test]
    fn overflowing_components_normalize() {
        let model = coffeelake_model();
        let banks = model.config().banks();
        let a = DramAddr::new(3, 17, 0);
        let b = DramAddr::new(3 + banks, 17 + model.config().rows(), 0);
        assert_eq!(model.to_virt(&a), model.to_virt(&b));
    }

    #[test]
    fn bank_translation_identity_and_table() {
        let mut model = coffeelake_model();
        model.initialize_mapping(1, 0x4000000000usize as *const u8);
        let banks = model.config().banks();
        assert_eq!(model.translate_bank(0, 0, 5), 5);

        let table: Vec<usize> = (0..banks).map(|b| (b + 1) % banks).collect();
        model.initialize_bank_translation(0, 1, table);
        assert_eq!(model.translate_bank(0, 1, 0), 1);
        assert_eq!(model.translate_bank(0, 1, banks - 1), 0);
    }
}
