//! Bit-flip scanning over a mapping's victim rows.
//!
//! After a hammering run, only the rows around the mapping's aggressors can
//! have flipped; the scanner regenerates the reproducible fill for exactly
//! those rows and compares. Detected corruptions are repaired in place by the
//! region, so repeated scans of an unchanged region report identical results.

use itertools::Itertools;
use log::{debug, info};

use crate::mapper::{FlipRecord, PatternAddressMapping};
use anvil_core::dram::AddressModel;
use anvil_core::memory::{DataPattern, MemoryRegion};
use anvil_core::util::ROW_SIZE;

/// Scans all victim rows of `mapping` for bit flips.
///
/// Every corrupted byte is logged; unless `reproducibility_mode` is set, it
/// is also recorded in `mapping.bit_flips` for the archive. (Reproducibility
/// runs re-trigger the same cells over and over; recording them would bloat
/// the archive with duplicates.)
///
/// Returns the total number of corrupted bits.
pub fn check(
    region: &MemoryRegion,
    model: &AddressModel,
    mapping_id: usize,
    mapping: &mut PatternAddressMapping,
    pattern: DataPattern,
    reproducibility_mode: bool,
) -> usize {
    let victim_rows = mapping.victim_rows().to_vec();
    debug!(
        "checking {} victim rows of mapping {}",
        victim_rows.len(),
        mapping.id
    );

    let mut corrupted_bits = 0usize;
    let mut flipped_rows: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();
    for row in &victim_rows {
        let row_start = model.to_virt(row);
        let Some(start_off) = region.offset_of(row_start) else {
            // shifted mappings can push victims out of the region
            continue;
        };
        // one row's worth of memory from the row start; bytes of interleaved
        // banks inside the window get checked too, which is harmless
        let end_off = (start_off + ROW_SIZE).min(region.len());

        let result = region.check_range(start_off, end_off, pattern, &mut |flip| {
            let dram_addr = model.from_virt(flip.addr as *const u8, mapping_id);
            info!(
                "bit flip at {:p} ({}), bitmask {:#04x}, data {:#04x}",
                flip.addr as *const u8, dram_addr, flip.bitmask, flip.data
            );
            flipped_rows.insert(dram_addr.row);
            if !reproducibility_mode {
                mapping.bit_flips.push(FlipRecord {
                    dram_addr,
                    bitmask: flip.bitmask,
                    data: flip.data,
                });
            }
        });
        match result {
            Ok(bits) => corrupted_bits += bits,
            Err(e) => {
                debug!("skipping victim row {}: {}", row, e);
            }
        }
    }

    if corrupted_bits > 0 {
        info!(
            "found {} corrupted bits over the victim rows of mapping {} (rows: {})",
            corrupted_bits,
            mapping.id,
            flipped_rows.iter().map(|r| r.to_string()).join(",")
        );
    }
    corrupted_bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Aggressor;
    use anvil_core::dram::{AddressModel, DramAddr, DramConfig, Microarchitecture, RowMapping};
    use anvil_core::util::{PAGE_SIZE, RunRng};

    /// A coffeelake model over a small superpage-aligned test buffer: the
    /// base alignment guarantees that low rows/banks translate to addresses
    /// inside the buffer.
    fn aligned_region_and_model(len: usize) -> (MemoryRegion, AddressModel) {
        let config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        let align = config.memory_size();
        let region = MemoryRegion::anon_aligned_for_test(len, align);
        let mut model = AddressModel::new(config);
        model.initialize_mapping(0, region.ptr());
        (region, model)
    }

    fn mapping_with_victim(victim: DramAddr, rng: &mut RunRng) -> PatternAddressMapping {
        // an aggressor one row above the victim makes the victim row scanned
        let mut mapping = PatternAddressMapping::new(rng);
        mapping.bank_no = victim.bank;
        mapping
            .aggressor_to_addr
            .insert(Aggressor(1), DramAddr::new(victim.bank, victim.row + 1, 0));
        mapping.determine_victims(&[crate::pattern::AggressorAccessPattern {
            frequency: 1,
            amplitude: 1,
            start_offset: 0,
            aggressors: vec![Aggressor(1)],
        }]);
        mapping
    }

    #[test]
    fn scan_detects_injected_flip_and_is_idempotent() {
        // 1 GiB is unrealistic in a unit test; a superpage-aligned 4 MiB
        // buffer covers the low rows/banks of the coffeelake mapping
        let mut rng = RunRng::seeded(1);
        let (region, model) = aligned_region_and_model(4 << 20);
        region.initialize(DataPattern::Random);

        let victim = DramAddr::new(0, 2, 0);
        let mut mapping = mapping_with_victim(victim, &mut rng);
        assert!(mapping.victim_rows().iter().any(|r| r.row == victim.row));

        // clean region: no flips
        let bits = check(&region, &model, 0, &mut mapping, DataPattern::Random, false);
        assert_eq!(bits, 0);
        assert!(mapping.bit_flips.is_empty());

        // corrupt one byte in the victim row
        let victim_ptr = model.to_virt(&victim);
        let offset = region.offset_of(victim_ptr).unwrap() + 17;
        let original = unsafe { *region.addr(offset) };
        unsafe { *region.addr(offset) = original ^ 0b100 };

        let bits = check(&region, &model, 0, &mut mapping, DataPattern::Random, false);
        assert_eq!(bits, 1);
        assert_eq!(mapping.bit_flips.len(), 1);
        let record = mapping.bit_flips[0];
        assert_eq!(record.bitmask, 0b100);
        assert_eq!(record.data, original ^ 0b100);
        assert_eq!(record.dram_addr.row, victim.row);

        // the scan repaired the byte: a second scan is clean and the region
        // is byte-identical to the fill
        let bits = check(&region, &model, 0, &mut mapping, DataPattern::Random, true);
        assert_eq!(bits, 0);
        assert_eq!(unsafe { *region.addr(offset) }, original);
    }

    #[test]
    fn reproducibility_mode_does_not_record() {
        let mut rng = RunRng::seeded(2);
        let (region, model) = aligned_region_and_model(4 << 20);
        region.initialize(DataPattern::Random);

        let victim = DramAddr::new(0, 2, 0);
        let mut mapping = mapping_with_victim(victim, &mut rng);

        let victim_ptr = model.to_virt(&victim);
        let offset = region.offset_of(victim_ptr).unwrap();
        unsafe { *region.addr(offset) ^= 0xFF };

        let bits = check(&region, &model, 0, &mut mapping, DataPattern::Random, true);
        assert_eq!(bits, 8);
        assert!(mapping.bit_flips.is_empty());
    }

    #[test]
    fn victims_outside_the_region_are_skipped() {
        let mut rng = RunRng::seeded(3);
        let (region, model) = aligned_region_and_model(PAGE_SIZE * 4);
        region.initialize(DataPattern::Random);

        // rows far beyond a 16 KiB buffer
        let mut mapping = mapping_with_victim(DramAddr::new(3, 4000, 0), &mut rng);
        let bits = check(&region, &model, 0, &mut mapping, DataPattern::Random, false);
        assert_eq!(bits, 0);
    }
}
