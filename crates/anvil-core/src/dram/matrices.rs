//! Precompiled DRAM address matrix pairs, one per supported (microarchitecture,
//! geometry, row mapping) tuple. Each pair was reverse-engineered with timing
//! side channels on the named platform; `dram` maps a physical address into the
//! linearized DRAM coordinate and `addr` is its inverse over GF(2).

use super::config::{DramConfig, Microarchitecture, RowMapping};

/// Looks up the precompiled config for the given tuple.
pub(super) fn lookup(
    uarch: Microarchitecture,
    ranks: usize,
    bank_groups: usize,
    banks: usize,
    row_mapping: RowMapping,
) -> Option<DramConfig> {
    use Microarchitecture::*;
    use RowMapping::*;
    match (uarch, ranks, bank_groups, banks, row_mapping) {
        (CoffeeLake, 1, 4, 4, Sequential) => Some(coffee_lake_1rk_4bg_4bk()),
        (CoffeeLake, 2, 4, 4, Sequential) => Some(coffee_lake_2rk_4bg_4bk()),
        (Zen1Plus, 2, 4, 4, Sequential) => Some(zen1plus_2rk_4bg_4bk()),
        (Zen1Plus, 2, 4, 4, Samsung) => Some(zen1plus_2rk_4bg_4bk_samsung()),
        (Zen1Plus, 1, 4, 4, Sequential) => Some(zen1plus_1rk_4bg_4bk()),
        (Zen1Plus, 1, 4, 4, Samsung) => Some(zen1plus_1rk_4bg_4bk_samsung()),
        (Zen2, 2, 4, 4, Sequential) => Some(zen2_2rk_4bg_4bk()),
        (Zen2, 2, 4, 4, Samsung) => Some(zen2_2rk_4bg_4bk_samsung()),
        (Zen2, 1, 4, 4, Sequential) => Some(zen2_1rk_4bg_4bk()),
        (Zen2, 1, 4, 4, Samsung) => Some(zen2_1rk_4bg_4bk_samsung()),
        (Zen3, 2, 4, 4, Sequential) => Some(zen3_2rk_4bg_4bk()),
        (Zen3, 2, 4, 4, Samsung) => Some(zen3_2rk_4bg_4bk_samsung()),
        (Zen3, 1, 4, 4, Sequential) => Some(zen3_1rk_4bg_4bk()),
        (Zen3, 1, 4, 4, Samsung) => Some(zen3_1rk_4bg_4bk_samsung()),
        (Zen4, 1, 8, 4, Sequential) => Some(zen4_1rk_8bg_4bk()),
        (Zen4, 1, 8, 4, Samsung) => Some(zen4_1rk_8bg_4bk_samsung()),
        (Zen4, 1, 4, 4, Sequential) => Some(zen4_1rk_4bg_4bk()),
        (Zen4, 1, 4, 4, Samsung) => Some(zen4_1rk_4bg_4bk_samsung()),
        (Zen4, 2, 8, 4, Sequential) => Some(zen4_2rk_8bg_4bk()),
        (Zen4, 2, 8, 4, Samsung) => Some(zen4_2rk_8bg_4bk_samsung()),
        _ => None,
    }
}

/// Coffee Lake, 1 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn coffee_lake_1rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::CoffeeLake,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 0,
        bank_shift: 26,
        bank_mask: 0b1111,
        row_shift: 0,
        row_mask: 0b1111111111111,
        col_shift: 13,
        col_mask: 0b1111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b000000000000000010000001000000, // 0x02040 bank b3 = addr b6 + b13
            0b000000000000100100000000000000, // 0x24000 bank b2 = addr b14 + b17
            0b000000000001001000000000000000, // 0x48000 bank b1 = addr b15 + b18
            0b000000000010010000000000000000, // 0x90000 bank b0 = addr b16 + b19
            0b000000000000000010000000000000, // col b12 = addr b13
            0b000000000000000001000000000000, // col b11 = addr b12
            0b000000000000000000100000000000, // col b10 = addr b11
            0b000000000000000000010000000000, // col b9 = addr b10
            0b000000000000000000001000000000, // col b8 = addr b9
            0b000000000000000000000100000000, // col b7 = addr b8
            0b000000000000000000000010000000, // col b6 = addr b7
            0b000000000000000000000000100000, // col b5 = addr b5
            0b000000000000000000000000010000, // col b4 = addr b4
            0b000000000000000000000000001000, // col b3 = addr b3
            0b000000000000000000000000000100, // col b2 = addr b2
            0b000000000000000000000000000010, // col b1 = addr b1
            0b000000000000000000000000000001, // col b0 = addr b0
            0b100000000000000000000000000000, // row b12 = addr b29
            0b010000000000000000000000000000, // row b11 = addr b28
            0b001000000000000000000000000000, // row b10 = addr b27
            0b000100000000000000000000000000, // row b9 = addr b26
            0b000010000000000000000000000000, // row b8 = addr b25
            0b000001000000000000000000000000, // row b7 = addr b24
            0b000000100000000000000000000000, // row b6 = addr b23
            0b000000010000000000000000000000, // row b5 = addr b22
            0b000000001000000000000000000000, // row b4 = addr b21
            0b000000000100000000000000000000, // row b3 = addr b20
            0b000000000010000000000000000000, // row b2 = addr b19
            0b000000000001000000000000000000, // row b1 = addr b18
            0b000000000000100000000000000000, // row b0 = addr b17
        ],
        addr_matrix: vec![
            0b000000000000000001000000000000, // addr b29 = row b12
            0b000000000000000000100000000000, // addr b28 = row b11
            0b000000000000000000010000000000, // addr b27 = row b10
            0b000000000000000000001000000000, // addr b26 = row b9
            0b000000000000000000000100000000, // addr b25 = row b8
            0b000000000000000000000010000000, // addr b24 = row b7
            0b000000000000000000000001000000, // addr b23 = row b6
            0b000000000000000000000000100000, // addr b22 = row b5
            0b000000000000000000000000010000, // addr b21 = row b4
            0b000000000000000000000000001000, // addr b20 = row b3
            0b000000000000000000000000000100, // addr b19 = row b2
            0b000000000000000000000000000010, // addr b18 = row b1
            0b000000000000000000000000000001, // addr b17 = row b0
            0b000100000000000000000000000100, // addr b16 = bank b0 + row b2 (addr b19)
            0b001000000000000000000000000010, // addr b15 = bank b1 + row b1 (addr b18)
            0b010000000000000000000000000001, // addr b14 = bank b2 + row b0 (addr b17)
            0b000010000000000000000000000000, // addr b13 = col b12
            0b000001000000000000000000000000, // addr b12 = col b11
            0b000000100000000000000000000000, // addr b11 = col b10
            0b000000010000000000000000000000, // addr b10 = col b9
            0b000000001000000000000000000000, // addr b9 = col b8
            0b000000000100000000000000000000, // addr b8 = col b7
            0b000000000010000000000000000000, // addr b7 = col b6
            0b100010000000000000000000000000, // addr b6 = bank b3 + col b12 (addr b13)
            0b000000000001000000000000000000, // addr b5 = col b5
            0b000000000000100000000000000000, // addr b4 = col b4
            0b000000000000010000000000000000, // addr b3 = col b3
            0b000000000000001000000000000000, // addr b2 = col b2
            0b000000000000000100000000000000, // addr b1 = col b1
            0b000000000000000010000000000000, // addr b0 = col b0
        ],
    }
}

/// Coffee Lake, 2 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn coffee_lake_2rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::CoffeeLake,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 0,
        bank_shift: 25,
        bank_mask: 0b11111,
        row_shift: 0,
        row_mask: 0b111111111111,
        col_shift: 12,
        col_mask: 0b1111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b000000000000000010000001000000,
            0b000000000001000100000000000000,
            0b000000000010001000000000000000,
            0b000000000100010000000000000000,
            0b000000001000100000000000000000,
            0b000000000000000010000000000000,
            0b000000000000000001000000000000,
            0b000000000000000000100000000000,
            0b000000000000000000010000000000,
            0b000000000000000000001000000000,
            0b000000000000000000000100000000,
            0b000000000000000000000010000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
            0b100000000000000000000000000000,
            0b010000000000000000000000000000,
            0b001000000000000000000000000000,
            0b000100000000000000000000000000,
            0b000010000000000000000000000000,
            0b000001000000000000000000000000,
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000000100000000000000000000,
            0b000000000010000000000000000000,
            0b000000000001000000000000000000,
        ],
        addr_matrix: vec![
            0b000000000000000000100000000000,
            0b000000000000000000010000000000,
            0b000000000000000000001000000000,
            0b000000000000000000000100000000,
            0b000000000000000000000010000000,
            0b000000000000000000000001000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
            0b000010000000000000000000001000,
            0b000100000000000000000000000100,
            0b001000000000000000000000000010,
            0b010000000000000000000000000001,
            0b000001000000000000000000000000,
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000000100000000000000000000,
            0b000000000010000000000000000000,
            0b000000000001000000000000000000,
            0b100001000000000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000000100000000000000,
            0b000000000000000010000000000000,
            0b000000000000000001000000000000,
        ],
    }
}

/// Zen 1+, 2 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen1plus_2rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen1Plus,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 1 << 30,
        bank_shift: 25,
        bank_mask: 0b11111,
        row_shift: 13,
        row_mask: 0b111111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111111100000000000000000, // rank_b0 = addr b29 b28 b27 b26 b25 b24 b23 b22 b21 b20 b19 b18 b17
            0b100010001000000100000000000000, // bg_b1 = addr b29 b25 b21 b14
            0b000100010001001000000000000000, // bg_b0 = addr b26 b22 b18 b15
            0b001000100010010000000000000000, // bk_b1 = addr b27 b23 b19 b16
            0b010001000100000011111111000000, // bk_b0 = addr b28 b24 b20 b13 b12 b11 b10 b9 b8 b7 b6
            0b100000000000000000000000000000, // row_b11 = addr b29
            0b010000000000000000000000000000, // row_b10 = addr b28
            0b001000000000000000000000000000, // row_b9 = addr b27
            0b000100000000000000000000000000, // row_b8 = addr b26
            0b000010000000000000000000000000, // row_b7 = addr b25
            0b000001000000000000000000000000, // row_b6 = addr b24
            0b000000100000000000000000000000, // row_b5 = addr b23
            0b000000010000000000000000000000, // row_b4 = addr b22
            0b000000001000000000000000000000, // row_b3 = addr b21
            0b000000000100000000000000000000, // row_b2 = addr b20
            0b000000000010000000000000000000, // row_b1 = addr b19
            0b000000000001000000000000000000, // row_b0 = addr b18
            0b000000000000000001000000000000, // col_b12 = addr b12
            0b000000000000000000100000000000, // col_b11 = addr b11
            0b000000000000000000010000000000, // col_b10 = addr b10
            0b000000000000000000001000000000, // col_b9 = addr b9
            0b000000000000000000000100000000, // col_b8 = addr b8
            0b000000000000000000000010000000, // col_b7 = addr b7
            0b000000000000000000000001000000, // col_b6 = addr b6
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000001000000000000000000000000, // addr b29 = row_b11
            0b000000100000000000000000000000, // addr b28 = row_b10
            0b000000010000000000000000000000, // addr b27 = row_b9
            0b000000001000000000000000000000, // addr b26 = row_b8
            0b000000000100000000000000000000, // addr b25 = row_b7
            0b000000000010000000000000000000, // addr b24 = row_b6
            0b000000000001000000000000000000, // addr b23 = row_b5
            0b000000000000100000000000000000, // addr b22 = row_b4
            0b000000000000010000000000000000, // addr b21 = row_b3
            0b000000000000001000000000000000, // addr b20 = row_b2
            0b000000000000000100000000000000, // addr b19 = row_b1
            0b000000000000000010000000000000, // addr b18 = row_b0
            0b100001111111111110000000000000, // addr b17 = rank_b0 row_b11 row_b10 row_b9 row_b8 row_b7 row_b6 row_b5 row_b4 row_b3 row_b2 row_b1 row_b0
            0b000100010001000100000000000000, // addr b16 = bk_b1 row_b9 row_b5 row_b1
            0b001000001000100010000000000000, // addr b15 = bg_b0 row_b8 row_b4 row_b0
            0b010001000100010000000000000000, // addr b14 = bg_b1 row_b11 row_b7 row_b3
            0b000010100010001001111111000000, // addr b13 = bk_b0 row_b10 row_b6 row_b2 col_b12 col_b11 col_b10 col_b9 col_b8 col_b7 col_b6
            0b000000000000000001000000000000, // addr b12 = col_b12
            0b000000000000000000100000000000, // addr b11 = col_b11
            0b000000000000000000010000000000, // addr b10 = col_b10
            0b000000000000000000001000000000, // addr b9 = col_b9
            0b000000000000000000000100000000, // addr b8 = col_b8
            0b000000000000000000000010000000, // addr b7 = col_b7
            0b000000000000000000000001000000, // addr b6 = col_b6
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 1+, 2 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen1plus_2rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen1Plus,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 1 << 30,
        bank_shift: 25,
        bank_mask: 0b11111,
        row_shift: 13,
        row_mask: 0b111111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111111100000000000000000, // rank_b0 = addr b29 b28 b27 b26 b25 b24 b23 b22 b21 b20 b19 b18 b17
            0b100010001000000100000000000000, // bg_b1 = addr b29 b25 b21 b14
            0b000100010001001000000000000000, // bg_b0 = addr b26 b22 b18 b15
            0b001000100010010000000000000000, // bk_b1 = addr b27 b23 b19 b16
            0b010001000100000011111111000000, // bk_b0 = addr b28 b24 b20 b13 b12 b11 b10 b9 b8 b7 b6
            0b100000000000000000000000000000, // row_b11 = addr b29
            0b010000000000000000000000000000, // row_b10 = addr b28
            0b001000000000000000000000000000, // row_b9 = addr b27
            0b000100000000000000000000000000, // row_b8 = addr b26
            0b000010000000000000000000000000, // row_b7 = addr b25
            0b000001000000000000000000000000, // row_b6 = addr b24
            0b000000100000000000000000000000, // row_b5 = addr b23
            0b000000010000000000000000000000, // row_b4 = addr b22
            0b000000001000000000000000000000, // row_b3 = addr b21
            0b000000001100000000000000000000, // row_b2 = addr b21 b20
            0b000000001010000000000000000000, // row_b1 = addr b21 b19
            0b000000000001000000000000000000, // row_b0 = addr b18
            0b000000000000000001000000000000, // col_b12 = addr b12
            0b000000000000000000100000000000, // col_b11 = addr b11
            0b000000000000000000010000000000, // col_b10 = addr b10
            0b000000000000000000001000000000, // col_b9 = addr b9
            0b000000000000000000000100000000, // col_b8 = addr b8
            0b000000000000000000000010000000, // col_b7 = addr b7
            0b000000000000000000000001000000, // col_b6 = addr b6
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000001000000000000000000000000, // addr b29 = row_b11
            0b000000100000000000000000000000, // addr b28 = row_b10
            0b000000010000000000000000000000, // addr b27 = row_b9
            0b000000001000000000000000000000, // addr b26 = row_b8
            0b000000000100000000000000000000, // addr b25 = row_b7
            0b000000000010000000000000000000, // addr b24 = row_b6
            0b000000000001000000000000000000, // addr b23 = row_b5
            0b000000000000100000000000000000, // addr b22 = row_b4
            0b000000000000010000000000000000, // addr b21 = row_b3
            0b000000000000011000000000000000, // addr b20 = row_b3 row_b2
            0b000000000000010100000000000000, // addr b19 = row_b3 row_b1
            0b000000000000000010000000000000, // addr b18 = row_b0
            0b100001111111111110000000000000, // addr b17 = rank_b0 row_b11 row_b10 row_b9 row_b8 row_b7 row_b6 row_b5 row_b4 row_b3 row_b2 row_b1 row_b0
            0b000100010001010100000000000000, // addr b16 = bk_b1 row_b9 row_b5 row_b3 row_b1
            0b001000001000100010000000000000, // addr b15 = bg_b0 row_b8 row_b4 row_b0
            0b010001000100010000000000000000, // addr b14 = bg_b1 row_b11 row_b7 row_b3
            0b000010100010011001111111000000, // addr b13 = bk_b0 row_b10 row_b6 row_b3 row_b2 col_b12 col_b11 col_b10 col_b9 col_b8 col_b7 col_b6
            0b000000000000000001000000000000, // addr b12 = col_b12
            0b000000000000000000100000000000, // addr b11 = col_b11
            0b000000000000000000010000000000, // addr b10 = col_b10
            0b000000000000000000001000000000, // addr b9 = col_b9
            0b000000000000000000000100000000, // addr b8 = col_b8
            0b000000000000000000000010000000, // addr b7 = col_b7
            0b000000000000000000000001000000, // addr b6 = col_b6
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 1+, 1 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen1plus_1rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen1Plus,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 1 << 30,
        bank_shift: 26,
        bank_mask: 0b1111,
        row_shift: 13,
        row_mask: 0b1111111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b100010001000101000000000000000, // bg_b1 = addr b29 b25 b21 b17 b15
            0b000100010001010000000000000000, // bg_b0 = addr b26 b22 b18 b16
            0b001000100010000011111111000000, // bk_b1 = addr b27 b23 b19 b13 b12 b11 b10 b9 b8 b7 b6
            0b010001000100000100000000000000, // bk_b0 = addr b28 b24 b20 b14
            0b100000000000000000000000000000, // row_b12 = addr b29
            0b010000000000000000000000000000, // row_b11 = addr b28
            0b001000000000000000000000000000, // row_b10 = addr b27
            0b000100000000000000000000000000, // row_b9 = addr b26
            0b000010000000000000000000000000, // row_b8 = addr b25
            0b000001000000000000000000000000, // row_b7 = addr b24
            0b000000100000000000000000000000, // row_b6 = addr b23
            0b000000010000000000000000000000, // row_b5 = addr b22
            0b000000001000000000000000000000, // row_b4 = addr b21
            0b000000000100000000000000000000, // row_b3 = addr b20
            0b000000000010000000000000000000, // row_b2 = addr b19
            0b000000000001000000000000000000, // row_b1 = addr b18
            0b000000000000100000000000000000, // row_b0 = addr b17
            0b000000000000000001000000000000, // col_b12 = addr b12
            0b000000000000000000100000000000, // col_b11 = addr b11
            0b000000000000000000010000000000, // col_b10 = addr b10
            0b000000000000000000001000000000, // col_b9 = addr b9
            0b000000000000000000000100000000, // col_b8 = addr b8
            0b000000000000000000000010000000, // col_b7 = addr b7
            0b000000000000000000000001000000, // col_b6 = addr b6
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000010000000000000000000000000, // addr b29 = row_b12
            0b000001000000000000000000000000, // addr b28 = row_b11
            0b000000100000000000000000000000, // addr b27 = row_b10
            0b000000010000000000000000000000, // addr b26 = row_b9
            0b000000001000000000000000000000, // addr b25 = row_b8
            0b000000000100000000000000000000, // addr b24 = row_b7
            0b000000000010000000000000000000, // addr b23 = row_b6
            0b000000000001000000000000000000, // addr b22 = row_b5
            0b000000000000100000000000000000, // addr b21 = row_b4
            0b000000000000010000000000000000, // addr b20 = row_b3
            0b000000000000001000000000000000, // addr b19 = row_b2
            0b000000000000000100000000000000, // addr b18 = row_b1
            0b000000000000000010000000000000, // addr b17 = row_b0
            0b010000010001000100000000000000, // addr b16 = bg_b0 row_b9 row_b5 row_b1
            0b100010001000100010000000000000, // addr b15 = bg_b1 row_b12 row_b8 row_b4 row_b0
            0b000101000100010000000000000000, // addr b14 = bk_b0 row_b11 row_b7 row_b3
            0b001000100010001001111111000000, // addr b13 = bk_b1 row_b10 row_b6 row_b2 col_b12 col_b11 col_b10 col_b9 col_b8 col_b7 col_b6
            0b000000000000000001000000000000, // addr b12 = col_b12
            0b000000000000000000100000000000, // addr b11 = col_b11
            0b000000000000000000010000000000, // addr b10 = col_b10
            0b000000000000000000001000000000, // addr b9 = col_b9
            0b000000000000000000000100000000, // addr b8 = col_b8
            0b000000000000000000000010000000, // addr b7 = col_b7
            0b000000000000000000000001000000, // addr b6 = col_b6
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 1+, 1 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen1plus_1rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen1Plus,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 1 << 30,
        bank_shift: 26,
        bank_mask: 0b1111,
        row_shift: 13,
        row_mask: 0b1111111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b100010001000101000000000000000, // bg_b1 = addr b29 b25 b21 b17 b15
            0b000100010001010000000000000000, // bg_b0 = addr b26 b22 b18 b16
            0b001000100010000011111111000000, // bk_b1 = addr b27 b23 b19 b13 b12 b11 b10 b9 b8 b7 b6
            0b010001000100000100000000000000, // bk_b0 = addr b28 b24 b20 b14
            0b100000000000000000000000000000, // row_b12 = addr b29
            0b010000000000000000000000000000, // row_b11 = addr b28
            0b001000000000000000000000000000, // row_b10 = addr b27
            0b000100000000000000000000000000, // row_b9 = addr b26
            0b000010000000000000000000000000, // row_b8 = addr b25
            0b000001000000000000000000000000, // row_b7 = addr b24
            0b000000100000000000000000000000, // row_b6 = addr b23
            0b000000010000000000000000000000, // row_b5 = addr b22
            0b000000001000000000000000000000, // row_b4 = addr b21
            0b000000000100000000000000000000, // row_b3 = addr b20
            0b000000000110000000000000000000, // row_b2 = addr b20 b19
            0b000000000101000000000000000000, // row_b1 = addr b20 b18
            0b000000000000100000000000000000, // row_b0 = addr b17
            0b000000000000000001000000000000, // col_b12 = addr b12
            0b000000000000000000100000000000, // col_b11 = addr b11
            0b000000000000000000010000000000, // col_b10 = addr b10
            0b000000000000000000001000000000, // col_b9 = addr b9
            0b000000000000000000000100000000, // col_b8 = addr b8
            0b000000000000000000000010000000, // col_b7 = addr b7
            0b000000000000000000000001000000, // col_b6 = addr b6
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000010000000000000000000000000, // addr b29 = row_b12
            0b000001000000000000000000000000, // addr b28 = row_b11
            0b000000100000000000000000000000, // addr b27 = row_b10
            0b000000010000000000000000000000, // addr b26 = row_b9
            0b000000001000000000000000000000, // addr b25 = row_b8
            0b000000000100000000000000000000, // addr b24 = row_b7
            0b000000000010000000000000000000, // addr b23 = row_b6
            0b000000000001000000000000000000, // addr b22 = row_b5
            0b000000000000100000000000000000, // addr b21 = row_b4
            0b000000000000010000000000000000, // addr b20 = row_b3
            0b000000000000011000000000000000, // addr b19 = row_b3 row_b2
            0b000000000000010100000000000000, // addr b18 = row_b3 row_b1
            0b000000000000000010000000000000, // addr b17 = row_b0
            0b010000010001010100000000000000, // addr b16 = bg_b0 row_b9 row_b5 row_b3 row_b1
            0b100010001000100010000000000000, // addr b15 = bg_b1 row_b12 row_b8 row_b4 row_b0
            0b000101000100010000000000000000, // addr b14 = bk_b0 row_b11 row_b7 row_b3
            0b001000100010011001111111000000, // addr b13 = bk_b1 row_b10 row_b6 row_b3 row_b2 col_b12 col_b11 col_b10 col_b9 col_b8 col_b7 col_b6
            0b000000000000000001000000000000, // addr b12 = col_b12
            0b000000000000000000100000000000, // addr b11 = col_b11
            0b000000000000000000010000000000, // addr b10 = col_b10
            0b000000000000000000001000000000, // addr b9 = col_b9
            0b000000000000000000000100000000, // addr b8 = col_b8
            0b000000000000000000000010000000, // addr b7 = col_b7
            0b000000000000000000000001000000, // addr b6 = col_b6
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 2, 2 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen2_2rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen2,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 512 << 20,
        bank_shift: 24,
        bank_mask: 0b11111,
        row_shift: 13,
        row_mask: 0b11111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 29,
        dram_matrix: vec![
            0b11111111111100000000000000000,
            0b00100010001001000000000000000,
            0b00010001000000100000000000000,
            0b10001000100000011111111000000,
            0b01000100010010000000000000000,
            0b10000000000000000000000000000,
            0b01000000000000000000000000000,
            0b00100000000000000000000000000,
            0b00010000000000000000000000000,
            0b00001000000000000000000000000,
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000100000000000000000,
            0b00000000000010000000000000000,
            0b00000000000001000000000000000,
            0b00000000000000100000000000000,
            0b00000000000000010000000000000,
            0b10000111111111110000000000000,
            0b00001010001000100000000000000,
            0b01000001000100010000000000000,
            0b00100000100010000000000000000,
            0b00010100010001001111111000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
    }
}

/// Zen 2, 2 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen2_2rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen2,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 512 << 20,
        bank_shift: 24,
        bank_mask: 0b11111,
        row_shift: 13,
        row_mask: 0b11111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 29,
        dram_matrix: vec![
            0b11111111111100000000000000000,
            0b00100010001001000000000000000,
            0b00010001000000100000000000000,
            0b10001000100000011111111000000,
            0b01000100010010000000000000000,
            0b10000000000000000000000000000,
            0b01000000000000000000000000000,
            0b00100000000000000000000000000,
            0b00010000000000000000000000000,
            0b00001000000000000000000000000,
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000001100000000000000000000,
            0b00000001010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000100000000000000000,
            0b00000000000010000000000000000,
            0b00000000000011000000000000000,
            0b00000000000010100000000000000,
            0b00000000000000010000000000000,
            0b10000111111111110000000000000,
            0b00001010001010100000000000000,
            0b01000001000100010000000000000,
            0b00100000100010000000000000000,
            0b00010100010011001111111000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
    }
}

/// Zen 2, 1 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen2_1rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen2,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 512 << 20,
        bank_shift: 25,
        bank_mask: 0b1111,
        row_shift: 13,
        row_mask: 0b111111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 29,
        dram_matrix: vec![
            0b00100010001010000000000000000,
            0b00010001000101000000000000000,
            0b10001000100000100000000000000,
            0b01000100010000011111111000000,
            0b10000000000000000000000000000,
            0b01000000000000000000000000000,
            0b00100000000000000000000000000,
            0b00010000000000000000000000000,
            0b00001000000000000000000000000,
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000100000000000000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b00001000000000000000000000000,
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000100000000000000000,
            0b00000000000010000000000000000,
            0b00000000000001000000000000000,
            0b00000000000000100000000000000,
            0b00000000000000010000000000000,
            0b10000010001000100000000000000,
            0b01000001000100010000000000000,
            0b00101000100010000000000000000,
            0b00010100010001001111111000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
    }
}

/// Zen 2, 1 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen2_1rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen2,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 512 << 20,
        bank_shift: 25,
        bank_mask: 0b1111,
        row_shift: 13,
        row_mask: 0b111111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 29,
        dram_matrix: vec![
            0b00100010001010000000000000000,
            0b00010001000101000000000000000,
            0b10001000100000100000000000000,
            0b01000100010000011111111000000,
            0b10000000000000000000000000000,
            0b01000000000000000000000000000,
            0b00100000000000000000000000000,
            0b00010000000000000000000000000,
            0b00001000000000000000000000000,
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000110000000000000000000,
            0b00000000101000000000000000000,
            0b00000000000100000000000000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b00001000000000000000000000000,
            0b00000100000000000000000000000,
            0b00000010000000000000000000000,
            0b00000001000000000000000000000,
            0b00000000100000000000000000000,
            0b00000000010000000000000000000,
            0b00000000001000000000000000000,
            0b00000000000100000000000000000,
            0b00000000000010000000000000000,
            0b00000000000011000000000000000,
            0b00000000000010100000000000000,
            0b00000000000000010000000000000,
            0b10000010001010100000000000000,
            0b01000001000100010000000000000,
            0b00101000100010000000000000000,
            0b00010100010011001111111000000,
            0b00000000000000001000000000000,
            0b00000000000000000100000000000,
            0b00000000000000000010000000000,
            0b00000000000000000001000000000,
            0b00000000000000000000100000000,
            0b00000000000000000000010000000,
            0b00000000000000000000001000000,
            0b00000000000000000000000100000,
            0b00000000000000000000000010000,
            0b00000000000000000000000001000,
            0b00000000000000000000000000100,
            0b00000000000000000000000000010,
            0b00000000000000000000000000001,
        ],
    }
}

/// Zen 3, 2 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen3_2rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen3,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 768 << 20,
        bank_shift: 23,
        bank_mask: 0b11111,
        row_shift: 13,
        row_mask: 0b1111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 28,
        dram_matrix: vec![
            0b1111111111100000000000000000, // rank_b0 = addr b27 b26 b25 b24 b23 b22 b21 b20 b19 b18 b17
            0b0100010001000000000100000000, // bg_b1 = addr b26 b22 b18 b8
            0b1000100010000000001000000000, // bg_b0 = addr b27 b23 b19 b9
            0b0001000100000000010000000000, // bk_b1 = addr b24 b20 b10
            0b0010001000000000100000000000, // bk_b0 = addr b25 b21 b11
            0b1000000000000000000000000000, // row_b9 = addr b27
            0b0100000000000000000000000000, // row_b8 = addr b26
            0b0010000000000000000000000000, // row_b7 = addr b25
            0b0001000000000000000000000000, // row_b6 = addr b24
            0b0000100000000000000000000000, // row_b5 = addr b23
            0b0000010000000000000000000000, // row_b4 = addr b22
            0b0000001000000000000000000000, // row_b3 = addr b21
            0b0000000100000000000000000000, // row_b2 = addr b20
            0b0000000010000000000000000000, // row_b1 = addr b19
            0b0000000001000000000000000000, // row_b0 = addr b18
            0b0000000000010000000000000000, // col_b12 = addr b16
            0b0000000000001000000000000000, // col_b11 = addr b15
            0b0000000000000100000000000000, // col_b10 = addr b14
            0b0000000000000010000000000000, // col_b9 = addr b13
            0b0000000000000001000000000000, // col_b8 = addr b12
            0b0000000000000000000010000000, // col_b7 = addr b7
            0b0000000000000000000001000000, // col_b6 = addr b6
            0b0000000000000000000000100000, // col_b5 = addr b5
            0b0000000000000000000000010000, // col_b4 = addr b4
            0b0000000000000000000000001000, // col_b3 = addr b3
            0b0000000000000000000000000100, // col_b2 = addr b2
            0b0000000000000000000000000010, // col_b1 = addr b1
            0b0000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b0000010000000000000000000000, // addr b27 = row_b9
            0b0000001000000000000000000000, // addr b26 = row_b8
            0b0000000100000000000000000000, // addr b25 = row_b7
            0b0000000010000000000000000000, // addr b24 = row_b6
            0b0000000001000000000000000000, // addr b23 = row_b5
            0b0000000000100000000000000000, // addr b22 = row_b4
            0b0000000000010000000000000000, // addr b21 = row_b3
            0b0000000000001000000000000000, // addr b20 = row_b2
            0b0000000000000100000000000000, // addr b19 = row_b1
            0b0000000000000010000000000000, // addr b18 = row_b0
            0b1000011111111110000000000000, // addr b17 = rank_b0 row_b9 row_b8 row_b7 row_b6 row_b5 row_b4 row_b3 row_b2 row_b1 row_b0
            0b0000000000000001000000000000, // addr b16 = col_b12
            0b0000000000000000100000000000, // addr b15 = col_b11
            0b0000000000000000010000000000, // addr b14 = col_b10
            0b0000000000000000001000000000, // addr b13 = col_b9
            0b0000000000000000000100000000, // addr b12 = col_b8
            0b0000100100010000000000000000, // addr b11 = bk_b0 row_b7 row_b3
            0b0001000010001000000000000000, // addr b10 = bk_b1 row_b6 row_b2
            0b0010010001000100000000000000, // addr b9 = bg_b0 row_b9 row_b5 row_b1
            0b0100001000100010000000000000, // addr b8 = bg_b1 row_b8 row_b4 row_b0
            0b0000000000000000000010000000, // addr b7 = col_b7
            0b0000000000000000000001000000, // addr b6 = col_b6
            0b0000000000000000000000100000, // addr b5 = col_b5
            0b0000000000000000000000010000, // addr b4 = col_b4
            0b0000000000000000000000001000, // addr b3 = col_b3
            0b0000000000000000000000000100, // addr b2 = col_b2
            0b0000000000000000000000000010, // addr b1 = col_b1
            0b0000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 3, 2 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen3_2rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen3,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 768 << 20,
        bank_shift: 23,
        bank_mask: 0b11111,
        row_shift: 13,
        row_mask: 0b1111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 28,
        dram_matrix: vec![
            0b1111111111100000000000000000, // rank_b0 = addr b27 b26 b25 b24 b23 b22 b21 b20 b19 b18 b17
            0b0100010001000000000100000000, // bg_b1 = addr b26 b22 b18 b8
            0b1000100010000000001000000000, // bg_b0 = addr b27 b23 b19 b9
            0b0001000100000000010000000000, // bk_b1 = addr b24 b20 b10
            0b0010001000000000100000000000, // bk_b0 = addr b25 b21 b11
            0b1000000000000000000000000000, // row_b9 = addr b27
            0b0100000000000000000000000000, // row_b8 = addr b26
            0b0010000000000000000000000000, // row_b7 = addr b25
            0b0001000000000000000000000000, // row_b6 = addr b24
            0b0000100000000000000000000000, // row_b5 = addr b23
            0b0000010000000000000000000000, // row_b4 = addr b22
            0b0000001000000000000000000000, // row_b3 = addr b21
            0b0000001100000000000000000000, // row_b2 = addr b21 b20
            0b0000001010000000000000000000, // row_b1 = addr b21 b19
            0b0000000001000000000000000000, // row_b0 = addr b18
            0b0000000000010000000000000000, // col_b12 = addr b16
            0b0000000000001000000000000000, // col_b11 = addr b15
            0b0000000000000100000000000000, // col_b10 = addr b14
            0b0000000000000010000000000000, // col_b9 = addr b13
            0b0000000000000001000000000000, // col_b8 = addr b12
            0b0000000000000000000010000000, // col_b7 = addr b7
            0b0000000000000000000001000000, // col_b6 = addr b6
            0b0000000000000000000000100000, // col_b5 = addr b5
            0b0000000000000000000000010000, // col_b4 = addr b4
            0b0000000000000000000000001000, // col_b3 = addr b3
            0b0000000000000000000000000100, // col_b2 = addr b2
            0b0000000000000000000000000010, // col_b1 = addr b1
            0b0000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b0000010000000000000000000000, // addr b27 = row_b9
            0b0000001000000000000000000000, // addr b26 = row_b8
            0b0000000100000000000000000000, // addr b25 = row_b7
            0b0000000010000000000000000000, // addr b24 = row_b6
            0b0000000001000000000000000000, // addr b23 = row_b5
            0b0000000000100000000000000000, // addr b22 = row_b4
            0b0000000000010000000000000000, // addr b21 = row_b3
            0b0000000000011000000000000000, // addr b20 = row_b3 row_b2
            0b0000000000010100000000000000, // addr b19 = row_b3 row_b1
            0b0000000000000010000000000000, // addr b18 = row_b0
            0b1000011111111110000000000000, // addr b17 = rank_b0 row_b9 row_b8 row_b7 row_b6 row_b5 row_b4 row_b3 row_b2 row_b1 row_b0
            0b0000000000000001000000000000, // addr b16 = col_b12
            0b0000000000000000100000000000, // addr b15 = col_b11
            0b0000000000000000010000000000, // addr b14 = col_b10
            0b0000000000000000001000000000, // addr b13 = col_b9
            0b0000000000000000000100000000, // addr b12 = col_b8
            0b0000100100010000000000000000, // addr b11 = bk_b0 row_b7 row_b3
            0b0001000010011000000000000000, // addr b10 = bk_b1 row_b6 row_b3 row_b2
            0b0010010001010100000000000000, // addr b9 = bg_b0 row_b9 row_b5 row_b3 row_b1
            0b0100001000100010000000000000, // addr b8 = bg_b1 row_b8 row_b4 row_b0
            0b0000000000000000000010000000, // addr b7 = col_b7
            0b0000000000000000000001000000, // addr b6 = col_b6
            0b0000000000000000000000100000, // addr b5 = col_b5
            0b0000000000000000000000010000, // addr b4 = col_b4
            0b0000000000000000000000001000, // addr b3 = col_b3
            0b0000000000000000000000000100, // addr b2 = col_b2
            0b0000000000000000000000000010, // addr b1 = col_b1
            0b0000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 3, 1 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen3_1rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen3,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 768 << 20,
        bank_shift: 24,
        bank_mask: 0b1111,
        row_shift: 13,
        row_mask: 0b11111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 28,
        dram_matrix: vec![
            0b0010001000100000000100000000, // bg_b1 = addr b25 b21 b17 b8
            0b0100010001000000001000000000, // bg_b0 = addr b26 b22 b18 b9
            0b1000100010000000010000000000, // bk_b1 = addr b27 b23 b19 b10
            0b0001000100000000100000000000, // bk_b0 = addr b24 b20 b11
            0b1000000000000000000000000000, // row_b10 = addr b27
            0b0100000000000000000000000000, // row_b9 = addr b26
            0b0010000000000000000000000000, // row_b8 = addr b25
            0b0001000000000000000000000000, // row_b7 = addr b24
            0b0000100000000000000000000000, // row_b6 = addr b23
            0b0000010000000000000000000000, // row_b5 = addr b22
            0b0000001000000000000000000000, // row_b4 = addr b21
            0b0000000100000000000000000000, // row_b3 = addr b20
            0b0000000010000000000000000000, // row_b2 = addr b19
            0b0000000001000000000000000000, // row_b1 = addr b18
            0b0000000000100000000000000000, // row_b0 = addr b17
            0b0000000000010000000000000000, // col_b12 = addr b16
            0b0000000000001000000000000000, // col_b11 = addr b15
            0b0000000000000100000000000000, // col_b10 = addr b14
            0b0000000000000010000000000000, // col_b9 = addr b13
            0b0000000000000001000000000000, // col_b8 = addr b12
            0b0000000000000000000010000000, // col_b7 = addr b7
            0b0000000000000000000001000000, // col_b6 = addr b6
            0b0000000000000000000000100000, // col_b5 = addr b5
            0b0000000000000000000000010000, // col_b4 = addr b4
            0b0000000000000000000000001000, // col_b3 = addr b3
            0b0000000000000000000000000100, // col_b2 = addr b2
            0b0000000000000000000000000010, // col_b1 = addr b1
            0b0000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b0000100000000000000000000000, // addr b27 = row_b10
            0b0000010000000000000000000000, // addr b26 = row_b9
            0b0000001000000000000000000000, // addr b25 = row_b8
            0b0000000100000000000000000000, // addr b24 = row_b7
            0b0000000010000000000000000000, // addr b23 = row_b6
            0b0000000001000000000000000000, // addr b22 = row_b5
            0b0000000000100000000000000000, // addr b21 = row_b4
            0b0000000000010000000000000000, // addr b20 = row_b3
            0b0000000000001000000000000000, // addr b19 = row_b2
            0b0000000000000100000000000000, // addr b18 = row_b1
            0b0000000000000010000000000000, // addr b17 = row_b0
            0b0000000000000001000000000000, // addr b16 = col_b12
            0b0000000000000000100000000000, // addr b15 = col_b11
            0b0000000000000000010000000000, // addr b14 = col_b10
            0b0000000000000000001000000000, // addr b13 = col_b9
            0b0000000000000000000100000000, // addr b12 = col_b8
            0b0001000100010000000000000000, // addr b11 = bk_b0 row_b7 row_b3
            0b0010100010001000000000000000, // addr b10 = bk_b1 row_b10 row_b6 row_b2
            0b0100010001000100000000000000, // addr b9 = bg_b0 row_b9 row_b5 row_b1
            0b1000001000100010000000000000, // addr b8 = bg_b1 row_b8 row_b4 row_b0
            0b0000000000000000000010000000, // addr b7 = col_b7
            0b0000000000000000000001000000, // addr b6 = col_b6
            0b0000000000000000000000100000, // addr b5 = col_b5
            0b0000000000000000000000010000, // addr b4 = col_b4
            0b0000000000000000000000001000, // addr b3 = col_b3
            0b0000000000000000000000000100, // addr b2 = col_b2
            0b0000000000000000000000000010, // addr b1 = col_b1
            0b0000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 3, 1 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen3_1rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen3,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 768 << 20,
        bank_shift: 24,
        bank_mask: 0b1111,
        row_shift: 13,
        row_mask: 0b11111111111,
        col_shift: 0,
        col_mask: 0b1111111111111,
        matrix_size: 28,
        dram_matrix: vec![
            0b0010001000100000000100000000, // bg_b1 = addr b25 b21 b17 b8
            0b0100010001000000001000000000, // bg_b0 = addr b26 b22 b18 b9
            0b1000100010000000010000000000, // bk_b1 = addr b27 b23 b19 b10
            0b0001000100000000100000000000, // bk_b0 = addr b24 b20 b11
            0b1000000000000000000000000000, // row_b10 = addr b27
            0b0100000000000000000000000000, // row_b9 = addr b26
            0b0010000000000000000000000000, // row_b8 = addr b25
            0b0001000000000000000000000000, // row_b7 = addr b24
            0b0000100000000000000000000000, // row_b6 = addr b23
            0b0000010000000000000000000000, // row_b5 = addr b22
            0b0000001000000000000000000000, // row_b4 = addr b21
            0b0000000100000000000000000000, // row_b3 = addr b20
            0b0000000110000000000000000000, // row_b2 = addr b20 b19
            0b0000000101000000000000000000, // row_b1 = addr b20 b18
            0b0000000000100000000000000000, // row_b0 = addr b17
            0b0000000000010000000000000000, // col_b12 = addr b16
            0b0000000000001000000000000000, // col_b11 = addr b15
            0b0000000000000100000000000000, // col_b10 = addr b14
            0b0000000000000010000000000000, // col_b9 = addr b13
            0b0000000000000001000000000000, // col_b8 = addr b12
            0b0000000000000000000010000000, // col_b7 = addr b7
            0b0000000000000000000001000000, // col_b6 = addr b6
            0b0000000000000000000000100000, // col_b5 = addr b5
            0b0000000000000000000000010000, // col_b4 = addr b4
            0b0000000000000000000000001000, // col_b3 = addr b3
            0b0000000000000000000000000100, // col_b2 = addr b2
            0b0000000000000000000000000010, // col_b1 = addr b1
            0b0000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b0000100000000000000000000000, // addr b27 = row_b10
            0b0000010000000000000000000000, // addr b26 = row_b9
            0b0000001000000000000000000000, // addr b25 = row_b8
            0b0000000100000000000000000000, // addr b24 = row_b7
            0b0000000010000000000000000000, // addr b23 = row_b6
            0b0000000001000000000000000000, // addr b22 = row_b5
            0b0000000000100000000000000000, // addr b21 = row_b4
            0b0000000000010000000000000000, // addr b20 = row_b3
            0b0000000000011000000000000000, // addr b19 = row_b3 row_b2
            0b0000000000010100000000000000, // addr b18 = row_b3 row_b1
            0b0000000000000010000000000000, // addr b17 = row_b0
            0b0000000000000001000000000000, // addr b16 = col_b12
            0b0000000000000000100000000000, // addr b15 = col_b11
            0b0000000000000000010000000000, // addr b14 = col_b10
            0b0000000000000000001000000000, // addr b13 = col_b9
            0b0000000000000000000100000000, // addr b12 = col_b8
            0b0001000100010000000000000000, // addr b11 = bk_b0 row_b7 row_b3
            0b0010100010011000000000000000, // addr b10 = bk_b1 row_b10 row_b6 row_b3 row_b2
            0b0100010001010100000000000000, // addr b9 = bg_b0 row_b9 row_b5 row_b3 row_b1
            0b1000001000100010000000000000, // addr b8 = bg_b1 row_b8 row_b4 row_b0
            0b0000000000000000000010000000, // addr b7 = col_b7
            0b0000000000000000000001000000, // addr b6 = col_b6
            0b0000000000000000000000100000, // addr b5 = col_b5
            0b0000000000000000000000010000, // addr b4 = col_b4
            0b0000000000000000000000001000, // addr b3 = col_b3
            0b0000000000000000000000000100, // addr b2 = col_b2
            0b0000000000000000000000000010, // addr b1 = col_b1
            0b0000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 4, 1 rank(s), 8 bank groups, 4 banks per group, sequential rows.
fn zen4_1rk_8bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen4,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 2 << 30,
        bank_shift: 24,
        bank_mask: 0b111111,
        row_shift: 12,
        row_mask: 0b111111111111,
        col_shift: 0,
        col_mask: 0b111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111111000000000001000000, // subch_b0 = addr b29 b28 b27 b26 b25 b24 b23 b22 b21 b20 b19 b18 b6
            0b001000010000000001000000000000, // bg_b2 = addr b27 b22 b12
            0b000100001000000000001000000000, // bg_b1 = addr b26 b21 b9
            0b000010000100000000000100000000, // bg_b0 = addr b25 b20 b8
            0b100001000010000000100000000000, // bk_b1 = addr b29 b24 b19 b11
            0b010000100001000000010000000000, // bk_b0 = addr b28 b23 b18 b10
            0b100000000000000000000000000000, // row_b11 = addr b29
            0b010000000000000000000000000000, // row_b10 = addr b28
            0b001000000000000000000000000000, // row_b9 = addr b27
            0b000100000000000000000000000000, // row_b8 = addr b26
            0b000010000000000000000000000000, // row_b7 = addr b25
            0b000001000000000000000000000000, // row_b6 = addr b24
            0b000000100000000000000000000000, // row_b5 = addr b23
            0b000000010000000000000000000000, // row_b4 = addr b22
            0b000000001000000000000000000000, // row_b3 = addr b21
            0b000000000100000000000000000000, // row_b2 = addr b20
            0b000000000010000000000000000000, // row_b1 = addr b19
            0b000000000001000000000000000000, // row_b0 = addr b18
            0b000000000000100000000000000000, // col_b11 = addr b17
            0b000000000000010000000000000000, // col_b10 = addr b16
            0b000000000000001000000000000000, // col_b9 = addr b15
            0b000000000000000100000000000000, // col_b8 = addr b14
            0b000000000000000010000000000000, // col_b7 = addr b13
            0b000000000000000000000010000000, // col_b6 = addr b7
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000000100000000000000000000000, // addr b29 = row_b11
            0b000000010000000000000000000000, // addr b28 = row_b10
            0b000000001000000000000000000000, // addr b27 = row_b9
            0b000000000100000000000000000000, // addr b26 = row_b8
            0b000000000010000000000000000000, // addr b25 = row_b7
            0b000000000001000000000000000000, // addr b24 = row_b6
            0b000000000000100000000000000000, // addr b23 = row_b5
            0b000000000000010000000000000000, // addr b22 = row_b4
            0b000000000000001000000000000000, // addr b21 = row_b3
            0b000000000000000100000000000000, // addr b20 = row_b2
            0b000000000000000010000000000000, // addr b19 = row_b1
            0b000000000000000001000000000000, // addr b18 = row_b0
            0b000000000000000000100000000000, // addr b17 = col_b11
            0b000000000000000000010000000000, // addr b16 = col_b10
            0b000000000000000000001000000000, // addr b15 = col_b9
            0b000000000000000000000100000000, // addr b14 = col_b8
            0b000000000000000000000010000000, // addr b13 = col_b7
            0b010000001000010000000000000000, // addr b12 = bg_b2 row_b9 row_b4
            0b000010100001000010000000000000, // addr b11 = bk_b1 row_b11 row_b6 row_b1
            0b000001010000100001000000000000, // addr b10 = bk_b0 row_b10 row_b5 row_b0
            0b001000000100001000000000000000, // addr b9 = bg_b1 row_b8 row_b3
            0b000100000010000100000000000000, // addr b8 = bg_b0 row_b7 row_b2
            0b000000000000000000000001000000, // addr b7 = col_b6
            0b100000111111111111000000000000,
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 4, 1 rank(s), 8 bank groups, 4 banks per group, Samsung row remapping.
fn zen4_1rk_8bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen4,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 2 << 30,
        bank_shift: 24,
        bank_mask: 0b111111,
        row_shift: 12,
        row_mask: 0b111111111111,
        col_shift: 0,
        col_mask: 0b111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111111000000000001000000,
            0b001000010000000001000000000000,
            0b000100001000000000001000000000,
            0b000010000100000000000100000000,
            0b100001000010000000100000000000,
            0b010000100001000000010000000000,
            0b100000000000000000000000000000,
            0b010000000000000000000000000000,
            0b001000000000000000000000000000,
            0b000100000000000000000000000000,
            0b000010000000000000000000000000,
            0b000001000000000000000000000000,
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000001100000000000000000000,
            0b000000001010000000000000000000,
            0b000000000001000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000000100000000000000,
            0b000000000000000010000000000000,
            0b000000000000000000000010000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000000100000000000000000000,
            0b000000000010000000000000000000,
            0b000000000001000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000001100000000000000,
            0b000000000000001010000000000000,
            0b000000000000000001000000000000,
            0b000000000000000000100000000000,
            0b000000000000000000010000000000,
            0b000000000000000000001000000000,
            0b000000000000000000000100000000,
            0b000000000000000000000010000000,
            0b010000001000010000000000000000,
            0b000010100001001010000000000000,
            0b000001010000100001000000000000,
            0b001000000100001000000000000000,
            0b000100000010001100000000000000,
            0b000000000000000000000001000000,
            0b100000111111111111000000000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
        ],
    }
}

/// Zen 4, 1 rank(s), 4 bank groups, 4 banks per group, sequential rows.
fn zen4_1rk_4bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen4,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 2 << 30,
        bank_shift: 25,
        bank_mask: 0b11111,
        row_shift: 12,
        row_mask: 0b1111111111111,
        col_shift: 0,
        col_mask: 0b111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111111100000000001000000,
            0b001000100010000000000100000000, // bg_b1 = addr b27 b23 b19 b8
            0b010001000100000000001000000000, // bg_b0 = addr b28 b24 b20 b9
            0b100010001000100000010000000000, // bk_b1 = addr b29 b25 b21 b17 b10
            0b000100010001000000100000000000, // bk_b0 = addr b26 b22 b18 b11
            0b100000000000000000000000000000, // row_b12 = addr b29
            0b010000000000000000000000000000, // row_b11 = addr b28
            0b001000000000000000000000000000, // row_b10 = addr b27
            0b000100000000000000000000000000, // row_b9 = addr b26
            0b000010000000000000000000000000, // row_b8 = addr b25
            0b000001000000000000000000000000, // row_b7 = addr b24
            0b000000100000000000000000000000, // row_b6 = addr b23
            0b000000010000000000000000000000, // row_b5 = addr b22
            0b000000001000000000000000000000, // row_b4 = addr b21
            0b000000000100000000000000000000, // row_b3 = addr b20
            0b000000000010000000000000000000, // row_b2 = addr b19
            0b000000000001000000000000000000, // row_b1 = addr b18
            0b000000000000100000000000000000, // row_b0 = addr b17
            0b000000000000010000000000000000, // col_b11 = addr b16
            0b000000000000001000000000000000, // col_b10 = addr b15
            0b000000000000000100000000000000, // col_b9 = addr b14
            0b000000000000000010000000000000, // col_b8 = addr b13
            0b000000000000000001000000000000, // col_b7 = addr b12
            0b000000000000000000000010000000, // col_b6 = addr b7
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000001000000000000000000000000, // addr b29 = row_b12
            0b000000100000000000000000000000, // addr b28 = row_b11
            0b000000010000000000000000000000, // addr b27 = row_b10
            0b000000001000000000000000000000, // addr b26 = row_b9
            0b000000000100000000000000000000, // addr b25 = row_b8
            0b000000000010000000000000000000, // addr b24 = row_b7
            0b000000000001000000000000000000, // addr b23 = row_b6
            0b000000000000100000000000000000, // addr b22 = row_b5
            0b000000000000010000000000000000, // addr b21 = row_b4
            0b000000000000001000000000000000, // addr b20 = row_b3
            0b000000000000000100000000000000, // addr b19 = row_b2
            0b000000000000000010000000000000, // addr b18 = row_b1
            0b000000000000000001000000000000, // addr b17 = row_b0
            0b000000000000000000100000000000, // addr b16 = col_b11
            0b000000000000000000010000000000, // addr b15 = col_b10
            0b000000000000000000001000000000, // addr b14 = col_b9
            0b000000000000000000000100000000, // addr b13 = col_b8
            0b000000000000000000000010000000, // addr b12 = col_b7
            0b000010001000100010000000000000, // addr b11 = bk_b0 row_b9 row_b5 row_b1
            0b000101000100010001000000000000, // addr b10 = bk_b1 row_b12 row_b8 row_b4 row_b0
            0b001000100010001000000000000000, // addr b9 = bg_b0 row_b11 row_b7 row_b3
            0b010000010001000100000000000000, // addr b8 = bg_b1 row_b10 row_b6 row_b2
            0b000000000000000000000001000000, // addr b7 = col_b6
            0b100001111111111111000000000000,
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 4, 1 rank(s), 4 bank groups, 4 banks per group, Samsung row remapping.
fn zen4_1rk_4bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen4,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 2 << 30,
        bank_shift: 25,
        bank_mask: 0b11111,
        row_shift: 12,
        row_mask: 0b1111111111111,
        col_shift: 0,
        col_mask: 0b111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111111100000000001000000,
            0b010001000100000000001000000000,
            0b001000100010000000000100000000,
            0b000100010001000000100000000000,
            0b100010001000100000010000000000,
            0b100000000000000000000000000000,
            0b010000000000000000000000000000,
            0b001000000000000000000000000000,
            0b000100000000000000000000000000,
            0b000010000000000000000000000000,
            0b000001000000000000000000000000,
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000000100000000000000000000,
            0b000000000110000000000000000000,
            0b000000000101000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000000100000000000000,
            0b000000000000000010000000000000,
            0b000000000000000001000000000000,
            0b000000000000000000000010000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b000001000000000000000000000000,
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000000100000000000000000000,
            0b000000000010000000000000000000,
            0b000000000001000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000001100000000000000,
            0b000000000000001010000000000000,
            0b000000000000000001000000000000,
            0b000000000000000000100000000000,
            0b000000000000000000010000000000,
            0b000000000000000000001000000000,
            0b000000000000000000000100000000,
            0b000000000000000000000010000000,
            0b000100001000101010000000000000,
            0b000011000100010001000000000000,
            0b010000100010001000000000000000,
            0b001000010001001100000000000000,
            0b000000000000000000000001000000,
            0b100001111111111111000000000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
        ],
    }
}

/// Zen 4, 2 rank(s), 8 bank groups, 4 banks per group, sequential rows.
fn zen4_2rk_8bg_4bk() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen4,
        row_mapping: RowMapping::Sequential,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 2 << 30,
        bank_shift: 23,
        bank_mask: 0b1111111,
        row_shift: 12,
        row_mask: 0b11111111111,
        col_shift: 0,
        col_mask: 0b111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111110000000000001000000, // subch_b0 = addr b29 b28 b27 b26 b25 b24 b23 b22 b21 b20 b19 b6
            0b000000000001000000000000000000, // rank_b0 = addr b18
            0b000100001000000000000100000000, // bg_b2 = addr b26 b21 b8
            0b001000010000000000001000000000, // bg_b1 = addr b27 b22 b9
            0b010000100000000001000000000000, // bg_b0 = addr b28 b23 b12
            0b100001000010000000010000000000, // bk_b1 = addr b29 b24 b19 b10
            0b000010000100000000100000000000, // bk_b0 = addr b25 b20 b11
            0b100000000000000000000000000000, // row_b10 = addr b29
            0b010000000000000000000000000000, // row_b9 = addr b28
            0b001000000000000000000000000000, // row_b8 = addr b27
            0b000100000000000000000000000000, // row_b7 = addr b26
            0b000010000000000000000000000000, // row_b6 = addr b25
            0b000001000000000000000000000000, // row_b5 = addr b24
            0b000000100000000000000000000000, // row_b4 = addr b23
            0b000000010000000000000000000000, // row_b3 = addr b22
            0b000000001000000000000000000000, // row_b2 = addr b21
            0b000000000100000000000000000000, // row_b1 = addr b20
            0b000000000010000000000000000000, // row_b0 = addr b19
            0b000000000000100000000000000000, // col_b11 = addr b17
            0b000000000000010000000000000000, // col_b10 = addr b16
            0b000000000000001000000000000000, // col_b9 = addr b15
            0b000000000000000100000000000000, // col_b8 = addr b14
            0b000000000000000010000000000000, // col_b7 = addr b13
            0b000000000000000000000010000000, // col_b6 = addr b7
            0b000000000000000000000000100000, // col_b5 = addr b5
            0b000000000000000000000000010000, // col_b4 = addr b4
            0b000000000000000000000000001000, // col_b3 = addr b3
            0b000000000000000000000000000100, // col_b2 = addr b2
            0b000000000000000000000000000010, // col_b1 = addr b1
            0b000000000000000000000000000001, // col_b0 = addr b0
        ],
        addr_matrix: vec![
            0b000000010000000000000000000000, // addr b29 = row_b10
            0b000000001000000000000000000000, // addr b28 = row_b9
            0b000000000100000000000000000000, // addr b27 = row_b8
            0b000000000010000000000000000000, // addr b26 = row_b7
            0b000000000001000000000000000000, // addr b25 = row_b6
            0b000000000000100000000000000000, // addr b24 = row_b5
            0b000000000000010000000000000000, // addr b23 = row_b4
            0b000000000000001000000000000000, // addr b22 = row_b3
            0b000000000000000100000000000000, // addr b21 = row_b2
            0b000000000000000010000000000000, // addr b20 = row_b1
            0b000000000000000001000000000000, // addr b19 = row_b0
            0b010000000000000000000000000000, // addr b18 = rank_b0
            0b000000000000000000100000000000, // addr b17 = col_b11
            0b000000000000000000010000000000, // addr b16 = col_b10
            0b000000000000000000001000000000, // addr b15 = col_b9
            0b000000000000000000000100000000, // addr b14 = col_b8
            0b000000000000000000000010000000, // addr b13 = col_b7
            0b000010001000010000000000000000, // addr b12 = bg_b0 row_b9 row_b4
            0b000000100001000010000000000000, // addr b11 = bk_b0 row_b6 row_b1
            0b000001010000100001000000000000, // addr b10 = bk_b1 row_b10 row_b5 row_b0
            0b000100000100001000000000000000, // addr b9 = bg_b1 row_b8 row_b3
            0b001000000010000100000000000000, // addr b8 = bg_b2 row_b7 row_b2
            0b000000000000000000000001000000, // addr b7 = col_b6
            0b100000011111111111000000000000,
            0b000000000000000000000000100000, // addr b5 = col_b5
            0b000000000000000000000000010000, // addr b4 = col_b4
            0b000000000000000000000000001000, // addr b3 = col_b3
            0b000000000000000000000000000100, // addr b2 = col_b2
            0b000000000000000000000000000010, // addr b1 = col_b1
            0b000000000000000000000000000001, // addr b0 = col_b0
        ],
    }
}

/// Zen 4, 2 rank(s), 8 bank groups, 4 banks per group, Samsung row remapping.
fn zen4_2rk_8bg_4bk_samsung() -> DramConfig {
    DramConfig {
        uarch: Microarchitecture::Zen4,
        row_mapping: RowMapping::Samsung,
        sync_ref_threshold: DramConfig::INITIAL_SYNC_REF_THRESHOLD,
        phys_dram_offset: 2 << 30,
        bank_shift: 23,
        bank_mask: 0b1111111,
        row_shift: 12,
        row_mask: 0b11111111111,
        col_shift: 0,
        col_mask: 0b111111111111,
        matrix_size: 30,
        dram_matrix: vec![
            0b111111111110000000000001000000,
            0b000000000001000000000000000000,
            0b010000100000000001000000000000,
            0b001000010000000000001000000000,
            0b000100001000000000000100000000,
            0b000010000100000000100000000000,
            0b100001000010000000010000000000,
            0b100000000000000000000000000000,
            0b010000000000000000000000000000,
            0b001000000000000000000000000000,
            0b000100000000000000000000000000,
            0b000010000000000000000000000000,
            0b000001000000000000000000000000,
            0b000000100000000000000000000000,
            0b000000010000000000000000000000,
            0b000000011000000000000000000000,
            0b000000010100000000000000000000,
            0b000000000010000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000000100000000000000,
            0b000000000000000010000000000000,
            0b000000000000000000000010000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
        ],
        addr_matrix: vec![
            0b000000010000000000000000000000,
            0b000000001000000000000000000000,
            0b000000000100000000000000000000,
            0b000000000010000000000000000000,
            0b000000000001000000000000000000,
            0b000000000000100000000000000000,
            0b000000000000010000000000000000,
            0b000000000000001000000000000000,
            0b000000000000001100000000000000,
            0b000000000000001010000000000000,
            0b000000000000000001000000000000,
            0b010000000000000000000000000000,
            0b000000000000000000100000000000,
            0b000000000000000000010000000000,
            0b000000000000000000001000000000,
            0b000000000000000000000100000000,
            0b000000000000000000000010000000,
            0b001000001000010000000000000000,
            0b000001000001001010000000000000,
            0b000000110000100001000000000000,
            0b000100000100001000000000000000,
            0b000010000010001100000000000000,
            0b000000000000000000000001000000,
            0b100000011111111111000000000000,
            0b000000000000000000000000100000,
            0b000000000000000000000000010000,
            0b000000000000000000000000001000,
            0b000000000000000000000000000100,
            0b000000000000000000000000000010,
            0b000000000000000000000000000001,
        ],
    }
}
