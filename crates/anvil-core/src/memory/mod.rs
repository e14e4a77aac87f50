//! Memory management for hammering targets.
//!
//! This module provides:
//! - [`MemoryRegion`]: a physically contiguous buffer backed by a 1 GB
//!   superpage (with fallbacks), the substrate all timing analysis and
//!   hammering runs on.
//! - [`DataPattern`] and the reproducible page fill: every 4 KB page is
//!   filled from a linear congruential generator reseeded with
//!   `page_index * PAGE_SIZE`, so a scanner can regenerate the expected
//!   content of any page without storing it.
//! - [`BitFlip`] / [`FlipDirection`]: the record of a detected corruption.

mod region;
mod virt_to_phys;

pub use self::region::{MemoryError, MemoryRegion};
pub use self::virt_to_phys::{LinuxPageMap, PageMapLookupError, PhysAddr};

use serde::{Deserialize, Serialize};

/// Pointer type for aggressor row addresses.
pub type AggressorPtr = *const u8;

/// Fill pattern for victim memory.
///
/// `Random` is the default for fuzzing: it makes both 0→1 and 1→0 flips
/// observable. The constant patterns are used for directed experiments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataPattern {
    /// Per-page reproducible pseudorandom fill
    Random,
    /// All words 0x00000000
    Zeroes,
    /// All words 0x00000001
    Ones,
}

/// The reproducible page-fill generator.
///
/// A classic linear congruential generator with Knuth's MMIX constants:
/// `state' = state * 6364136223846793005 + 1442695040888963407`, output =
/// upper 32 bits of the new state. The scanner reconstructs any page by
/// reseeding with `page_index * PAGE_SIZE`, so this exact recurrence is a
/// compatibility contract: changing it makes old fills unverifiable.
#[derive(Clone, Debug)]
pub struct FillLcg {
    state: u64,
}

impl FillLcg {
    const MUL: u64 = 6364136223846793005;
    const INC: u64 = 1442695040888963407;

    /// Creates a generator for the page starting at byte offset `seed`.
    pub fn with_seed(seed: u64) -> Self {
        FillLcg { state: seed }
    }

    /// Returns the next 32-bit fill word.
    pub fn next_word(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MUL)
            .wrapping_add(Self::INC);
        (self.state >> 32) as u32
    }
}

/// Computes the expected content of the page with index `page_index` under
/// the given fill pattern.
pub fn expected_page(pattern: DataPattern, page_index: usize, out: &mut [u8]) {
    debug_assert_eq!(out.len() % 4, 0);
    match pattern {
        DataPattern::Random => {
            let mut lcg = FillLcg::with_seed((page_index * crate::util::PAGE_SIZE) as u64);
            for word in out.chunks_exact_mut(4) {
                word.copy_from_slice(&lcg.next_word().to_ne_bytes());
            }
        }
        DataPattern::Zeroes => {
            out.fill(0);
        }
        DataPattern::Ones => {
            for word in out.chunks_exact_mut(4) {
                word.copy_from_slice(&1u32.to_ne_bytes());
            }
        }
    }
}

/// Represents a bit flip detected in memory.
///
/// A bit flip is a change in memory where one or more bits differ from their
/// expected value. This is the primary indicator of a successful Rowhammer
/// attack.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BitFlip {
    /// Virtual address of the corrupted byte
    pub addr: usize,
    /// Bitmask indicating which bits flipped (1 = bit flipped)
    pub bitmask: u8,
    /// The observed (corrupted) data value
    pub data: u8,
}

impl core::fmt::Debug for BitFlip {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitFlip")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("bitmask", &format_args!("{:#x}", self.bitmask))
            .field("data", &format_args!("{:#x}", self.data))
            .finish()
    }
}

impl BitFlip {
    /// Constructor for BitFlip. `data` is the observed value, `bitmask` is
    /// `expected ^ observed`.
    pub fn new(addr: *const u8, bitmask: u8, data: u8) -> Self {
        BitFlip {
            addr: addr as usize,
            bitmask,
            data,
        }
    }

    /// Number of individual corrupted bits in this byte.
    pub fn count_bit_corruptions(&self) -> usize {
        self.bitmask.count_ones() as usize
    }

    /// Number of bits that flipped from 0 to 1.
    pub fn count_z2o_corruptions(&self) -> usize {
        (self.bitmask & self.data).count_ones() as usize
    }

    /// Number of bits that flipped from 1 to 0.
    pub fn count_o2z_corruptions(&self) -> usize {
        (self.bitmask & !self.data).count_ones() as usize
    }

    /// Calculate the FlipDirection (1->0 or 0->1 or Multiple) observed in this BitFlip
    pub fn flip_direction(&self) -> FlipDirection {
        match self.bitmask.count_ones() {
            0 => FlipDirection::None,
            1 => {
                let flipped = self.bitmask & self.data;
                match flipped {
                    0 => FlipDirection::OneToZero,
                    _ => FlipDirection::ZeroToOne,
                }
            }
            2.. => FlipDirection::Multiple(
                (0..8)
                    .filter_map(|i| {
                        if self.bitmask & (1 << i) != 0 {
                            Some(if self.data & (1 << i) != 0 {
                                FlipDirection::ZeroToOne
                            } else {
                                FlipDirection::OneToZero
                            })
                        } else {
                            None
                        }
                    })
                    .collect(),
            ),
        }
    }
}

/// Direction of bit flip transitions.
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub enum FlipDirection {
    /// Bit flipped from 0 to 1
    ZeroToOne,
    /// Bit flipped from 1 to 0
    OneToZero,
    /// Multiple bits flipped in (potentially) different directions
    Multiple(Vec<FlipDirection>),
    /// No bit flip occurred
    None,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::PAGE_SIZE;

    #[test]
    fn test_fill_is_reproducible() {
        let mut a = vec![0u8; PAGE_SIZE];
        let mut b = vec![0u8; PAGE_SIZE];
        expected_page(DataPattern::Random, 7, &mut a);
        expected_page(DataPattern::Random, 7, &mut b);
        assert_eq!(a, b);
        expected_page(DataPattern::Random, 8, &mut b);
        assert_ne!(a, b, "different pages must differ");
    }

    #[test]
    fn test_constant_fills() {
        let mut buf = vec![0xAAu8; 16];
        expected_page(DataPattern::Zeroes, 3, &mut buf);
        assert!(buf.iter().all(|&b| b == 0));
        expected_page(DataPattern::Ones, 3, &mut buf);
        for word in buf.chunks_exact(4) {
            assert_eq!(u32::from_ne_bytes(word.try_into().unwrap()), 1);
        }
    }

    #[test]
    fn test_bitflip_direction() {
        let flip = BitFlip::new(std::ptr::null(), 0b0000_0000, 0xFF);
        assert_eq!(flip.flip_direction(), FlipDirection::None);

        // observed bit set where expected had it clear -> 0 -> 1
        let flip = BitFlip::new(std::ptr::null(), 0b0000_0001, 0b0000_0001);
        assert_eq!(flip.flip_direction(), FlipDirection::ZeroToOne);

        // observed bit clear where expected had it set -> 1 -> 0
        let flip = BitFlip::new(std::ptr::null(), 0b0000_0001, 0b1111_1110);
        assert_eq!(flip.flip_direction(), FlipDirection::OneToZero);

        let flip = BitFlip::new(std::ptr::null(), 0b0000_0011, 0b0000_0010);
        assert_eq!(
            flip.flip_direction(),
            FlipDirection::Multiple(vec![FlipDirection::OneToZero, FlipDirection::ZeroToOne])
        );
    }

    #[test]
    fn test_corruption_counts() {
        let flip = BitFlip::new(std::ptr::null(), 0b0000_0011, 0b0000_0010);
        assert_eq!(flip.count_bit_corruptions(), 2);
        assert_eq!(flip.count_z2o_corruptions(), 1);
        assert_eq!(flip.count_o2z_corruptions(), 1);
    }
}
