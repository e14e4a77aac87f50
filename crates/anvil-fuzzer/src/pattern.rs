//! Hammering pattern templates.
//!
//! A [`HammeringPattern`] is an abstract access schedule: a flat vector of
//! slots over `num_refresh_intervals` refresh intervals, each slot naming an
//! [`Aggressor`] id (or still unfilled). The concrete DRAM rows behind the
//! ids are bound later by the address mapper, so one template can be probed
//! at many memory locations.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::mapper::PatternAddressMapping;
use anvil_core::util::RunRng;

/// Dense handle for one aggressor row in a pattern.
///
/// Ids are plain indices; the binding to a DRAM row lives in the
/// address mapping, never in the pattern itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Aggressor(pub u32);

/// One periodic component of a hammering pattern.
///
/// Describes `aggressors` being accessed `amplitude` times in a row, every
/// `frequency` slots, starting at slot `start_offset` of the base period.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggressorAccessPattern {
    /// Period of this component in slots (a multiple of the base period)
    pub frequency: usize,
    /// Consecutive repetitions of the aggressor tuple per occurrence
    pub amplitude: usize,
    /// Phase within the base period
    pub start_offset: usize,
    /// The aggressor tuple, in access order
    pub aggressors: Vec<Aggressor>,
}

impl AggressorAccessPattern {
    /// Number of slots one occurrence of this component covers.
    pub fn occurrence_len(&self) -> usize {
        self.aggressors.len() * self.amplitude
    }
}

mod slot_serde {
    //! Slots serialize as flat signed ids with -1 for unfilled, which keeps
    //! the archive schema stable and readable.
    use super::Aggressor;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        slots: &[Option<Aggressor>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            slots
                .iter()
                .map(|slot| slot.map_or(-1i64, |agg| agg.0 as i64)),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Option<Aggressor>>, D::Error> {
        let raw: Vec<i64> = Vec::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|id| (id >= 0).then(|| Aggressor(id as u32)))
            .collect())
    }
}

/// An abstract hammering pattern over aggressor ids.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct HammeringPattern {
    /// Unique id of this pattern instance
    pub id: String,
    /// Smallest repeat unit of the pattern, in slots
    pub base_period: usize,
    /// Largest component period occurring in the pattern
    pub max_period: usize,
    /// Total number of slots (`base_period * num_refresh_intervals`)
    pub total_activations: usize,
    /// Number of refresh intervals the pattern spans
    pub num_refresh_intervals: usize,
    /// The access schedule; `None` marks a slot not filled yet
    #[serde(rename = "access_ids", with = "slot_serde")]
    pub accesses: Vec<Option<Aggressor>>,
    /// Structured description of how the slots were filled
    pub agg_access_patterns: Vec<AggressorAccessPattern>,
    /// Address bindings this pattern has been probed with
    pub address_mappings: Vec<PatternAddressMapping>,
}

/// Generates a random 128-bit instance id in UUID-like formatting.
pub fn gen_instance_id(rng: &mut RunRng) -> String {
    let (hi, lo) = (rng.next_u64(), rng.next_u64());
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (hi >> 32) as u32,
        (hi >> 16) & 0xffff,
        hi & 0xffff,
        (lo >> 48) & 0xffff,
        lo & 0xffff_ffff_ffff
    )
}

impl HammeringPattern {
    /// Creates an empty pattern for the given base period.
    pub fn new(base_period: usize, rng: &mut RunRng) -> Self {
        HammeringPattern {
            id: gen_instance_id(rng),
            base_period,
            ..Default::default()
        }
    }

    /// Returns true when no slot is unfilled.
    pub fn is_fully_filled(&self) -> bool {
        self.accesses.iter().all(|slot| slot.is_some())
    }

    /// Finds the component that accesses the given aggressor.
    pub fn access_pattern_by_aggressor(
        &self,
        aggressor: Aggressor,
    ) -> Option<&AggressorAccessPattern> {
        self.agg_access_patterns
            .iter()
            .find(|aap| aap.aggressors.contains(&aggressor))
    }

    /// The mapping that produced the most bit flips, if any mapping was
    /// probed.
    pub fn most_effective_mapping(&self) -> Option<&PatternAddressMapping> {
        self.address_mappings
            .iter()
            .max_by_key(|mapping| mapping.count_bitflips())
    }

    /// Sum of bit flips over all probed mappings; the metric that picks the
    /// best pattern of a fuzzing run.
    pub fn total_bitflips(&self) -> usize {
        self.address_mappings
            .iter()
            .map(|mapping| mapping.count_bitflips())
            .sum()
    }

    /// One text line per base period, for the log.
    pub fn text_repr(&self) -> String {
        let mut out = String::new();
        for (i, slot) in self.accesses.iter().enumerate() {
            if i != 0 && i.is_multiple_of(self.base_period) {
                out.push('\n');
            }
            match slot {
                Some(agg) => out.push_str(&format!("{} ", agg.0)),
                None => out.push_str("_ "),
            }
        }
        out
    }
}

/// Writes `aggressors` into `accesses` at every slot the component
/// `(start_period, period_length, amplitude)` describes.
///
/// Slot index formula: `start_period + j*period_length + k*|aggressors| + q`
/// for period number `j`, repetition `k` and tuple position `q`, bounded by
/// `accesses.len()`. The index is not monotonic across loop levels, so each
/// level breaks on the first out-of-bounds index instead of returning.
pub fn fill_slots(
    start_period: usize,
    period_length: usize,
    amplitude: usize,
    aggressors: &[Aggressor],
    accesses: &mut [Option<Aggressor>],
) {
    let pattern_length = accesses.len();
    for period in (start_period..pattern_length).step_by(period_length) {
        for amp in 0..amplitude {
            if period + aggressors.len() * amp >= pattern_length {
                break;
            }
            for (agg_idx, &agg) in aggressors.iter().enumerate() {
                let next_target = period + aggressors.len() * amp + agg_idx;
                if next_target >= pattern_length {
                    break;
                }
                accesses[next_target] = Some(agg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_slots_writes_exactly_the_described_slots() {
        let aggs = [Aggressor(1), Aggressor(2)];
        let mut accesses = vec![None; 64];
        fill_slots(4, 16, 3, &aggs, &mut accesses);

        let expected: Vec<usize> = vec![
            4, 5, 6, 7, 8, 9, // period 0, three repetitions
            20, 21, 22, 23, 24, 25, // period 1
            36, 37, 38, 39, 40, 41, // period 2
            52, 53, 54, 55, 56, 57, // period 3
        ];
        for (i, slot) in accesses.iter().enumerate() {
            if expected.contains(&i) {
                let want = if (i - 4) % 2 == 0 { 1 } else { 2 };
                assert_eq!(*slot, Some(Aggressor(want)), "slot {i}");
            } else {
                assert_eq!(*slot, None, "slot {i} must stay unfilled");
            }
        }
    }

    #[test]
    fn fill_slots_respects_pattern_bounds() {
        let aggs = [Aggressor(1), Aggressor(2), Aggressor(3)];
        let mut accesses = vec![None; 8];
        fill_slots(6, 4, 2, &aggs, &mut accesses);
        // only slots 6 and 7 fit
        assert_eq!(accesses[6], Some(Aggressor(1)));
        assert_eq!(accesses[7], Some(Aggressor(2)));
        assert!(accesses[..6].iter().all(|s| s.is_none()));
    }

    #[test]
    fn instance_ids_are_unique_and_shaped() {
        let mut rng = RunRng::seeded(1);
        let a = gen_instance_id(&mut rng);
        let b = gen_instance_id(&mut rng);
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.split('-').count(), 5);
    }

    #[test]
    fn slot_serde_roundtrip() {
        let mut rng = RunRng::seeded(7);
        let mut pattern = HammeringPattern::new(4, &mut rng);
        pattern.accesses = vec![Some(Aggressor(3)), None, Some(Aggressor(1))];
        let json = serde_json::to_string(&pattern).unwrap();
        assert!(json.contains("\"access_ids\":[3,-1,1]"));
        let back: HammeringPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back.accesses, pattern.accesses);
    }
}
