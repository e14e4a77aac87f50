//! Binding abstract aggressor ids to concrete DRAM rows.
//!
//! A [`PatternAddressMapping`] is one placement of a pattern's aggressors
//! into a bank: rows are assigned walking the components in (shuffled) order,
//! spaced by the drawn inter/intra distances, or picked uniformly from a
//! window when the mapping is non-sequential. The mapping also derives the
//! victim rows to scan and exports the pattern as a flat access sequence with
//! fences placed per a [`SchedulingPolicy`].

use std::collections::{HashMap, HashSet};

use log::{info, warn};
use rand::Rng as _;
use rand::seq::SliceRandom as _;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::params::FuzzingParameterSet;
use crate::pattern::{Aggressor, AggressorAccessPattern, HammeringPattern, gen_instance_id};
use anvil_core::dram::{AddressModel, DramAddr, Microarchitecture};
use anvil_core::memory::AggressorPtr;
use anvil_core::util::RunRng;

/// Rows a non-sequential mapping may scatter its aggressors over, counted
/// from the start row.
const ROW_WINDOW: usize = 256;

/// Distance (in rows) around an aggressor considered at risk of flipping.
const VICTIM_RADIUS: usize = 5;

/// Retries before a row collision is accepted.
const ASSIGNMENT_RETRIES: usize = 7;

/// Where the exporter places fences in the flat access sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    /// No extra fences
    None,
    /// Fence between every access
    Full,
    /// Fence at the end of each base period
    BasePeriod,
    /// Fence twice per base period
    HalfBasePeriod,
    /// Fence between aggressor tuples
    Pair,
    /// Fence between amplitude repetitions
    Rep,
    /// Microarchitecture-specific default
    Default,
}

impl SchedulingPolicy {
    /// Resolves [`SchedulingPolicy::Default`] for the given
    /// microarchitecture. Zen memory controllers reorder aggressively and
    /// need per-tuple fences; Coffee Lake hammers best without any.
    pub fn resolve(self, uarch: Microarchitecture) -> SchedulingPolicy {
        match self {
            SchedulingPolicy::Default => match uarch {
                Microarchitecture::CoffeeLake => SchedulingPolicy::None,
                _ => SchedulingPolicy::Pair,
            },
            other => other,
        }
    }
}

/// One element of an exported access sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternStep {
    /// Access (activate) this address
    Access(AggressorPtr),
    /// Serialize here, with the fence type chosen at run level
    Fence,
}

/// A bit flip observed while a pattern ran with a specific mapping, recorded
/// in DRAM coordinates for the archive.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlipRecord {
    /// Where the flip happened
    pub dram_addr: DramAddr,
    /// Which bits flipped (`expected ^ observed`)
    pub bitmask: u8,
    /// The observed (corrupted) byte
    pub data: u8,
}

/// One binding of a pattern's aggressor ids to DRAM rows.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatternAddressMapping {
    /// Unique id of this mapping instance
    pub id: String,
    /// Bank all aggressors of this mapping live in
    pub bank_no: usize,
    /// Smallest assigned row
    pub min_row: usize,
    /// Largest assigned row
    pub max_row: usize,
    /// The binding itself
    #[serde_as(as = "Vec<(_, _)>")]
    pub aggressor_to_addr: HashMap<Aggressor, DramAddr>,
    /// Bit flips observed while hammering with this mapping
    pub bit_flips: Vec<FlipRecord>,
    /// Fraction of reproducibility runs that flipped at least one bit
    pub reproducibility_score: Option<f64>,
    /// Victim rows to scan after hammering (derived, not serialized)
    #[serde(skip)]
    victim_rows: Vec<DramAddr>,
}

impl PatternAddressMapping {
    /// Creates an empty mapping with a fresh instance id.
    pub fn new(rng: &mut RunRng) -> Self {
        PatternAddressMapping {
            id: gen_instance_id(rng),
            ..Default::default()
        }
    }

    /// Assigns a DRAM row to every aggressor of the given components.
    ///
    /// Components should be pre-shuffled by the caller so that low ids do not
    /// correlate with low rows. Within a component, the first aggressor
    /// advances the row cursor by a per-component inter-distance (or jumps to
    /// a uniformly drawn row in `[start_row, start_row + ROW_WINDOW]` for
    /// non-sequential mappings); subsequent aggressors sit at the fixed
    /// intra-distance. Row collisions are retried a few times, then accepted
    /// and logged.
    pub fn randomize_addresses(
        &mut self,
        params: &FuzzingParameterSet,
        components: &[AggressorAccessPattern],
        rng: &mut RunRng,
    ) {
        self.aggressor_to_addr.clear();

        let bank_no = params.random_bank_no(rng);
        let use_sequential = params.random_use_seq_addresses(rng);
        let start_row = params.random_start_row(rng);
        let max_row = params.max_row_no();
        info!(
            "mapping {}: bank {}, start row {}, {} addresses",
            self.id,
            bank_no,
            start_row,
            if use_sequential { "sequential" } else { "scattered" }
        );

        self.bank_no = bank_no;
        let mut cur_row = start_row;
        let mut occupied_rows: HashSet<usize> = HashSet::new();

        for component in components {
            let inter_distance = params.random_inter_distance(rng);
            for (i, &aggressor) in component.aggressors.iter().enumerate() {
                if self.aggressor_to_addr.contains_key(&aggressor) {
                    continue;
                }
                let row = if i > 0 {
                    // partner in a tuple: fixed distance to the previous one
                    let prev = self.aggressor_to_addr[&component.aggressors[i - 1]];
                    cur_row = (prev.row + params.agg_intra_distance()) % max_row;
                    cur_row
                } else {
                    cur_row = (cur_row + inter_distance) % max_row;
                    let mut row = cur_row;
                    if !use_sequential {
                        for trial in 0.. {
                            row = (start_row + rng.random_range(0..=ROW_WINDOW)) % max_row;
                            if !occupied_rows.contains(&row) {
                                break;
                            }
                            if trial >= ASSIGNMENT_RETRIES {
                                warn!(
                                    "no free row for aggressor {:?} after {} trials, accepting collision",
                                    aggressor, ASSIGNMENT_RETRIES
                                );
                                break;
                            }
                        }
                    }
                    row
                };

                occupied_rows.insert(row);
                self.aggressor_to_addr
                    .insert(aggressor, DramAddr::new(bank_no, row, 0));
            }
        }

        self.min_row = self
            .aggressor_to_addr
            .values()
            .map(|addr| addr.row)
            .min()
            .unwrap_or(0);
        self.max_row = self
            .aggressor_to_addr
            .values()
            .map(|addr| addr.row)
            .max()
            .unwrap_or(0);

        self.determine_victims(components);
        info!(
            "assigned {} aggressors to rows [{}, {}], {} victim rows",
            self.aggressor_to_addr.len(),
            self.min_row,
            self.max_row,
            self.victim_rows.len()
        );
    }

    /// Recomputes the victim rows: everything within [`VICTIM_RADIUS`] rows
    /// of any assigned aggressor, the aggressor rows themselves excluded.
    pub fn determine_victims(&mut self, components: &[AggressorAccessPattern]) {
        let aggressor_rows: HashSet<usize> = components
            .iter()
            .flat_map(|component| &component.aggressors)
            .filter_map(|aggressor| self.aggressor_to_addr.get(aggressor))
            .map(|addr| addr.row)
            .collect();

        let mut victim_rows: HashSet<usize> = HashSet::new();
        for &row in &aggressor_rows {
            for offset in 1..=VICTIM_RADIUS {
                victim_rows.insert(row.wrapping_add(offset));
                victim_rows.insert(row.wrapping_sub(offset));
            }
        }
        victim_rows.retain(|row| !aggressor_rows.contains(row));

        let mut rows: Vec<usize> = victim_rows.into_iter().collect();
        rows.sort_unstable();
        self.victim_rows = rows
            .into_iter()
            .map(|row| DramAddr::new(self.bank_no, row, 0))
            .collect();
    }

    /// The rows the scanner checks for this mapping.
    pub fn victim_rows(&self) -> &[DramAddr] {
        &self.victim_rows
    }

    /// Total number of recorded bit flips.
    pub fn count_bitflips(&self) -> usize {
        self.bit_flips.len()
    }

    /// Looks up the concrete address an aggressor was bound to.
    pub fn addr_of(&self, aggressor: Aggressor) -> Option<&DramAddr> {
        self.aggressor_to_addr.get(&aggressor)
    }

    /// Exports the pattern as a flat access sequence in slot order, fences
    /// placed per `policy`.
    ///
    /// Slots whose aggressor has no binding are logged and skipped; they make
    /// the run less precise but not useless.
    pub fn export_pattern(
        &self,
        pattern: &HammeringPattern,
        policy: SchedulingPolicy,
        model: &AddressModel,
    ) -> Vec<PatternStep> {
        let policy = policy.resolve(model.config().uarch);
        let owners = slot_owners(pattern);
        let base_period = pattern.base_period.max(1);
        let half_period = (base_period / 2).max(1);

        let mut steps = Vec::with_capacity(pattern.accesses.len() * 2);
        let mut unknown_ids: HashSet<Aggressor> = HashSet::new();

        for (slot, entry) in pattern.accesses.iter().enumerate() {
            let Some(aggressor) = entry else {
                warn!("slot {} is unfilled, skipping", slot);
                continue;
            };
            match self.aggressor_to_addr.get(aggressor) {
                Some(dram_addr) => steps.push(PatternStep::Access(model.to_virt(dram_addr))),
                None => {
                    if unknown_ids.insert(*aggressor) {
                        warn!(
                            "no address bound for aggressor {:?} (slot {}), skipping its accesses",
                            aggressor, slot
                        );
                    }
                    continue;
                }
            }

            let fence_here = match policy {
                SchedulingPolicy::None => false,
                SchedulingPolicy::Full => true,
                SchedulingPolicy::BasePeriod => (slot + 1).is_multiple_of(base_period),
                SchedulingPolicy::HalfBasePeriod => (slot + 1).is_multiple_of(half_period),
                SchedulingPolicy::Pair => match (owners.get(&slot), owners.get(&(slot + 1))) {
                    (Some(current), Some(next)) => current.0 != next.0,
                    _ => true,
                },
                SchedulingPolicy::Rep => match (owners.get(&slot), owners.get(&(slot + 1))) {
                    (Some(current), Some(next)) => {
                        current.0 != next.0 || current.1 / tuple_len(pattern, current.0) != next.1 / tuple_len(pattern, next.0)
                    }
                    _ => true,
                },
                SchedulingPolicy::Default => unreachable!("resolved above"),
            };
            if fence_here {
                steps.push(PatternStep::Fence);
            }
        }
        steps
    }

    /// Moves every aggressor of the given components by `delta` rows,
    /// refreshing the victim set and row bounds. Used for sweeping a pattern
    /// across memory.
    pub fn shift_mapping(&mut self, delta: isize, components: &[AggressorAccessPattern]) {
        let moved: HashSet<Aggressor> = components
            .iter()
            .flat_map(|component| component.aggressors.iter().copied())
            .collect();
        for (aggressor, addr) in self.aggressor_to_addr.iter_mut() {
            if moved.contains(aggressor) {
                addr.row = addr.row.wrapping_add_signed(delta);
            }
        }
        self.min_row = self.min_row.wrapping_add_signed(delta);
        self.max_row = self.max_row.wrapping_add_signed(delta);
        self.determine_victims(components);
    }

    /// A set of rows in this bank that do not belong to the mapping, used
    /// for filler accesses between hammering runs.
    pub fn random_nonaccessed_rows(
        &self,
        max_row: usize,
        model: &AddressModel,
        rng: &mut RunRng,
    ) -> Vec<AggressorPtr> {
        const NUM_FILLER_ROWS: usize = 32;
        let forbidden_low = self.min_row.saturating_sub(VICTIM_RADIUS);
        let forbidden_high = self.max_row + VICTIM_RADIUS;
        let mut rows = Vec::with_capacity(NUM_FILLER_ROWS);
        while rows.len() < NUM_FILLER_ROWS {
            let row = rng.random_range(0..max_row);
            if (forbidden_low..=forbidden_high).contains(&row) {
                continue;
            }
            rows.push(model.to_virt(&DramAddr::new(self.bank_no, row, 0)));
        }
        rows
    }
}

/// Maps each filled slot to (component index, position within the
/// component's per-occurrence block).
fn slot_owners(pattern: &HammeringPattern) -> HashMap<usize, (usize, usize)> {
    let mut owners = HashMap::new();
    let pattern_length = pattern.accesses.len();
    for (component_idx, aap) in pattern.agg_access_patterns.iter().enumerate() {
        let tuple = aap.aggressors.len();
        for period in (aap.start_offset..pattern_length).step_by(aap.frequency) {
            for amp in 0..aap.amplitude {
                if period + tuple * amp >= pattern_length {
                    break;
                }
                for agg_idx in 0..tuple {
                    let slot = period + tuple * amp + agg_idx;
                    if slot >= pattern_length {
                        break;
                    }
                    owners.insert(slot, (component_idx, tuple * amp + agg_idx));
                }
            }
        }
    }
    owners
}

fn tuple_len(pattern: &HammeringPattern, component_idx: usize) -> usize {
    pattern.agg_access_patterns[component_idx]
        .aggressors
        .len()
        .max(1)
}

/// Shuffles the components of a pattern; the mapper assigns rows in walk
/// order, so shuffling decorrelates aggressor ids from row order.
pub fn shuffle_components(pattern: &mut HammeringPattern, rng: &mut RunRng) {
    pattern.agg_access_patterns.shuffle(rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PatternBuilder;
    use anvil_core::dram::{DramConfig, RowMapping};

    fn test_model() -> AddressModel {
        let config =
            DramConfig::select(Microarchitecture::CoffeeLake, 1, 4, 4, RowMapping::Sequential)
                .unwrap();
        let mut model = AddressModel::new(config);
        model.initialize_mapping(0, 0x2000000000usize as *const u8);
        model
    }

    fn built_pattern(seed: u64) -> (HammeringPattern, FuzzingParameterSet, RunRng) {
        let mut rng = RunRng::seeded(seed);
        let params = FuzzingParameterSet::new(100, 8192, 16, &mut rng);
        let mut pattern = HammeringPattern::new(params.base_period(), &mut rng);
        PatternBuilder::new(&mut pattern)
            .generate_frequency_based_pattern(&params, &mut rng)
            .unwrap();
        (pattern, params, rng)
    }

    #[test]
    fn every_aggressor_gets_an_address_in_one_bank() {
        let (pattern, params, mut rng) = built_pattern(1);
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        for aap in &pattern.agg_access_patterns {
            for aggressor in &aap.aggressors {
                let addr = mapping.addr_of(*aggressor).expect("address bound");
                assert_eq!(addr.bank, mapping.bank_no);
            }
        }
        assert!(mapping.min_row <= mapping.max_row);
    }

    #[test]
    fn tuple_partners_sit_at_intra_distance() {
        let (pattern, params, mut rng) = built_pattern(2);
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        for aap in &pattern.agg_access_patterns {
            for pair in aap.aggressors.windows(2) {
                let first = mapping.addr_of(pair[0]).unwrap().row;
                let second = mapping.addr_of(pair[1]).unwrap().row;
                assert_eq!(
                    second,
                    (first + params.agg_intra_distance()) % params.max_row_no()
                );
            }
        }
    }

    #[test]
    fn victims_surround_aggressors_without_overlapping_them() {
        let (pattern, params, mut rng) = built_pattern(3);
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        let aggressor_rows: HashSet<usize> = pattern
            .agg_access_patterns
            .iter()
            .flat_map(|aap| &aap.aggressors)
            .map(|agg| mapping.addr_of(*agg).unwrap().row)
            .collect();

        assert!(!mapping.victim_rows().is_empty());
        for victim in mapping.victim_rows() {
            assert!(!aggressor_rows.contains(&victim.row));
            assert!(
                aggressor_rows
                    .iter()
                    .any(|&row| victim.row.abs_diff(row) <= VICTIM_RADIUS)
            );
        }
    }

    #[test]
    fn export_resolves_every_slot() {
        let (pattern, params, mut rng) = built_pattern(4);
        let model = test_model();
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        let steps = mapping.export_pattern(&pattern, SchedulingPolicy::None, &model);
        let accesses = steps
            .iter()
            .filter(|step| matches!(step, PatternStep::Access(_)))
            .count();
        assert_eq!(accesses, pattern.accesses.len());
        assert!(!steps.contains(&PatternStep::Fence));
    }

    #[test]
    fn export_full_fences_after_every_access() {
        let (pattern, params, mut rng) = built_pattern(5);
        let model = test_model();
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        let steps = mapping.export_pattern(&pattern, SchedulingPolicy::Full, &model);
        let fences = steps.iter().filter(|s| matches!(s, PatternStep::Fence)).count();
        assert_eq!(fences, pattern.accesses.len());
    }

    #[test]
    fn export_base_period_fences_once_per_period() {
        let (pattern, params, mut rng) = built_pattern(6);
        let model = test_model();
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        let steps = mapping.export_pattern(&pattern, SchedulingPolicy::BasePeriod, &model);
        let fences = steps.iter().filter(|s| matches!(s, PatternStep::Fence)).count();
        assert_eq!(fences, pattern.accesses.len() / pattern.base_period);
    }

    #[test]
    fn export_skips_unbound_aggressors() {
        let (pattern, params, mut rng) = built_pattern(7);
        let model = test_model();
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        // unbind one aggressor
        let victim_aggressor = pattern.agg_access_patterns[0].aggressors[0];
        let removed_slots = pattern
            .accesses
            .iter()
            .filter(|slot| **slot == Some(victim_aggressor))
            .count();
        mapping.aggressor_to_addr.remove(&victim_aggressor);

        let steps = mapping.export_pattern(&pattern, SchedulingPolicy::None, &model);
        let accesses = steps
            .iter()
            .filter(|step| matches!(step, PatternStep::Access(_)))
            .count();
        assert_eq!(accesses, pattern.accesses.len() - removed_slots);
    }

    #[test]
    fn shift_mapping_roundtrips() {
        let (pattern, params, mut rng) = built_pattern(8);
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        let original = mapping.aggressor_to_addr.clone();
        mapping.shift_mapping(3, &pattern.agg_access_patterns);
        for (aggressor, addr) in &mapping.aggressor_to_addr {
            assert_eq!(addr.row, original[aggressor].row.wrapping_add(3));
        }
        mapping.shift_mapping(-3, &pattern.agg_access_patterns);
        assert_eq!(mapping.aggressor_to_addr, original);
    }

    #[test]
    fn filler_rows_avoid_the_mapping() {
        let (pattern, params, mut rng) = built_pattern(9);
        let model = test_model();
        let mut mapping = PatternAddressMapping::new(&mut rng);
        mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);

        let rows = mapping.random_nonaccessed_rows(params.max_row_no(), &model, &mut rng);
        assert_eq!(rows.len(), 32);
        for ptr in rows {
            let addr = model.from_virt(ptr, 0);
            assert!(addr.row < mapping.min_row.saturating_sub(VICTIM_RADIUS) || addr.row > mapping.max_row + VICTIM_RADIUS);
        }
    }
}
