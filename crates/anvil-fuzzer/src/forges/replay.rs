//! Replaying archived patterns and profiling their effectiveness.

use std::collections::HashSet;
use std::path::Path;

use log::{info, warn};

use super::{ForgeConfig, ForgeContext, ForgeError, ProbeExecutor};
use crate::archive;
use crate::hammer::HammerError;
use crate::mapper::PatternAddressMapping;
use crate::params::FuzzingParameterSet;
use crate::pattern::HammeringPattern;
use crate::scanner;
use anvil_core::util::ROW_SIZE;

/// Memory span the post-fuzzing sweep walks the best pattern over (256 MiB).
pub const SWEEP_BYTES: usize = 256 << 20;

/// Rows swept in each direction by the replay mini-sweep.
const MINISWEEP_ROWS: isize = 5;

/// Activation budgets probed systematically, as quarters of the configured
/// total.
const ACTIVATION_STEPS: [usize; 5] = [2, 3, 4, 5, 6];

/// One data point of an effectiveness profile.
#[derive(Debug, Clone)]
pub struct ProfilePoint {
    /// Whether the run re-synced at every REF
    pub sync_each_ref: bool,
    /// Sync rows timed per sync round
    pub num_aggs_for_sync: usize,
    /// Activation budget of the run
    pub total_activations: usize,
    /// Bits flipped
    pub flips: usize,
}

/// Replays the archived patterns with the given ids (all patterns when the
/// id set is empty).
///
/// For each pattern the mapping that historically flipped the most bits is
/// re-hammered, then systematically profiled over {sync per REF} ×
/// {sync aggressor count} × {activation budget}, and finally mini-swept over
/// neighboring rows.
///
/// # Errors
///
/// Archive and emission failures; per-run sync timeouts are logged and the
/// profile point records zero flips.
pub fn replay_patterns(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &mut FuzzingParameterSet,
    archive_path: &Path,
    pattern_ids: &HashSet<String>,
) -> Result<(), ForgeError> {
    let patterns = archive::filter_patterns(archive::load_patterns(archive_path)?, pattern_ids);
    if patterns.is_empty() {
        warn!("no matching patterns in {}", archive_path.display());
        return Ok(());
    }
    if ctx.model.config().row_mapping == anvil_core::dram::RowMapping::Samsung {
        // the bank-translation tables are measured per run; whether they are
        // consistent across the device's row remapping is unverified
        warn!("replaying under Samsung row remapping; cross-mapping REF sync is best-effort");
    }

    for pattern in &patterns {
        let Some(mapping) = pattern.most_effective_mapping() else {
            warn!("pattern {} has no mappings, skipping", pattern.id);
            continue;
        };
        let mut mapping = mapping.clone();
        // victim rows are derived state and not archived
        mapping.determine_victims(&pattern.agg_access_patterns);
        info!(
            "replaying pattern {} with mapping {} ({} archived flips)",
            pattern.id,
            mapping.id,
            mapping.count_bitflips()
        );

        let profile = profile_pattern(ctx, config, params, pattern, &mapping)?;
        for point in &profile {
            info!(
                "  profile: sync_each_ref={} aggs_for_sync={} budget={} -> {} flips",
                point.sync_each_ref, point.num_aggs_for_sync, point.total_activations, point.flips
            );
        }

        sweep_pattern_rows(ctx, config, params, pattern, mapping.clone())?;
    }
    Ok(())
}

/// Runs the systematic probe grid for one (pattern, mapping) pair.
fn profile_pattern(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &FuzzingParameterSet,
    pattern: &HammeringPattern,
    mapping: &PatternAddressMapping,
) -> Result<Vec<ProfilePoint>, ForgeError> {
    let steps = mapping.export_pattern(pattern, config.scheduling_policy, ctx.model);
    let base_budget = params.hammering_total_num_activations();
    let mut profile = Vec::new();

    for sync_each_ref in [false, true] {
        for num_aggs_for_sync in [1usize, 2] {
            for step in ACTIVATION_STEPS {
                let total_activations = base_budget / 4 * step;
                let sync = ctx.sync_config(sync_each_ref, num_aggs_for_sync);
                let executor =
                    ProbeExecutor::new(config, steps.clone(), sync, total_activations as u64)?;

                let mut probe_mapping = mapping.clone();
                probe_mapping.determine_victims(&pattern.agg_access_patterns);
                let flips = match executor.run() {
                    Ok(_) => scanner::check(
                        ctx.region,
                        ctx.model,
                        ctx.mapping_id,
                        &mut probe_mapping,
                        config.data_pattern,
                        true,
                    ),
                    Err(HammerError::SyncTimeout { .. }) => {
                        warn!("profile point timed out, recording 0 flips");
                        0
                    }
                    Err(e) => {
                        warn!("profile point failed ({}), recording 0 flips", e);
                        0
                    }
                };
                profile.push(ProfilePoint {
                    sync_each_ref,
                    num_aggs_for_sync,
                    total_activations,
                    flips,
                });
            }
        }
    }
    Ok(profile)
}

/// Mini-sweep around the archived location: ±[`MINISWEEP_ROWS`] rows.
fn sweep_pattern_rows(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &FuzzingParameterSet,
    pattern: &HammeringPattern,
    mut mapping: PatternAddressMapping,
) -> Result<(), ForgeError> {
    info!(
        "mini-sweeping pattern {} over ±{} rows",
        pattern.id, MINISWEEP_ROWS
    );
    mapping.shift_mapping(-MINISWEEP_ROWS, &pattern.agg_access_patterns);
    for shift in -MINISWEEP_ROWS..=MINISWEEP_ROWS {
        let flips = hammer_mapping_once(ctx, config, params, pattern, &mut mapping)?;
        info!("  shift {:+} rows -> {} flips", shift, flips);
        mapping.shift_mapping(1, &pattern.agg_access_patterns);
    }
    Ok(())
}

/// Sweeps a (pattern, mapping) pair forward one row at a time over
/// `sweep_bytes` worth of rows, logging flips per shift.
///
/// # Errors
///
/// Emission failures only; timed-out runs count zero flips.
pub fn sweep_pattern(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &FuzzingParameterSet,
    pattern: &HammeringPattern,
    mut mapping: PatternAddressMapping,
    sweep_bytes: usize,
) -> Result<Vec<(isize, usize)>, ForgeError> {
    let banks = ctx.model.config().banks();
    let num_shifts = sweep_bytes / (ROW_SIZE * banks);
    info!(
        "sweeping pattern {} (mapping {}) over {} rows",
        pattern.id, mapping.id, num_shifts
    );
    mapping.determine_victims(&pattern.agg_access_patterns);

    let mut flips_per_shift = Vec::with_capacity(num_shifts);
    let mut total_flips = 0usize;
    for shift in 0..num_shifts as isize {
        let flips = hammer_mapping_once(ctx, config, params, pattern, &mut mapping)?;
        total_flips += flips;
        if flips > 0 {
            info!("  shift {:+} rows -> {} flips", shift, flips);
        }
        flips_per_shift.push((shift, flips));
        mapping.shift_mapping(1, &pattern.agg_access_patterns);
    }
    info!("sweep done: {} flips over {} rows", total_flips, num_shifts);
    Ok(flips_per_shift)
}

/// Hammers the mapping at its current location once and counts flips without
/// recording them.
fn hammer_mapping_once(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &FuzzingParameterSet,
    pattern: &HammeringPattern,
    mapping: &mut PatternAddressMapping,
) -> Result<usize, ForgeError> {
    let steps = mapping.export_pattern(pattern, config.scheduling_policy, ctx.model);
    let sync = ctx.sync_config(false, 2);
    let executor = ProbeExecutor::new(
        config,
        steps,
        sync,
        params.hammering_total_num_activations() as u64,
    )?;
    match executor.run() {
        Ok(_) => Ok(scanner::check(
            ctx.region,
            ctx.model,
            ctx.mapping_id,
            mapping,
            config.data_pattern,
            true,
        )),
        Err(e) => {
            warn!("sweep run failed ({}), counting 0 flips", e);
            Ok(0)
        }
    }
}

/// Picks, per pattern, the mapping replay would re-hammer (the most
/// effective one). Exposed for testing the selection order.
pub fn select_replay_mappings(
    patterns: &[HammeringPattern],
) -> Vec<(&HammeringPattern, &PatternAddressMapping)> {
    patterns
        .iter()
        .filter_map(|pattern| {
            pattern
                .most_effective_mapping()
                .map(|mapping| (pattern, mapping))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::FlipRecord;
    use crate::pattern::gen_instance_id;
    use anvil_core::dram::DramAddr;
    use anvil_core::util::RunRng;

    fn mapping_with_flips(rng: &mut RunRng, flips: usize) -> PatternAddressMapping {
        let mut mapping = PatternAddressMapping::new(rng);
        for i in 0..flips {
            mapping.bit_flips.push(FlipRecord {
                dram_addr: DramAddr::new(0, i, 0),
                bitmask: 1,
                data: 0,
            });
        }
        mapping
    }

    #[test]
    fn replay_picks_the_most_effective_mapping_per_pattern() {
        let mut rng = RunRng::seeded(0x66);

        // P1 flipped on two mappings (3 and 1 flips), P2 on one mapping (2)
        let mut p1 = HammeringPattern::new(4, &mut rng);
        p1.id = gen_instance_id(&mut rng);
        let m1a = mapping_with_flips(&mut rng, 3);
        let m1a_id = m1a.id.clone();
        p1.address_mappings.push(mapping_with_flips(&mut rng, 1));
        p1.address_mappings.push(m1a);

        let mut p2 = HammeringPattern::new(4, &mut rng);
        p2.id = gen_instance_id(&mut rng);
        let m2 = mapping_with_flips(&mut rng, 2);
        let m2_id = m2.id.clone();
        p2.address_mappings.push(m2);

        let patterns = vec![p1, p2];
        let selection = select_replay_mappings(&patterns);
        assert_eq!(selection.len(), 2);
        // P1 comes first and selects its 3-flip mapping, then P2's sole mapping
        assert_eq!(selection[0].0.id, patterns[0].id);
        assert_eq!(selection[0].1.id, m1a_id);
        assert_eq!(selection[1].0.id, patterns[1].id);
        assert_eq!(selection[1].1.id, m2_id);
    }

    #[test]
    fn patterns_without_mappings_are_skipped() {
        let mut rng = RunRng::seeded(0x67);
        let empty = HammeringPattern::new(4, &mut rng);
        assert!(select_replay_mappings(&[empty]).is_empty());
    }
}
