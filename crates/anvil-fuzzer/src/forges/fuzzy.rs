//! The randomized fuzzing loop.

use std::path::Path;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{info, warn};

use super::{ForgeConfig, ForgeContext, ForgeError, ProbeExecutor, do_random_accesses};
use crate::archive;
use crate::builder::PatternBuilder;
use crate::hammer::HammerError;
use crate::mapper::{PatternAddressMapping, shuffle_components};
use crate::params::FuzzingParameterSet;
use crate::pattern::HammeringPattern;
use crate::scanner;

/// Rounds of the reproducibility check once a mapping flipped bits.
const REPRODUCIBILITY_ROUNDS: usize = 50;

/// Filler-access time between reproducibility rounds: one full retention
/// interval, so every cell was refreshed in between.
const RETENTION_US: u64 = 64_000;

/// Default archive location, relative to the working directory.
pub const ARCHIVE_FILENAME: &str = "raw_data.json";

/// Closing statistics of a fuzzing run. Logged at the end; a run that aborted
/// never prints them, which is how complete runs are told apart.
#[derive(Debug, Default)]
pub struct FuzzStatistics {
    /// Patterns generated and probed
    pub patterns_tested: usize,
    /// (pattern, mapping) probes executed
    pub probes: usize,
    /// Probes that flipped at least one bit
    pub successful_probes: usize,
    /// Id of the pattern with the most flips over all its mappings
    pub best_pattern_id: Option<String>,
    /// Id of that pattern's most effective mapping
    pub best_mapping_id: Option<String>,
    /// Flips of the best mapping
    pub best_mapping_flips: usize,
}

impl FuzzStatistics {
    fn log(&self) {
        info!("fuzzing run finished at {}", chrono::Local::now().to_rfc3339());
        info!("  patterns tested: {}", self.patterns_tested);
        info!("  probes executed: {}", self.probes);
        info!("  successful probes: {}", self.successful_probes);
        match (&self.best_pattern_id, &self.best_mapping_id) {
            (Some(pattern_id), Some(mapping_id)) => {
                info!("  best pattern: {}", pattern_id);
                info!(
                    "  best mapping: {} ({} flips)",
                    mapping_id, self.best_mapping_flips
                );
            }
            _ => info!("  no pattern flipped any bits"),
        }
    }
}

/// Runs the frequency-based fuzzing loop until the wall-clock budget is
/// spent, then archives everything and optionally sweeps the best pattern.
///
/// # Errors
///
/// Only fatal kinds ([`ForgeError`]); per-mapping failures are logged and the
/// loop advances.
pub fn n_sided_frequency_based_hammering(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &mut FuzzingParameterSet,
) -> Result<Vec<HammeringPattern>, ForgeError> {
    info!("starting frequency-based hammering");
    params.log_static_parameters();

    let deadline = Instant::now() + config.runtime_limit;
    let progress = ProgressBar::new(config.runtime_limit.as_secs());
    progress.set_style(
        ProgressStyle::with_template("fuzzing {bar:40.red/black} {pos}s/{len}s {msg}")
            .expect("static template"),
    );

    let mut patterns: Vec<HammeringPattern> = Vec::new();
    let mut stats = FuzzStatistics::default();
    let mut best_pattern_flips = 0usize;

    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        progress.set_position(config.runtime_limit.as_secs() - remaining.as_secs());

        params.randomize_parameters(&mut ctx.rng);
        params.log_pattern_parameters();

        let mut pattern = HammeringPattern::new(params.base_period(), &mut ctx.rng);
        info!(
            "generating pattern #{} ({})",
            stats.patterns_tested + 1,
            pattern.id
        );
        if let Err(e) = PatternBuilder::new(&mut pattern)
            .generate_frequency_based_pattern(params, &mut ctx.rng)
        {
            warn!("abandoning pattern {}: {}", pattern.id, e);
            continue;
        }
        stats.patterns_tested += 1;
        log::debug!("abstract pattern over aggressor ids:\n{}", pattern.text_repr());

        // decorrelate aggressor ids from row order before mapping
        shuffle_components(&mut pattern, &mut ctx.rng);

        for probe_no in 0..config.probes_per_pattern {
            let mut mapping = PatternAddressMapping::new(&mut ctx.rng);
            info!(
                "running pattern {} with mapping #{} ({})",
                pattern.id, probe_no, mapping.id
            );
            mapping.randomize_addresses(params, &pattern.agg_access_patterns, &mut ctx.rng);
            stats.probes += 1;
            let flipped =
                probe_mapping_and_scan(ctx, config, params, &mut pattern, mapping)?;
            if flipped {
                stats.successful_probes += 1;
            }
        }

        let pattern_flips = pattern.total_bitflips();
        if pattern_flips > best_pattern_flips {
            best_pattern_flips = pattern_flips;
            stats.best_pattern_id = Some(pattern.id.clone());
            if let Some(best_mapping) = pattern.most_effective_mapping() {
                stats.best_mapping_id = Some(best_mapping.id.clone());
                stats.best_mapping_flips = best_mapping.count_bitflips();
            }
        }

        patterns.push(pattern);
    }
    progress.finish_and_clear();

    archive::export_patterns(Path::new(ARCHIVE_FILENAME), &patterns)?;
    stats.log();
    info!(
        "  rng: seed {:#x}, {} words drawn",
        ctx.rng.seed(),
        ctx.rng.words_drawn()
    );

    if config.sweep_best_pattern && best_pattern_flips > 0 {
        let best_pattern = stats
            .best_pattern_id
            .as_deref()
            .and_then(|id| patterns.iter().find(|p| p.id == id));
        match best_pattern.and_then(|p| Some((p, p.most_effective_mapping()?))) {
            Some((pattern, mapping)) => {
                super::replay::sweep_pattern(
                    ctx,
                    config,
                    params,
                    pattern,
                    mapping.clone(),
                    super::replay::SWEEP_BYTES,
                )?;
            }
            None => warn!("no effective mapping to sweep"),
        }
    }

    Ok(patterns)
}

/// Probes one (pattern, mapping) pair: emit, hammer, scan, and if bits
/// flipped, measure reproducibility. Returns whether any bit flipped.
///
/// The mapping (with its flips and score) is pushed into the pattern in every
/// case, so the archive reflects unsuccessful probes too.
///
/// # Errors
///
/// Only fatal emission failures; sync timeouts abort this mapping silently.
pub(super) fn probe_mapping_and_scan(
    ctx: &mut ForgeContext,
    config: &ForgeConfig,
    params: &FuzzingParameterSet,
    pattern: &mut HammeringPattern,
    mut mapping: PatternAddressMapping,
) -> Result<bool, ForgeError> {
    let steps = mapping.export_pattern(pattern, config.scheduling_policy, ctx.model);
    let unique_pages = steps
        .iter()
        .filter_map(|step| match step {
            crate::mapper::PatternStep::Access(ptr) => Some(*ptr as usize & !0xFFF),
            crate::mapper::PatternStep::Fence => None,
        })
        .unique()
        .count();
    info!("pattern touches {} distinct pages", unique_pages);

    let sync_each_ref = params.random_sync_each_ref(&mut ctx.rng);
    let num_aggs_for_sync = params.random_num_aggressors_for_sync(&mut ctx.rng);
    let sync = ctx.sync_config(sync_each_ref, num_aggs_for_sync);

    let executor = ProbeExecutor::new(
        config,
        steps,
        sync,
        params.hammering_total_num_activations() as u64,
    )?;

    // reset the in-DRAM sampler state and fuzz the starting REF
    let wait_us = params.random_wait_until_start_hammering_us(&mut ctx.rng);
    let filler_rows =
        mapping.random_nonaccessed_rows(params.max_row_no(), ctx.model, &mut ctx.rng);
    do_random_accesses(&filler_rows, wait_us);

    let mut rounds_with_flips = 0usize;
    let mut any_flips = false;

    for round in 1..=REPRODUCIBILITY_ROUNDS {
        let reproducibility_mode = round > 1;
        match executor.run() {
            Ok(data) => {
                log::debug!(
                    "hammer round {}: {} acts, {} sync acts, {} cycles",
                    round, data.total_activations, data.sync_activations, data.elapsed_cycles
                );
            }
            Err(HammerError::SyncTimeout { rounds }) => {
                warn!(
                    "aborting mapping {}: REF sync timed out after {} rounds",
                    mapping.id, rounds
                );
                pattern.address_mappings.push(mapping);
                return Ok(any_flips);
            }
            Err(e) => {
                warn!("aborting mapping {}: {}", mapping.id, e);
                pattern.address_mappings.push(mapping);
                return Ok(any_flips);
            }
        }

        let flips = scanner::check(
            ctx.region,
            ctx.model,
            ctx.mapping_id,
            &mut mapping,
            config.data_pattern,
            reproducibility_mode,
        );
        if flips > 0 {
            rounds_with_flips += 1;
            any_flips = true;
        }

        if round == 1 {
            if flips == 0 {
                // nothing flipped: not worth 49 more rounds
                pattern.address_mappings.push(mapping);
                return Ok(false);
            }
            info!("mapping {} flipped bits; testing reproducibility", mapping.id);
        }

        // a full retention interval of unrelated accesses between rounds
        do_random_accesses(&filler_rows, RETENTION_US);
    }

    let score = rounds_with_flips as f64 / REPRODUCIBILITY_ROUNDS as f64;
    info!(
        "mapping {} reproducibility: {}/{} rounds ({:.2})",
        mapping.id, rounds_with_flips, REPRODUCIBILITY_ROUNDS, score
    );
    mapping.reproducibility_score = Some(score);
    pattern.address_mappings.push(mapping);
    Ok(any_flips)
}
