//! The `anvil` binary: calibrate, fuzz (or replay), archive.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{info, warn};

use anvil_core::analyzer::DramAnalyzer;
use anvil_core::dram::{AddressModel, DramAddr, DramConfig, Microarchitecture, RowMapping};
use anvil_core::memory::{AggressorPtr, DataPattern, MemoryRegion};
use anvil_core::util::{self, REGION_BASE, RunRng, SYNC_REGION_BASE, format_bytes};
use anvil_fuzzer::forges::{EmitterKind, ForgeConfig, ForgeContext, fuzzy, replay};
use anvil_fuzzer::hammer::{FenceType, FencingStrategy, FlushingStrategy};
use anvil_fuzzer::mapper::SchedulingPolicy;
use anvil_fuzzer::params::FuzzingParameterSet;

/// Number of sync rows prepared in the dedicated REF-sync region.
const NUM_SYNC_ROWS: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "anvil", about = "DRAM fault-injection (Rowhammer) fuzzer")]
struct Cli {
    /// Internal identifier of the currently inserted DIMM
    #[arg(short = 'd', long)]
    dimm_id: i64,

    /// Microarchitecture/platform (coffeelake, zen1plus, zen2, zen3, zen4)
    #[arg(long)]
    uarch: String,

    /// DRAM geometry as ranks,bank_groups,banks (e.g. 1,4,4)
    #[arg(long)]
    geometry: String,

    /// Use Samsung-style logical-to-physical row mapping
    #[arg(long)]
    samsung: bool,

    /// Perform a fuzzing run (default program mode)
    #[arg(short = 'f', long)]
    fuzzing: bool,

    /// Replay patterns with these ids (comma-separated) from the JSON archive
    #[arg(short = 'y', long, value_delimiter = ',')]
    replay_patterns: Vec<String>,

    /// Load this JSON archive from a previous run
    #[arg(short = 'j', long)]
    load_json: Option<PathBuf>,

    /// Synchronize with REFRESH while hammering (always on; flag kept for
    /// script compatibility)
    #[arg(short = 's', long)]
    sync: bool,

    /// Sweep the best pattern over a contiguous memory area after fuzzing
    #[arg(short = 'w', long)]
    sweeping: bool,

    /// Seconds to run the fuzzer before sweeping/terminating
    #[arg(short = 't', long, default_value_t = 120)]
    runtime_limit: u64,

    /// Activations per tREFI (0 = measure at startup)
    #[arg(short = 'a', long, default_value_t = 0)]
    acts_per_ref: usize,

    /// DRAM locations to try each pattern on (default: banks / 4)
    #[arg(short = 'p', long)]
    probes: Option<usize>,

    /// Fence scheduling policy (default, none, full, bp, half_bp, pair, rep)
    #[arg(long, default_value = "default")]
    sched_policy: String,

    /// Fence type (none, mfence, lfence, sfence)
    #[arg(long)]
    fence_type: String,

    /// Execution path (jit, interpreter)
    #[arg(long, default_value = "jit")]
    emitter: String,

    /// JSON file with measured DRAM bit functions, overriding the precompiled
    /// matrices for the selected microarchitecture
    #[arg(long)]
    dram_functions: Option<PathBuf>,

    /// Continue even when the CPU model is not in the supported list
    #[arg(long)]
    skip_cpu_check: bool,
}

struct Geometry {
    ranks: usize,
    bank_groups: usize,
    banks: usize,
}

fn parse_geometry(s: &str) -> anyhow::Result<Geometry> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        bail!("--geometry expects ranks,bank_groups,banks (e.g. 1,4,4)");
    }
    Ok(Geometry {
        ranks: parts[0].trim().parse().context("ranks")?,
        bank_groups: parts[1].trim().parse().context("bank groups")?,
        banks: parts[2].trim().parse().context("banks")?,
    })
}

fn parse_sched_policy(s: &str) -> anyhow::Result<SchedulingPolicy> {
    Ok(match s {
        "default" => SchedulingPolicy::Default,
        "none" => SchedulingPolicy::None,
        "full" => SchedulingPolicy::Full,
        "bp" => SchedulingPolicy::BasePeriod,
        "half_bp" => SchedulingPolicy::HalfBasePeriod,
        "pair" => SchedulingPolicy::Pair,
        "rep" => SchedulingPolicy::Rep,
        other => bail!(
            "unknown scheduling policy '{other}' (expected default, none, full, bp, half_bp, pair, rep)"
        ),
    })
}

fn parse_emitter(s: &str) -> anyhow::Result<EmitterKind> {
    Ok(match s {
        "jit" => EmitterKind::Jit,
        "interpreter" | "interp" => EmitterKind::Interpreter,
        other => bail!("unknown emitter '{other}' (expected jit or interpreter)"),
    })
}

fn main() {
    // log to stdout so `anvil ... | tee stdout.log` captures the full run
    let logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .target(env_logger::Target::Stdout)
    .build();
    let progress = MultiProgress::new();
    LogWrapper::new(progress, logger).try_init().ok();

    // argument or calibration failures exit with code 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            std::process::exit(1);
        }
    };
    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("anvil starting (DIMM id {})", cli.dimm_id);

    let geometry = parse_geometry(&cli.geometry)?;
    let scheduling_policy = parse_sched_policy(&cli.sched_policy)?;
    let fence_type: FenceType = cli
        .fence_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let emitter = parse_emitter(&cli.emitter)?;
    let uarch: Microarchitecture = cli.uarch.parse()?;
    let row_mapping = if cli.samsung {
        RowMapping::Samsung
    } else {
        RowMapping::Sequential
    };

    // fewer interruptions while calibrating and hammering
    util::raise_process_priority();

    let config = match &cli.dram_functions {
        Some(path) => {
            info!("building DRAM config from measured functions in {}", path.display());
            let custom = anvil_core::dram::CustomConfigFile::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            custom.to_config()?
        }
        None => DramConfig::select(
            uarch,
            geometry.ranks,
            geometry.bank_groups,
            geometry.banks,
            row_mapping,
        )?,
    };
    match anvil_core::dram::check_cpu_model(uarch) {
        Ok(model) => info!("CPU model '{}' verified for {}", model, uarch),
        Err(e) if cli.skip_cpu_check => warn!("{} (continuing as requested)", e),
        Err(e) => return Err(e.into()),
    }

    let mem_size = config.memory_size();
    info!("allocating 2x {} of memory", format_bytes(mem_size));
    let hammer_region = MemoryRegion::allocate(mem_size, true, REGION_BASE)?;
    let sync_region = MemoryRegion::allocate(mem_size, true, SYNC_REGION_BASE)?;

    let mut model = AddressModel::new(config);
    model.initialize_mapping(0, hammer_region.ptr());
    model.initialize_mapping(1, sync_region.ptr());

    if let Ok(phys) = hammer_region.phys_base() {
        info!("hammering region physical base: {:?}", phys);
    }
    hammer_region.initialize(DataPattern::Random);
    sync_region.initialize(DataPattern::Random);

    // timing calibration on the hammering region
    let mut rng = RunRng::from_entropy();
    info!("run RNG seed: {:#x}", rng.seed());
    let banks = model.config().banks();
    let mut analyzer = DramAnalyzer::new(&hammer_region, banks, RunRng::from_entropy());
    analyzer.find_threshold()?;
    analyzer.find_bank_conflicts()?;
    analyzer.find_targets();

    let acts_per_trefi = if cli.acts_per_ref > 0 {
        info!("using fixed acts-per-tREFI: {}", cli.acts_per_ref);
        cli.acts_per_ref
    } else {
        analyzer.count_acts_per_trefi()?
    };
    let ref_threshold = analyzer.find_sync_ref_threshold()?;
    analyzer.check_sync_ref_threshold(ref_threshold);
    model.set_sync_ref_threshold(ref_threshold);

    let translation = analyzer.corresponding_banks_for_mapping(&model, 0, 1)?;
    model.initialize_bank_translation(0, 1, translation);

    // REF-sync rows live in the dedicated region, in the bank that
    // corresponds to bank 0 of the hammering region
    let sync_bank = model.translate_bank(0, 1, 0);
    let sync_rows: Vec<AggressorPtr> = (0..NUM_SYNC_ROWS)
        .map(|i| model.to_virt(&DramAddr::with_mapping(sync_bank, 2 * i, 0, 1)))
        .collect();

    let mut params = FuzzingParameterSet::new(
        acts_per_trefi,
        model.config().rows(),
        banks,
        &mut rng,
    );
    if cli.acts_per_ref > 0 {
        params.set_fixed_acts_per_trefi(cli.acts_per_ref);
    }

    let forge_config = ForgeConfig {
        scheduling_policy,
        fence_type,
        flushing: FlushingStrategy::EarliestPossible,
        fencing: FencingStrategy::LatestPossible,
        emitter,
        runtime_limit: Duration::from_secs(cli.runtime_limit),
        probes_per_pattern: cli.probes.unwrap_or_else(|| (banks / 4).max(1)),
        sweep_best_pattern: cli.sweeping,
        data_pattern: DataPattern::Random,
    };
    let mut ctx = ForgeContext {
        region: &hammer_region,
        model: &model,
        mapping_id: 0,
        sync_rows,
        acts_per_trefi,
        rng,
    };

    if !cli.sync {
        info!("hammering is always REFRESH-synchronized; --sync is implied");
    }
    if let Some(archive_path) = &cli.load_json {
        let pattern_ids: HashSet<String> = cli.replay_patterns.iter().cloned().collect();
        replay::replay_patterns(&mut ctx, &forge_config, &mut params, archive_path, &pattern_ids)?;
    } else if cli.fuzzing || cli.load_json.is_none() {
        // fuzzing is the default program mode
        fuzzy::n_sided_frequency_based_hammering(&mut ctx, &forge_config, &mut params)?;
    } else {
        bail!("invalid combination of program modes");
    }

    Ok(())
}
