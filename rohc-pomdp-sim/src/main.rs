//! Header-compression simulator CLI.
//!
//! Runs the timer-driven or belief-driven compressor, or both on identical
//! channel realizations:
//! - timer: Timeout-driven header selection.
//! - belief: POMDP policy over the decompressor's hidden state.
//! - compare: Both strategies with the same seeds.
//! - export-model: Writes the belief controller's model as POMDPX.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rohc_pomdp::SimConfig;
use rohc_pomdp::constants::DEFAULT_DISCOUNT;
use rohc_pomdp_sim::{
    BatchConfig, ControllerKind, RunnerError, export_model, load_config, run_batch, run_single,
    write_trace_json,
};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Header-compression synchronization simulator", long_about = None)]
struct CliArgs {
    /// Run mode.
    #[arg(value_enum)]
    mode: RunMode,

    /// TOML configuration file. Defaults are used for anything it omits.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed of the first run; later runs derive their seeds from it.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of packets per run.
    #[arg(short = 'n', long)]
    steps: Option<usize>,

    /// Policy file for the belief controller.
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Number of runs to average.
    #[arg(short, long, default_value_t = 1)]
    runs: usize,

    /// Number of parallel workers. Defaults to number of logical CPUs.
    #[arg(short = 'w', long, default_value_t = num_cpus::get())]
    workers: usize,

    /// Write the trace of the first run as JSON (timer and belief modes).
    #[arg(short = 't', long)]
    trace_out: Option<PathBuf>,

    /// Output file of export-model.
    #[arg(short, long, default_value = "model.pomdpx")]
    output: PathBuf,

    /// Discount factor written by export-model.
    #[arg(long, default_value_t = DEFAULT_DISCOUNT)]
    discount: f64,

    /// Export a model whose channel state is observed without error.
    #[arg(long)]
    fully_observable: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RunMode {
    /// Timer-driven compressor.
    Timer,
    /// Belief-driven compressor.
    Belief,
    /// Both compressors on the same channel realizations.
    Compare,
    /// POMDPX model of the belief controller's decision problem.
    ExportModel,
}

fn main() {
    let args = CliArgs::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(err) = run(&args) {
        eprintln!("FAILURE: {}", err);
        std::process::exit(1);
    }
}

/// Resolves the configuration from the file and the command-line overrides.
fn resolve_config(args: &CliArgs) -> Result<SimConfig, RunnerError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(policy) = &args.policy {
        config.policy_path = Some(policy.clone());
    }
    config.validate().map_err(rohc_pomdp::SimError::from)?;
    Ok(config)
}

fn run(args: &CliArgs) -> Result<(), RunnerError> {
    let config = resolve_config(args)?;
    if let RunMode::ExportModel = args.mode {
        let model = export_model(&config, args.discount, args.fully_observable, &args.output)?;
        println!(
            "Model with {} states (W = {}, discount {}) written to {}",
            model.transitions().dimension(),
            model.window_capacity(),
            model.discount(),
            args.output.display()
        );
        return Ok(());
    }

    let batch = BatchConfig {
        runs: args.runs,
        workers: args.workers,
    };
    let kinds: &[ControllerKind] = match args.mode {
        RunMode::Timer => &[ControllerKind::Timer],
        RunMode::Belief => &[ControllerKind::Belief],
        RunMode::Compare | RunMode::ExportModel => {
            &[ControllerKind::Timer, ControllerKind::Belief]
        }
    };

    println!(
        "Simulating {} run(s) of {} packets, W = {}, seed {}, {} workers.",
        batch.runs, config.steps, config.window_capacity, config.seed, batch.workers
    );

    for &kind in kinds {
        let start = Instant::now();
        let report = run_batch(&config, kind, batch)?;
        println!("{}", report);
        println!("Duration: {:.2?}\n", start.elapsed());
    }

    if let Some(path) = &args.trace_out {
        match args.mode {
            RunMode::Timer | RunMode::Belief => {
                let trace = run_single(&config, kinds[0])?;
                write_trace_json(&trace, path)?;
                println!("Trace of seed {} written to {}", config.seed, path.display());
            }
            RunMode::Compare | RunMode::ExportModel => {
                eprintln!("--trace-out is ignored in compare mode");
            }
        }
    }
    Ok(())
}
