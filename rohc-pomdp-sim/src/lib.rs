//! Batch runner for the header-compression simulator.
//!
//! Loads a [`SimConfig`] from TOML, runs one or many sessions of a chosen
//! compressor strategy in parallel, averages their [`SessionSummary`]s and
//! exports single-run traces as JSON. It also writes the belief controller's
//! decision problem as a POMDPX model for offline solvers. The simulation
//! itself lives in the `rohc_pomdp` crate.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rohc_pomdp::{
    BeliefController, DecisionKind, GilbertElliottChannel, HeaderController, PomdpxModel,
    SessionSummary, SimConfig, SimError, Simulation, SimulationTrace, TimerController,
    reference_efficiency,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Compressor strategy to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerKind {
    Timer,
    Belief,
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerKind::Timer => write!(f, "timer"),
            ControllerKind::Belief => write!(f, "belief"),
        }
    }
}

/// Errors of the batch runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("Failed to read configuration '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write trace '{path}': {source}")]
    TraceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode trace: {0}")]
    TraceEncode(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Batch needs at least one run")]
    NoRuns,
}

/// Parallelism and repetition of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub runs: usize,
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            workers: num_cpus::get(),
        }
    }
}

/// Averaged outcome of a batch of runs of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub controller: ControllerKind,
    pub runs: usize,
    pub steps: usize,
    pub summary: SessionSummary,
    /// Stationary probability of the Good channel state.
    pub p_good: f64,
    /// Efficiency of sending only Full, Partial or Minimal headers.
    pub reference: [f64; 3],
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== {} controller: {} run(s) x {} steps ===",
            self.controller, self.runs, self.steps
        )?;
        writeln!(f, "{}", self.summary)?;
        write!(
            f,
            "Reference efficiency (p_good = {:.3}): Full {:.4}, Partial {:.4}, Minimal {:.4}",
            self.p_good, self.reference[0], self.reference[1], self.reference[2]
        )
    }
}

/// Reads a TOML configuration and validates it.
///
/// Missing fields take their default values.
///
/// # Errors
/// - [`RunnerError::ConfigRead`] - The file cannot be read
/// - [`RunnerError::ConfigParse`] - The file is not a valid configuration
/// - [`RunnerError::Sim`] - A parameter is out of range
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig, RunnerError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SimConfig = toml::from_str(&text).map_err(|source| RunnerError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(SimError::from)?;
    info!(path = %path.display(), "Loaded simulation configuration");
    Ok(config)
}

/// Seeds for `runs` sessions: the master seed itself, then values drawn from
/// a generator seeded with it.
pub fn run_seeds(master_seed: u64, runs: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master_seed);
    std::iter::once(master_seed)
        .chain(std::iter::repeat_with(|| rng.random()))
        .take(runs)
        .collect()
}

/// Runs a single session and returns its trace.
///
/// # Errors
/// - [`SimError`] - Invalid configuration, unreadable policy or a failed belief update
pub fn run_single(config: &SimConfig, kind: ControllerKind) -> Result<SimulationTrace, SimError> {
    match kind {
        ControllerKind::Timer => Simulation::timer(config)?.run(),
        ControllerKind::Belief => Simulation::belief(config)?.run(),
    }
}

/// Runs `batch.runs` sessions of `kind` in parallel and averages their summaries.
///
/// The controller (and the belief controller's policy) is built once and
/// cloned into every run. Runs with equal seeds see identical channels
/// whatever the strategy.
///
/// # Errors
/// - [`RunnerError::NoRuns`] - `batch.runs` is zero
/// - [`RunnerError::WorkerPool`] - The thread pool cannot be created
/// - [`RunnerError::Sim`] - Any run failed
pub fn run_batch(
    config: &SimConfig,
    kind: ControllerKind,
    batch: BatchConfig,
) -> Result<BatchReport, RunnerError> {
    match kind {
        ControllerKind::Timer => {
            let controller = TimerController::new(config.timer).map_err(SimError::from)?;
            run_batch_with(config, kind, &controller, batch)
        }
        ControllerKind::Belief => {
            let controller = BeliefController::from_config(config)?;
            run_batch_with(config, kind, &controller, batch)
        }
    }
}

fn run_batch_with<C>(
    config: &SimConfig,
    kind: ControllerKind,
    controller: &C,
    batch: BatchConfig,
) -> Result<BatchReport, RunnerError>
where
    C: HeaderController + Clone + Sync,
{
    if batch.runs == 0 {
        return Err(RunnerError::NoRuns);
    }
    let (p_good_to_bad, p_bad_to_good) = config
        .channel
        .transition_probabilities()
        .map_err(SimError::from)?;
    let p_good = GilbertElliottChannel::new(p_good_to_bad, p_bad_to_good)
        .map_err(SimError::from)?
        .steady_state_good();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(batch.workers.max(1))
        .build()?;
    let seeds = run_seeds(config.seed, batch.runs);
    debug!(controller = %kind, runs = batch.runs, workers = batch.workers, "Starting batch");

    let summaries = pool.install(|| {
        seeds
            .par_iter()
            .map(|&seed| -> Result<SessionSummary, SimError> {
                let run_config = SimConfig {
                    seed,
                    ..config.clone()
                };
                let trace = Simulation::new(&run_config, controller.clone())?.run()?;
                Ok(SessionSummary::from_trace(&trace, &config.header_lengths))
            })
            .collect::<Result<Vec<_>, SimError>>()
    })?;

    let mut summary = SessionSummary::zeroed(config.steps);
    for run in &summaries {
        summary.merge(run);
    }
    summary.normalize(summaries.len());

    let reference = [DecisionKind::Full, DecisionKind::Partial, DecisionKind::Minimal]
        .map(|decision| reference_efficiency(decision, p_good, &config.header_lengths));

    Ok(BatchReport {
        controller: kind,
        runs: batch.runs,
        steps: config.steps,
        summary,
        p_good,
        reference,
    })
}

/// Writes a trace as pretty-printed JSON.
///
/// # Errors
/// - [`RunnerError::TraceEncode`] - The trace cannot be encoded
/// - [`RunnerError::TraceWrite`] - The file cannot be written
pub fn write_trace_json(trace: &SimulationTrace, path: impl AsRef<Path>) -> Result<(), RunnerError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(trace)?;
    fs::write(path, json).map_err(|source| RunnerError::TraceWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), steps = trace.len(), "Wrote trace");
    Ok(())
}

/// Exports the decision problem of `config` as a POMDPX file.
///
/// With `fully_observable` the estimator is left out and the channel state
/// is declared observable.
///
/// # Errors
/// - [`RunnerError::Sim`] - Invalid parameters or the file cannot be written
pub fn export_model(
    config: &SimConfig,
    discount: f64,
    fully_observable: bool,
    path: impl AsRef<Path>,
) -> Result<PomdpxModel, RunnerError> {
    let model =
        PomdpxModel::from_config(config, discount, fully_observable).map_err(SimError::from)?;
    model.save(path).map_err(SimError::from)?;
    Ok(model)
}
