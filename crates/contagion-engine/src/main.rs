//! Engine binary for the Contagion simulation.
//!
//! This is the main entry point that wires the simulation library to the
//! outside world: it loads configuration, initializes logging, and then runs
//! one of four subcommands.
//!
//! | Subcommand | Effect |
//! |------------|--------|
//! | `run` | Run one simulation now, appending snapshots to Dragonfly |
//! | `enqueue` | Push a run request onto the run queue |
//! | `worker` | Pop run requests off the queue and execute them |
//! | `census` | Print the per-step state counts of a stored stream |
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration from `contagion-config.yaml` (defaults if absent)
//! 3. Initialize structured logging (tracing) from the `logging` section
//! 4. Dispatch the subcommand
//!
//! Logs go to stderr; stdout carries only machine-readable output (job ids,
//! run reports, census lines).

mod cli;
mod error;
mod progress;
mod stream_sink;

use std::path::Path;

use anyhow::Context as _;
use clap::Parser as _;
use contagion_core::{
    LoggingConfig, MemorySink, ModelConfig, RunReport, RunRequest, RunnerError, SimulationConfig,
    SimulationEngine, SnapshotSink, StreamKeyField, census_by_step, peak_infected,
    run_with_callback,
};
use contagion_db::DragonflyPool;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ModelArgs};
use crate::error::AppError;
use crate::progress::ProgressCallback;
use crate::stream_sink::StreamSink;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration loading or the subcommand fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line.
    let cli = Cli::parse();

    // 2. Load configuration.
    let (config, from_file) = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    // 3. Initialize structured logging.
    init_tracing(&config.logging);
    info!("contagion-engine starting");
    if from_file {
        info!(path = %cli.config.display(), "Configuration loaded");
    } else {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    // 4. Dispatch.
    match cli.command {
        Command::Run {
            model,
            dry_run,
            progress_every,
        } => run(&config, &model, dry_run, progress_every)
            .await
            .context("simulation run failed"),
        Command::Enqueue { model, count } => enqueue(&config, &model, count)
            .await
            .context("failed to enqueue run request"),
        Command::Worker {
            once,
            poll_secs,
            progress_every,
        } => worker(&config, once, poll_secs, progress_every)
            .await
            .context("worker failed"),
        Command::Census { model, stream_key } => census(&config, &model, stream_key)
            .await
            .context("census export failed"),
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
///
/// Returns the configuration and whether it came from the file.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), AppError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply command-line overrides to the configured model and validate it.
///
/// Returns the model and the number of steps to run.
fn resolve_model(
    config: &SimulationConfig,
    args: &ModelArgs,
) -> Result<(ModelConfig, u64), AppError> {
    let mut model = config.model.clone();
    args.apply(&mut model);
    model.validate()?;
    Ok((model, args.steps.unwrap_or(config.run.steps)))
}

/// Build an engine for `model` and step it `steps` times against `sink`.
fn execute(
    model: ModelConfig,
    steps: u64,
    key_fields: &[StreamKeyField],
    sink: &mut dyn SnapshotSink,
    progress_every: u64,
) -> Result<RunReport, RunnerError> {
    let engine = SimulationEngine::new(model)
        .map_err(|source| RunnerError::Engine { step: 0, source })?
        .with_stream_key(key_fields);
    run_with_callback(
        engine,
        steps,
        sink,
        &mut ProgressCallback::new(progress_every),
    )
}

/// Run a simulation on a blocking thread, appending to Dragonfly.
async fn simulate(
    pool: DragonflyPool,
    model: ModelConfig,
    steps: u64,
    key_fields: Vec<StreamKeyField>,
    progress_every: u64,
) -> Result<RunReport, AppError> {
    let handle = Handle::current();
    let report = tokio::task::spawn_blocking(move || {
        let mut sink = StreamSink::new(pool, handle);
        let report = execute(model, steps, &key_fields, &mut sink, progress_every);
        debug!(records = sink.appended(), "Stream sink closed");
        report
    })
    .await??;
    Ok(report)
}

/// Log a finished run and print its report to stdout.
fn emit_report(report: &RunReport) -> Result<(), AppError> {
    let elapsed_ms = report
        .finished_at
        .signed_duration_since(report.started_at)
        .num_milliseconds();
    info!(
        stream_key = %report.stream_key,
        steps = report.steps,
        elapsed_ms,
        "Run finished"
    );
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

/// `run`: execute one simulation immediately.
async fn run(
    config: &SimulationConfig,
    args: &ModelArgs,
    dry_run: bool,
    progress_every: u64,
) -> Result<(), AppError> {
    let (model, steps) = resolve_model(config, args)?;
    let key_fields = config.run.stream_key_fields.clone();

    let report = if dry_run {
        let mut sink = MemorySink::new();
        execute(model, steps, &key_fields, &mut sink, progress_every)?
    } else {
        let pool = DragonflyPool::connect(&config.infrastructure.dragonfly_url).await?;
        simulate(pool, model, steps, key_fields, progress_every).await?
    };
    emit_report(&report)
}

/// `enqueue`: push `count` run requests onto the run queue.
async fn enqueue(config: &SimulationConfig, args: &ModelArgs, count: u32) -> Result<(), AppError> {
    let (model, steps) = resolve_model(config, args)?;
    let queue = config.infrastructure.queue_key.as_str();
    let pool = DragonflyPool::connect(&config.infrastructure.dragonfly_url).await?;

    for _ in 0..count {
        let request = RunRequest::new(model.clone(), steps);
        let depth = pool.enqueue_json(queue, &request).await?;
        info!(job_id = %request.job_id, queue, depth, "Run request enqueued");
        println!("{}", request.job_id);
    }
    Ok(())
}

/// `worker`: pop run requests and execute them until interrupted.
///
/// A job that fails to decode, validate, or run is logged and skipped; with
/// `once` it ends the worker with an error instead.
async fn worker(
    config: &SimulationConfig,
    once: bool,
    poll_secs: f64,
    progress_every: u64,
) -> Result<(), AppError> {
    let queue = config.infrastructure.queue_key.as_str();
    let pool = DragonflyPool::connect(&config.infrastructure.dragonfly_url).await?;
    info!(queue, once, "Worker waiting for run requests");

    loop {
        let popped = tokio::select! {
            popped = pool.dequeue(queue, poll_secs) => popped?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, worker stopping");
                return Ok(());
            }
        };
        let Some(payload) = popped else {
            debug!(queue, "Queue idle");
            continue;
        };

        match run_queued(&pool, config, &payload, progress_every).await {
            Ok(report) => emit_report(&report)?,
            Err(e) if once => return Err(e),
            Err(e) => error!(queue, error = %e, "Run request failed, skipping"),
        }
        if once {
            return Ok(());
        }
    }
}

/// Decode, validate, and execute one popped queue payload.
async fn run_queued(
    pool: &DragonflyPool,
    config: &SimulationConfig,
    payload: &str,
    progress_every: u64,
) -> Result<RunReport, AppError> {
    let request = decode_request(payload)?;
    info!(
        job_id = %request.job_id,
        steps = request.steps,
        enqueued_at = %request.enqueued_at,
        "Run request received"
    );
    simulate(
        pool.clone(),
        request.model,
        request.steps,
        config.run.stream_key_fields.clone(),
        progress_every,
    )
    .await
}

/// Parse a queued run request and check its model parameters.
fn decode_request(payload: &str) -> Result<RunRequest, AppError> {
    let request: RunRequest = serde_json::from_str(payload)?;
    request.model.validate()?;
    Ok(request)
}

/// `census`: print one JSON line of state counts per stored step.
async fn census(
    config: &SimulationConfig,
    args: &ModelArgs,
    stream_key: Option<String>,
) -> Result<(), AppError> {
    let stream_key = match stream_key {
        Some(key) => key,
        None => resolve_model(config, args)?
            .0
            .stream_key(&config.run.stream_key_fields),
    };
    let pool = DragonflyPool::connect(&config.infrastructure.dragonfly_url).await?;
    let records = pool.read_stream(&stream_key).await?;
    let census = census_by_step(&records);

    for counts in &census {
        println!("{}", serde_json::to_string(counts)?);
    }

    match peak_infected(&census) {
        Some(peak) => info!(
            %stream_key,
            steps = census.len(),
            peak_step = peak.step,
            peak_infected = peak.infected,
            "Census complete"
        ),
        None => warn!(%stream_key, "Stream is empty"),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn queued_request_decodes() {
        let request = RunRequest::new(ModelConfig::default(), 12);
        let payload = serde_json::to_string(&request).unwrap();
        assert_eq!(decode_request(&payload).unwrap(), request);
    }

    #[test]
    fn non_json_payload_is_rejected() {
        let err = decode_request("garbage").unwrap_err();
        assert!(matches!(err, AppError::Json { .. }));
    }

    #[test]
    fn payload_without_steps_is_rejected() {
        let err = decode_request(r#"{"model": {"N": 10}}"#).unwrap_err();
        assert!(matches!(err, AppError::Json { .. }));
    }

    #[test]
    fn out_of_range_model_is_rejected() {
        let err = decode_request(r#"{"steps": 5, "model": {"N": 0}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }
}
