pub mod calibration;
pub mod commands;
pub mod curve;
mod db;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod pipeline;
pub mod ports;
pub mod sensing;
pub mod settings;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};

pub use calibration::CalibrationStore;
pub use commands::{run_command, OperatorCommand};
pub use curve::{brightness_for, CurveSource};
pub use db::Database;
pub use error::{EngineError, EngineResult};
pub use models::{CalibrationPoint, CalibrationStats, LightSample, MappingMode};
pub use optimizer::{adaptive_curve_fitting, optimize, OptimizeStrategy, OptimizerConfig};
pub use pipeline::{
    BrightnessDecision, EngineEvent, IngestionPipeline, PipelineConfig, SessionState,
    SessionStatus,
};
pub use ports::{
    BrightnessActuator, BufLineSource, CalibrationPersistence, LineSource, LogActuator,
    MemoryPersistence,
};
pub use settings::{ConnectionSettings, SettingsStore};

const STDIN_CONNECTION: &str = "stdin";

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Lumen starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(serve(std::env::args().nth(1))) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn data_dir() -> PathBuf {
    std::env::var_os("LUMEN_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".lumen"))
}

/// Run one ingestion session until the sensor goes away or Ctrl-C.
///
/// The sensor is `device` when given, else the remembered connection when
/// auto-connect is on, else stdin.
async fn serve(device: Option<String>) -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("calibration.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let store = CalibrationStore::hydrate(database).await;
    if let Some(err) = store.hydration_error() {
        warn!("Starting with an empty calibration: {err}");
    }
    info!("Loaded {} calibration point(s)", store.len().await);

    let pipeline = IngestionPipeline::new(LogActuator::default(), store, PipelineConfig::from_env());
    tokio::spawn(print_events(pipeline.subscribe()));

    if let Err(err) = pipeline.seed_manual_control().await {
        warn!("Manual control starts unseeded: {err}");
    }

    let remembered = settings.connection();
    let device = device.or_else(|| {
        remembered
            .last_connection
            .filter(|_| remembered.auto_connect)
    });

    match device {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open sensor {path}"))?;
            pipeline
                .connect(&path, BufLineSource::new(BufReader::new(file)))
                .await?;
            if let Err(err) = settings.remember_connection(&path) {
                warn!("Failed to remember connection {path}: {err:#}");
            }
            tokio::spawn(read_operator_commands(pipeline.clone()));
        }
        None => {
            pipeline
                .connect(
                    STDIN_CONNECTION,
                    BufLineSource::new(BufReader::new(tokio::io::stdin())),
                )
                .await?;
        }
    }

    tokio::select! {
        _ = pipeline.wait_for_disconnect() => {
            info!("Sensor disconnected, shutting down");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Interrupted, disconnecting");
            pipeline.disconnect().await;
        }
    }

    Ok(())
}

/// Write every engine event to stdout as one JSON line.
async fn print_events(mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(err) => warn!("Failed to serialize event {event:?}: {err}"),
            },
            Err(RecvError::Lagged(skipped)) => warn!("Event printer skipped {skipped} event(s)"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn read_operator_commands<A, P>(pipeline: IngestionPipeline<A, P>)
where
    A: BrightnessActuator,
    P: CalibrationPersistence,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!("Stopped reading operator commands: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<OperatorCommand>() {
            Ok(command) => match run_command(&pipeline, command).await {
                Ok(reply) => info!("{reply}"),
                Err(err) => warn!("Command {line:?} failed: {err}"),
            },
            Err(err) => warn!("{err}"),
        }
    }
}
