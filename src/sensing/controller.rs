use anyhow::{Context, Result};
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pipeline::IngestionPipeline;
use crate::ports::{BrightnessActuator, CalibrationPersistence, LineSource};

use super::loop_worker::sensing_loop;

/// Owns the ingestion loop task of the current session.
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    /// Whether a loop is still running. A loop that ended on its own does not count.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the ingestion loop over `source`. A loop that is still running
    /// is cancelled first; it is not awaited.
    pub fn start_sensing<A, P, S>(&mut self, pipeline: IngestionPipeline<A, P>, source: S)
    where
        A: BrightnessActuator,
        P: CalibrationPersistence,
        S: LineSource,
    {
        if let Some(token) = self.cancel_token.take() {
            if self.is_active() {
                warn!("Replacing a running sensing loop");
            }
            token.cancel();
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sensing_loop(pipeline, source, cancel_token.clone()));

        info!("Sensing loop started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sensing loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}
