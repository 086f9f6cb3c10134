#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use lumen_lib::{
    BrightnessActuator, CalibrationPersistence, CalibrationPoint, CalibrationStore, EngineEvent,
    IngestionPipeline, MemoryPersistence, PipelineConfig,
};
use tokio::sync::broadcast;

/// Actuator that records every value it is asked to apply.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    applied: Arc<Mutex<Vec<u8>>>,
}

impl RecordingActuator {
    pub fn applied(&self) -> Vec<u8> {
        self.applied.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.applied.lock().unwrap().clear();
    }
}

impl BrightnessActuator for RecordingActuator {
    async fn set(&self, percentage: u8) -> Result<()> {
        self.applied.lock().unwrap().push(percentage);
        Ok(())
    }

    async fn get_current(&self) -> Result<u8> {
        self.applied
            .lock()
            .unwrap()
            .last()
            .copied()
            .ok_or_else(|| anyhow!("nothing applied yet"))
    }
}

pub async fn memory_pipeline(
    config: PipelineConfig,
) -> (
    IngestionPipeline<RecordingActuator, MemoryPersistence>,
    RecordingActuator,
) {
    let actuator = RecordingActuator::default();
    let store = CalibrationStore::hydrate(MemoryPersistence::new()).await;
    (
        IngestionPipeline::new(actuator.clone(), store, config),
        actuator,
    )
}

pub fn pairs(points: &[CalibrationPoint]) -> Vec<(u32, u8)> {
    points.iter().map(|p| (p.lux, p.brightness)).collect()
}

/// Wait for the first event `matches` accepts, failing after five seconds.
pub async fn next_matching(
    events: &mut broadcast::Receiver<EngineEvent>,
    matches: impl Fn(&EngineEvent) -> bool,
) -> EngineEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event stream closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Poll until the pipeline has accepted `count` readings.
pub async fn until_accepted<A, P>(pipeline: &IngestionPipeline<A, P>, count: u64)
where
    A: BrightnessActuator,
    P: CalibrationPersistence,
{
    while pipeline.snapshot().await.readings_accepted < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
