use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
    time,
};
use uuid::Uuid;

use crate::calibration::{CalibrationStore, MERGE_TOLERANCE_LUX};
use crate::curve::{self, CurveSource};
use crate::error::{EngineError, EngineResult};
use crate::models::{CalibrationPoint, CalibrationStats, LightSample, MAX_BRIGHTNESS};
use crate::optimizer::OptimizeStrategy;
use crate::ports::{BrightnessActuator, CalibrationPersistence, LineSource};
use crate::sensing::{parser, SensingController};

use super::{DecisionOrigin, EngineEvent, PipelineConfig, SessionState, SessionStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Outcome of one accepted sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessDecision {
    pub sample: LightSample,
    pub brightness: u8,
    pub curve: CurveSource,
    /// Set when the actuator refused the value.
    pub failure: Option<EngineError>,
}

impl BrightnessDecision {
    pub fn applied(&self) -> bool {
        self.failure.is_none()
    }
}

/// Turns sensor lines into brightness decisions and manual adjustments into
/// calibration points.
///
/// Cheap to clone; every clone drives the same session.
pub struct IngestionPipeline<A, P> {
    state: Arc<Mutex<SessionState>>,
    store: CalibrationStore<P>,
    actuator: Arc<A>,
    config: Arc<PipelineConfig>,
    events: broadcast::Sender<EngineEvent>,
    status: Arc<watch::Sender<SessionStatus>>,
    debounce: Arc<Mutex<Option<JoinHandle<()>>>>,
    sensing: Arc<Mutex<SensingController>>,
}

impl<A, P> Clone for IngestionPipeline<A, P> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            store: self.store.clone(),
            actuator: self.actuator.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            status: self.status.clone(),
            debounce: self.debounce.clone(),
            sensing: self.sensing.clone(),
        }
    }
}

impl<A, P> IngestionPipeline<A, P>
where
    A: BrightnessActuator,
    P: CalibrationPersistence,
{
    pub fn new(actuator: A, store: CalibrationStore<P>, config: PipelineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (status, _) = watch::channel(SessionStatus::Idle);

        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            store,
            actuator: Arc::new(actuator),
            config: Arc::new(config),
            events,
            status: Arc::new(status),
            debounce: Arc::new(Mutex::new(None)),
            sensing: Arc::new(Mutex::new(SensingController::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &CalibrationStore<P> {
        &self.store
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Read the panel's current brightness so a manual control can start there.
    pub async fn seed_manual_control(&self) -> EngineResult<u8> {
        match self.actuator.get_current().await {
            Ok(brightness) => {
                self.emit(EngineEvent::ManualControlSeeded { brightness });
                Ok(brightness)
            }
            Err(err) => {
                log_warn!("Could not read current brightness: {err:#}");
                Err(EngineError::actuation(&err))
            }
        }
    }

    /// Start a session reading from `source`. Returns the new session id.
    pub async fn connect<S: LineSource>(&self, connection: &str, source: S) -> EngineResult<String> {
        if self.state.lock().await.is_connected() {
            return Err(EngineError::SessionActive);
        }

        // Reap the loop of a session that ended on its own.
        let mut sensing = self.sensing.lock().await;
        if let Err(err) = sensing.stop_sensing().await {
            log_warn!("Previous ingestion loop ended abnormally: {err:#}");
        }

        let session_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            if state.is_connected() {
                return Err(EngineError::SessionActive);
            }
            state.begin_session(session_id.clone(), connection.to_string(), Utc::now());
        }

        self.status.send_replace(SessionStatus::Connected);
        self.emit(EngineEvent::SessionStateChanged {
            session_id: Some(session_id.clone()),
            status: SessionStatus::Connected,
            reason: None,
        });
        log_info!("Session {session_id} connected to {connection}");

        sensing.start_sensing(self.clone(), source);

        Ok(session_id)
    }

    /// Stop the ingestion loop and end the session. No-op when not connected.
    pub async fn disconnect(&self) {
        if let Err(err) = self.sensing.lock().await.stop_sensing().await {
            log_warn!("Ingestion loop ended abnormally: {err:#}");
        }
        self.mark_disconnected(Some("disconnected on request".to_string()))
            .await;
    }

    /// Resolves once the session status is `Disconnected`.
    pub async fn wait_for_disconnect(&self) {
        let mut status = self.status.subscribe();
        let _ = status
            .wait_for(|status| *status == SessionStatus::Disconnected)
            .await;
    }

    pub(crate) async fn mark_disconnected(&self, reason: Option<String>) {
        let session_id = {
            let mut state = self.state.lock().await;
            if !state.is_connected() {
                return;
            }
            state.end_session();
            state.session_id.clone()
        };

        self.cancel_pending_adjustment().await;
        self.status.send_replace(SessionStatus::Disconnected);

        log_info!(
            "Session {} disconnected ({})",
            session_id.as_deref().unwrap_or("?"),
            reason.as_deref().unwrap_or("no reason given")
        );
        self.emit(EngineEvent::SessionStateChanged {
            session_id,
            status: SessionStatus::Disconnected,
            reason,
        });
    }

    /// Parse one sensor line and apply the brightness the curve picks for it.
    ///
    /// A malformed line is counted, reported and returned as an error; it does
    /// not affect the session. Actuation failures are reported in the decision
    /// and never touch the calibration set.
    pub async fn handle_line(&self, line: &str) -> EngineResult<BrightnessDecision> {
        let sample = match parser::parse(line) {
            Ok(sample) => sample,
            Err(err) => {
                self.state.lock().await.record_rejection();
                log_debug!("Dropping sensor line {line:?}");
                self.emit(EngineEvent::ReadingRejected {
                    line: line.to_string(),
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        self.state.lock().await.record_sample(sample);

        let calibration = self.store.all().await;
        let (brightness, curve) = curve::evaluate(sample.lux, &calibration, self.config.mode);

        let failure = self
            .actuator
            .set(brightness)
            .await
            .err()
            .map(|err| EngineError::actuation(&err));
        if let Some(err) = &failure {
            log_warn!("{} lux -> {}% not applied: {}", sample.lux, brightness, err);
        } else {
            log_debug!("{} lux -> {}% ({:?})", sample.lux, brightness, curve);
        }

        self.emit(EngineEvent::BrightnessDecided {
            lux: sample.lux,
            brightness,
            curve: Some(curve),
            origin: DecisionOrigin::Sensor,
            applied: failure.is_none(),
            error: failure.as_ref().map(ToString::to_string),
        });

        Ok(BrightnessDecision {
            sample,
            brightness,
            curve,
            failure,
        })
    }

    /// A manual brightness change. Only the last value within the debounce
    /// window is applied and learned.
    pub async fn adjust_brightness(&self, brightness: u8) {
        let brightness = brightness.min(MAX_BRIGHTNESS);

        // The generation is taken under the debounce lock so timers are
        // replaced in the same order generations are handed out.
        let mut pending = self.debounce.lock().await;
        let generation = self.state.lock().await.next_adjustment();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let pipeline = self.clone();
        let quiet = self.config.debounce;
        *pending = Some(tokio::spawn(async move {
            time::sleep(quiet).await;
            // Past this point a newer adjustment may abort the timer but not the apply.
            tokio::spawn(async move {
                pipeline.apply_adjustment(generation, brightness).await;
            });
        }));
    }

    async fn apply_adjustment(&self, generation: u64, brightness: u8) {
        // Holding the state lock keeps a disconnect from landing between the
        // staleness check and the actuation.
        let (lux, failure) = {
            let state = self.state.lock().await;
            if !state.is_current_adjustment(generation) {
                log_debug!("Dropping superseded adjustment to {brightness}%");
                return;
            }
            let failure = self
                .actuator
                .set(brightness)
                .await
                .err()
                .map(|err| EngineError::actuation(&err));
            (state.learning_lux(), failure)
        };

        if let Some(err) = &failure {
            log_warn!("Manual brightness {brightness}% not applied: {err}");
        }
        self.emit(EngineEvent::BrightnessDecided {
            lux,
            brightness,
            curve: None,
            origin: DecisionOrigin::Manual,
            applied: failure.is_none(),
            error: failure.as_ref().map(ToString::to_string),
        });

        if lux == 0 {
            log_debug!("No light sample yet; not learning {brightness}%");
            return;
        }

        let point = CalibrationPoint::new(lux, brightness, Utc::now());
        if let Err(err) = self.store.insert(point).await {
            self.report_persistence_failure(&err);
        }
        log_info!("Learned {} lux -> {}%", point.lux, point.brightness);
        self.emit(EngineEvent::CalibrationLearned { point });

        self.compact_if_needed(point).await;
    }

    /// Compact an oversized set. `learned` survives as recorded.
    async fn compact_if_needed(&self, learned: CalibrationPoint) {
        let Some(limit) = self.config.auto_optimize_above else {
            return;
        };
        if self.store.len().await <= limit {
            return;
        }
        if let Err(err) = self
            .rewrite_calibration(OptimizeStrategy::Compact, Some(learned))
            .await
        {
            log_warn!("Automatic calibration compaction failed: {err}");
        }
    }

    async fn cancel_pending_adjustment(&self) {
        if let Some(handle) = self.debounce.lock().await.take() {
            handle.abort();
        }
    }

    /// Rewrite the live calibration set with `strategy`. Returns the point
    /// counts before and after.
    pub async fn optimize_calibration(
        &self,
        strategy: OptimizeStrategy,
    ) -> EngineResult<(usize, usize)> {
        self.rewrite_calibration(strategy, None).await
    }

    async fn rewrite_calibration(
        &self,
        strategy: OptimizeStrategy,
        keep: Option<CalibrationPoint>,
    ) -> EngineResult<(usize, usize)> {
        let optimizer = &self.config.optimizer;
        let (before, after) = self
            .store
            .rewrite(move |points| {
                let mut optimized = strategy.apply(points, optimizer);
                if let Some(kept) = keep {
                    optimized.retain(|p| p.lux.abs_diff(kept.lux) > MERGE_TOLERANCE_LUX);
                    optimized.push(kept);
                }
                optimized
            })
            .await
            .inspect_err(|err| self.report_persistence_failure(err))?;

        log_info!("Calibration optimized with {strategy:?}: {before} -> {after} points");
        self.emit(EngineEvent::CalibrationOptimized {
            strategy,
            before,
            after,
        });
        Ok((before, after))
    }

    /// Drop every calibration point within the merge tolerance of `lux`.
    pub async fn forget_calibration_near(&self, lux: u32) -> EngineResult<usize> {
        self.store
            .remove_near(lux, MERGE_TOLERANCE_LUX)
            .await
            .inspect_err(|err| self.report_persistence_failure(err))
    }

    pub async fn reset_calibration(&self) -> EngineResult<()> {
        self.store
            .clear()
            .await
            .inspect_err(|err| self.report_persistence_failure(err))
    }

    pub async fn calibration_stats(&self) -> CalibrationStats {
        self.store.stats().await
    }

    fn report_persistence_failure(&self, err: &EngineError) {
        log_warn!("{err}; continuing with the in-memory calibration");
        self.emit(EngineEvent::PersistenceFailed {
            message: err.to_string(),
        });
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MemoryPersistence;
    use anyhow::{anyhow, Result};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingActuator {
        applied: StdMutex<Vec<u8>>,
        refuse: bool,
    }

    impl RecordingActuator {
        fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::default()
            }
        }
    }

    impl BrightnessActuator for RecordingActuator {
        async fn set(&self, percentage: u8) -> Result<()> {
            if self.refuse {
                return Err(anyhow!("backlight is read-only"));
            }
            self.applied.lock().unwrap().push(percentage);
            Ok(())
        }

        async fn get_current(&self) -> Result<u8> {
            Ok(self.applied.lock().unwrap().last().copied().unwrap_or(42))
        }
    }

    async fn pipeline_with(
        actuator: RecordingActuator,
        points: Vec<CalibrationPoint>,
    ) -> IngestionPipeline<RecordingActuator, MemoryPersistence> {
        let store = CalibrationStore::hydrate(MemoryPersistence::with_points(points)).await;
        IngestionPipeline::new(actuator, store, PipelineConfig::default())
    }

    fn applied(pipeline: &IngestionPipeline<RecordingActuator, MemoryPersistence>) -> Vec<u8> {
        pipeline.actuator().applied.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_sensor_line_uses_calibration() {
        let now = Utc::now();
        let pipeline = pipeline_with(
            RecordingActuator::default(),
            vec![CalibrationPoint::new(100, 20, now), CalibrationPoint::new(500, 60, now)],
        )
        .await;

        let decision = pipeline.handle_line("LUX:300").await.unwrap();

        assert_eq!(decision.brightness, 40);
        assert_eq!(decision.curve, CurveSource::Calibration);
        assert!(decision.applied());
        assert_eq!(applied(&pipeline), vec![40]);
        assert_eq!(pipeline.snapshot().await.readings_accepted, 1);
    }

    #[tokio::test]
    async fn test_malformed_line_is_counted_and_reported() {
        let pipeline = pipeline_with(RecordingActuator::default(), Vec::new()).await;
        let mut events = pipeline.subscribe();

        let err = pipeline.handle_line("no numbers here").await.unwrap_err();

        assert!(matches!(err, EngineError::MalformedReading { .. }));
        assert_eq!(pipeline.snapshot().await.readings_rejected, 1);
        assert!(applied(&pipeline).is_empty());
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::ReadingRejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_actuation_failure_does_not_learn() {
        let pipeline = pipeline_with(RecordingActuator::refusing(), Vec::new()).await;

        let decision = pipeline.handle_line("LUX:1000").await.unwrap();

        assert!(!decision.applied());
        assert!(matches!(
            decision.failure,
            Some(EngineError::ActuationFailure(_))
        ));
        assert!(pipeline.store().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adjustment_without_sample_is_not_learned() {
        let pipeline = pipeline_with(RecordingActuator::default(), Vec::new()).await;

        pipeline.adjust_brightness(70).await;
        time::sleep(Duration::from_millis(400)).await;

        assert_eq!(applied(&pipeline), vec![70]);
        assert!(pipeline.store().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_adjustment_is_still_learned() {
        let pipeline = pipeline_with(RecordingActuator::refusing(), Vec::new()).await;
        pipeline.handle_line("LUX:250").await.unwrap();

        pipeline.adjust_brightness(33).await;
        time::sleep(Duration::from_millis(400)).await;

        let points = pipeline.store().all().await;
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].lux, points[0].brightness), (250, 33));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adjustment_is_clamped() {
        let pipeline = pipeline_with(RecordingActuator::default(), Vec::new()).await;
        pipeline.handle_line("LUX:80").await.unwrap();

        pipeline.adjust_brightness(180).await;
        time::sleep(Duration::from_millis(400)).await;

        assert_eq!(applied(&pipeline).last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_learning_triggers_compaction() {
        let now = Utc::now();
        let crowded: Vec<CalibrationPoint> = (0..24)
            .map(|i| CalibrationPoint::new(i * 100, (10 + i * 3) as u8, now))
            .collect();
        let pipeline = pipeline_with(RecordingActuator::default(), crowded).await;
        let mut events = pipeline.subscribe();

        pipeline.handle_line("LUX:2450").await.unwrap();
        pipeline.adjust_brightness(83).await;
        time::sleep(Duration::from_millis(400)).await;

        assert!(pipeline.store().len().await < 25);
        let mut compacted = false;
        while let Ok(event) = events.try_recv() {
            if let EngineEvent::CalibrationOptimized { strategy, before, .. } = event {
                assert_eq!(strategy, OptimizeStrategy::Compact);
                assert_eq!(before, 25);
                compacted = true;
            }
        }
        assert!(compacted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compaction_keeps_the_learned_point() {
        let now = Utc::now();
        let crowded: Vec<CalibrationPoint> = (0..24)
            .map(|i| CalibrationPoint::new(i * 100, (10 + i * 3) as u8, now))
            .collect();
        let pipeline = pipeline_with(RecordingActuator::default(), crowded).await;

        let before = pipeline.handle_line("LUX:1250").await.unwrap();
        assert_eq!(before.brightness, 48);

        pipeline.adjust_brightness(60).await;
        time::sleep(Duration::from_millis(400)).await;

        let near: Vec<(u32, u8)> = pipeline
            .store()
            .all()
            .await
            .iter()
            .filter(|p| p.lux.abs_diff(1250) <= MERGE_TOLERANCE_LUX)
            .map(|p| (p.lux, p.brightness))
            .collect();
        assert_eq!(near, vec![(1250, 60)]);
        assert!(pipeline.store().len().await <= 24);

        let after = pipeline.handle_line("LUX:1250").await.unwrap();
        assert_eq!(after.brightness, 60);
        assert_eq!(after.curve, CurveSource::Calibration);
    }

    #[tokio::test]
    async fn test_seed_manual_control() {
        let pipeline = pipeline_with(RecordingActuator::default(), Vec::new()).await;
        assert_eq!(pipeline.seed_manual_control().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_maintenance_operations() {
        let now = Utc::now();
        let pipeline = pipeline_with(
            RecordingActuator::default(),
            vec![
                CalibrationPoint::new(100, 20, now),
                CalibrationPoint::new(400, 50, now),
                CalibrationPoint::new(900, 80, now),
            ],
        )
        .await;

        assert_eq!(pipeline.forget_calibration_near(405).await.unwrap(), 1);
        assert_eq!(pipeline.calibration_stats().await.count, 2);

        pipeline.reset_calibration().await.unwrap();
        assert!(pipeline.store().is_empty().await);
        assert!(pipeline.store().persistence().snapshot().is_empty());
    }
}
