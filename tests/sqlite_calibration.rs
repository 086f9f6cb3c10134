mod common;

use std::time::Duration;

use common::{next_matching, pairs, RecordingActuator};
use lumen_lib::{
    CalibrationPoint, CalibrationStore, Database, EngineError, EngineEvent, IngestionPipeline,
    OptimizeStrategy, PipelineConfig,
};

fn quick_config() -> PipelineConfig {
    PipelineConfig {
        debounce: Duration::from_millis(10),
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn learned_points_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.sqlite3");

    {
        let store = CalibrationStore::hydrate(Database::new(path.clone()).unwrap()).await;
        assert!(store.hydration_error().is_none());
        let pipeline = IngestionPipeline::new(RecordingActuator::default(), store, quick_config());
        let mut events = pipeline.subscribe();

        pipeline.handle_line("LUX:300").await.unwrap();
        pipeline.adjust_brightness(60).await;
        next_matching(&mut events, |event| {
            matches!(event, EngineEvent::CalibrationLearned { .. })
        })
        .await;
    }

    let reopened = CalibrationStore::hydrate(Database::new(path).unwrap()).await;
    assert_eq!(pairs(&reopened.all().await), vec![(300, 60)]);
}

#[tokio::test]
async fn optimized_set_is_written_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.sqlite3");
    let now = chrono::Utc::now();

    let store = CalibrationStore::hydrate(Database::new(path.clone()).unwrap()).await;
    store
        .insert_many(
            [(0, 0), (100, 10), (200, 20), (300, 30)]
                .iter()
                .map(|&(lux, brightness)| CalibrationPoint::new(lux, brightness, now))
                .collect(),
        )
        .await
        .unwrap();
    let pipeline = IngestionPipeline::new(RecordingActuator::default(), store, quick_config());

    let counts = pipeline
        .optimize_calibration(OptimizeStrategy::Prune)
        .await
        .unwrap();
    assert_eq!(counts, (4, 2));

    let reopened = CalibrationStore::hydrate(Database::new(path).unwrap()).await;
    assert_eq!(pairs(&reopened.all().await), vec![(0, 0), (300, 30)]);
}

#[tokio::test]
async fn undecodable_rows_start_an_empty_calibration() {
    let db = Database::in_memory().unwrap();
    db.execute(|conn| {
        conn.execute(
            "INSERT INTO calibration_points (position, lux, brightness, recorded_at)
             VALUES (0, 100, 50, 'not a timestamp')",
            [],
        )?;
        Ok(())
    })
    .await
    .unwrap();

    let store = CalibrationStore::hydrate(db).await;

    assert!(store.is_empty().await);
    assert!(matches!(
        store.hydration_error(),
        Some(EngineError::PersistenceFailure(_))
    ));

    // The next write replaces the unreadable rows.
    store
        .insert(CalibrationPoint::new(450, 52, chrono::Utc::now()))
        .await
        .unwrap();
    let points = store.persistence().load_calibration_points().await.unwrap();
    assert_eq!(pairs(&points), vec![(450, 52)]);
}
