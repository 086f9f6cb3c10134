use std::sync::Arc;

use log::{info, warn};
use tokio::sync::RwLock;

use crate::curve::LUX_CEILING;
use crate::error::{EngineError, EngineResult};
use crate::models::{CalibrationPoint, CalibrationStats};
use crate::ports::CalibrationPersistence;

/// Points closer than this (inclusive) are the same measurement.
pub const MERGE_TOLERANCE_LUX: u32 = 10;

/// Owns the authoritative calibration set.
///
/// Mutations take the write lock, so they are serialized with each other and
/// with the persistence write that follows them. Readers share the read lock
/// and always see a whole set.
///
/// Every mutation is applied in memory first. When the persistence write
/// fails the mutation stays applied and `PersistenceFailure` is returned.
pub struct CalibrationStore<P> {
    points: Arc<RwLock<Vec<CalibrationPoint>>>,
    persistence: Arc<P>,
    hydration_error: Option<EngineError>,
}

impl<P> Clone for CalibrationStore<P> {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
            persistence: self.persistence.clone(),
            hydration_error: self.hydration_error.clone(),
        }
    }
}

impl<P: CalibrationPersistence> CalibrationStore<P> {
    /// Build the store from whatever `persistence` holds.
    ///
    /// A load failure is not fatal: the store starts empty and keeps the
    /// failure in [`hydration_error`](Self::hydration_error).
    pub async fn hydrate(persistence: P) -> Self {
        let (points, hydration_error) = match persistence.load().await {
            Ok(mut points) => {
                points.sort_by_key(|p| p.lux);
                info!("Hydrated {} calibration points", points.len());
                (points, None)
            }
            Err(err) => {
                warn!("Failed to load calibration, starting empty: {err:#}");
                (Vec::new(), Some(EngineError::persistence(&err)))
            }
        };

        Self {
            points: Arc::new(RwLock::new(points)),
            persistence: Arc::new(persistence),
            hydration_error,
        }
    }

    pub fn hydration_error(&self) -> Option<&EngineError> {
        self.hydration_error.as_ref()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Add `point`, replacing every point within the merge tolerance.
    pub async fn insert(&self, point: CalibrationPoint) -> EngineResult<()> {
        let mut guard = self.points.write().await;
        guard.retain(|existing| existing.lux.abs_diff(point.lux) > MERGE_TOLERANCE_LUX);
        guard.push(point);
        guard.sort_by_key(|p| p.lux);
        self.persist(&guard).await
    }

    /// Replace the whole set, e.g. with an optimizer result.
    pub async fn insert_many(&self, points: Vec<CalibrationPoint>) -> EngineResult<()> {
        let mut guard = self.points.write().await;
        *guard = points;
        guard.sort_by_key(|p| p.lux);
        self.persist(&guard).await
    }

    /// Replace the set with `rewrite(current set)` under a single write lock.
    ///
    /// Returns the point counts before and after.
    pub async fn rewrite<F>(&self, rewrite: F) -> EngineResult<(usize, usize)>
    where
        F: FnOnce(&[CalibrationPoint]) -> Vec<CalibrationPoint> + Send,
    {
        let mut guard = self.points.write().await;
        let before = guard.len();
        let mut next = rewrite(guard.as_slice());
        next.sort_by_key(|p| p.lux);
        let after = next.len();
        *guard = next;
        self.persist(&guard).await.map(|()| (before, after))
    }

    /// Remove every point in `[lux - tolerance, lux + tolerance]`.
    ///
    /// Returns how many points were removed. Nothing is persisted when no
    /// point matched.
    pub async fn remove_near(&self, lux: u32, tolerance: u32) -> EngineResult<usize> {
        let mut guard = self.points.write().await;
        let before = guard.len();
        guard.retain(|p| p.lux.abs_diff(lux) > tolerance);
        let removed = before - guard.len();
        if removed > 0 {
            self.persist(&guard).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> EngineResult<()> {
        let mut guard = self.points.write().await;
        guard.clear();
        self.persist(&guard).await
    }

    /// Snapshot of the set, sorted by lux. It does not follow later writes.
    pub async fn all(&self) -> Vec<CalibrationPoint> {
        self.points.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    pub async fn stats(&self) -> CalibrationStats {
        let guard = self.points.read().await;
        compute_stats(&guard)
    }

    async fn persist(&self, points: &[CalibrationPoint]) -> EngineResult<()> {
        self.persistence.save(points).await.map_err(|err| {
            warn!("Failed to persist {} calibration points: {err:#}", points.len());
            EngineError::persistence(&err)
        })
    }
}

fn compute_stats(points: &[CalibrationPoint]) -> CalibrationStats {
    let (Some(min_lux), Some(max_lux)) = (
        points.iter().map(|p| p.lux).min(),
        points.iter().map(|p| p.lux).max(),
    ) else {
        return CalibrationStats::default();
    };

    let min_brightness = points.iter().map(|p| p.brightness).min().unwrap_or(0);
    let max_brightness = points.iter().map(|p| p.brightness).max().unwrap_or(0);
    let coverage = (f64::from(max_lux - min_lux) / LUX_CEILING).clamp(0.0, 1.0);

    CalibrationStats {
        count: points.len(),
        min_lux,
        max_lux,
        min_brightness,
        max_brightness,
        coverage,
    }
}
