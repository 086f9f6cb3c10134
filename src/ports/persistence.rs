//! Calibration persistence port.
//!
//! The calibration store shadows every mutation to this port and hydrates from
//! it once at construction. Encoding is the adapter's concern; the logical
//! shape is an ordered list of `{lux, brightness, recorded_at}` records.

use std::future::Future;
use std::sync::Mutex;

use anyhow::Result;

use crate::models::CalibrationPoint;

pub trait CalibrationPersistence: Send + Sync + 'static {
    /// Load the persisted set, in stored order.
    fn load(&self) -> impl Future<Output = Result<Vec<CalibrationPoint>>> + Send;

    /// Replace the persisted set with `points`.
    fn save(&self, points: &[CalibrationPoint]) -> impl Future<Output = Result<()>> + Send;
}

/// Keeps the set in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    points: Mutex<Vec<CalibrationPoint>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(points: Vec<CalibrationPoint>) -> Self {
        Self {
            points: Mutex::new(points),
        }
    }

    pub fn snapshot(&self) -> Vec<CalibrationPoint> {
        match self.points.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CalibrationPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Vec<CalibrationPoint>> {
        Ok(self.snapshot())
    }

    async fn save(&self, points: &[CalibrationPoint]) -> Result<()> {
        let mut guard = match self.points.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = points.to_vec();
        Ok(())
    }
}
