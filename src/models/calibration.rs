//! Calibration data models.
//!
//! A `CalibrationPoint` is a remembered (lux, brightness) pair the user
//! confirmed as correct. Points are immutable; the store replaces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest brightness percentage a calibration point may carry.
pub const MAX_BRIGHTNESS: u8 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationPoint {
    pub lux: u32,
    pub brightness: u8,
    pub recorded_at: DateTime<Utc>,
}

impl CalibrationPoint {
    /// Brightness values above 100 are clamped.
    pub fn new(lux: u32, brightness: u8, recorded_at: DateTime<Utc>) -> Self {
        Self {
            lux,
            brightness: brightness.min(MAX_BRIGHTNESS),
            recorded_at,
        }
    }

    /// Same lux and timestamp, different brightness.
    pub fn with_brightness(&self, brightness: u8) -> Self {
        Self::new(self.lux, brightness, self.recorded_at)
    }
}

/// Summary of the calibration set, as reported by `CalibrationStore::stats`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationStats {
    pub count: usize,
    pub min_lux: u32,
    pub max_lux: u32,
    pub min_brightness: u8,
    pub max_brightness: u8,
    /// Fraction of the analytic curve's lux range spanned by the set, in [0, 1].
    pub coverage: f64,
}
