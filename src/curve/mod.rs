pub mod analytic;
pub mod interpolation;

use serde::{Deserialize, Serialize};

use crate::models::{CalibrationPoint, MappingMode};

pub use analytic::{analytic_brightness, LUX_CEILING};
pub use interpolation::{interpolate, sorted_by_lux};

/// Which curve produced a brightness value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CurveSource {
    Analytic,
    Calibration,
}

/// Brightness percentage for `lux`.
///
/// Calibration always takes precedence; `mode` only picks the analytic curve
/// used while the set is empty.
pub fn brightness_for(lux: u32, calibration: &[CalibrationPoint], mode: MappingMode) -> u8 {
    evaluate(lux, calibration, mode).0
}

/// Like [`brightness_for`], also reporting which curve was used.
pub fn evaluate(
    lux: u32,
    calibration: &[CalibrationPoint],
    mode: MappingMode,
) -> (u8, CurveSource) {
    match interpolate(lux, calibration) {
        Some(brightness) => (brightness, CurveSource::Calibration),
        None => (analytic_brightness(lux, mode), CurveSource::Analytic),
    }
}
