use std::borrow::Cow;

use log::debug;

use crate::models::{CalibrationPoint, MAX_BRIGHTNESS};

/// Borrow the points when already ordered by lux, otherwise sort a copy.
pub fn sorted_by_lux(points: &[CalibrationPoint]) -> Cow<'_, [CalibrationPoint]> {
    if points.windows(2).all(|w| w[0].lux <= w[1].lux) {
        Cow::Borrowed(points)
    } else {
        let mut owned = points.to_vec();
        owned.sort_by_key(|p| p.lux);
        Cow::Owned(owned)
    }
}

/// Piecewise-linear brightness over the calibration points.
///
/// - At or below the lowest point: that point's brightness
/// - At or above the highest point: that point's brightness
/// - Between two points: linear interpolation, clamped to [0, 100]
///
/// Returns `None` for an empty set.
pub fn interpolate(lux: u32, points: &[CalibrationPoint]) -> Option<u8> {
    let points = sorted_by_lux(points);
    let first = points.first()?;
    let last = points.last()?;

    if lux <= first.lux {
        return Some(first.brightness);
    }
    if lux >= last.lux {
        return Some(last.brightness);
    }

    let bracket = points
        .windows(2)
        .find(|w| w[0].lux <= lux && lux <= w[1].lux)
        .map(|w| interpolate_pair(&w[0], &w[1], lux));

    Some(bracket.unwrap_or(last.brightness))
}

/// Interpolate between a bracketing pair.
///
/// Two points sharing a lux value only exist when the merge invariant was
/// bypassed; the lower point's brightness is returned.
pub fn interpolate_pair(p1: &CalibrationPoint, p2: &CalibrationPoint, lux: u32) -> u8 {
    if p1.lux == p2.lux {
        debug!(
            "Degenerate calibration pair at {} lux ({}% / {}%)",
            p1.lux, p1.brightness, p2.brightness
        );
        return p1.brightness;
    }

    let ratio = (f64::from(lux) - f64::from(p1.lux)) / (f64::from(p2.lux) - f64::from(p1.lux));
    let value =
        f64::from(p1.brightness) + (f64::from(p2.brightness) - f64::from(p1.brightness)) * ratio;

    value.round().clamp(0.0, f64::from(MAX_BRIGHTNESS)) as u8
}
