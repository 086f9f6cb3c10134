use crate::curve::sorted_by_lux;
use crate::models::CalibrationPoint;
use crate::optimizer::config::OptimizerConfig;

/// Deviation pruning: drop interior points that sit on the existing trend.
///
/// The first and last point always survive. Each interior point is compared
/// with the line from the last *kept* point to the next original point and
/// kept only when it is further than `prune_deviation` from it. Sets of
/// `prune_min_points` or fewer are returned unchanged.
pub fn optimize(points: &[CalibrationPoint], config: &OptimizerConfig) -> Vec<CalibrationPoint> {
    let points = sorted_by_lux(points);
    if points.len() <= config.prune_min_points {
        return points.into_owned();
    }

    let last_index = points.len() - 1;
    let mut kept = vec![points[0]];

    for i in 1..last_index {
        let current = points[i];
        let previous = kept.last().copied().unwrap_or(points[0]);
        let next = points[i + 1];

        let expected = expected_brightness(&previous, &next, current.lux);
        if (f64::from(current.brightness) - expected).abs() > config.prune_deviation {
            kept.push(current);
        }
    }

    kept.push(points[last_index]);
    kept
}

/// Brightness on the straight line from `from` to `to` at `lux`.
fn expected_brightness(from: &CalibrationPoint, to: &CalibrationPoint, lux: u32) -> f64 {
    let start = f64::from(from.brightness);
    if from.lux == to.lux {
        return start;
    }

    let ratio = (f64::from(lux) - f64::from(from.lux)) / (f64::from(to.lux) - f64::from(from.lux));
    start + (f64::from(to.brightness) - start) * ratio
}
