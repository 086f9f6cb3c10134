use crate::curve::sorted_by_lux;
use crate::models::{CalibrationPoint, MAX_BRIGHTNESS};
use crate::optimizer::config::OptimizerConfig;

/// Adaptive curve fitting: denoise each lighting regime on its own.
///
/// The sorted set is cut into segments at lux or brightness discontinuities,
/// every segment is smoothed with a centered moving average, and the fitted
/// segments are joined back in lux order. A segment that opens with a point
/// carried across a discontinuity keeps that point unchanged and leaves it out
/// of its averages. Sets smaller than `fit_min_points` are returned unchanged.
pub fn adaptive_curve_fitting(
    points: &[CalibrationPoint],
    config: &OptimizerConfig,
) -> Vec<CalibrationPoint> {
    let points = sorted_by_lux(points);
    if points.len() < config.fit_min_points {
        return points.into_owned();
    }

    let mut result: Vec<CalibrationPoint> = Vec::with_capacity(points.len());
    for segment in detect_segments(&points, config) {
        let fitted = match segment.split_first() {
            Some((carried, rest))
                if rest
                    .first()
                    .is_some_and(|next| is_discontinuity(carried, next, config)) =>
            {
                let mut fitted = vec![*carried];
                fitted.extend(fit_segment(rest, config));
                fitted
            }
            _ => fit_segment(&segment, config),
        };

        for point in fitted {
            // Consecutive segments share their boundary point
            if result.last() != Some(&point) {
                result.push(point);
            }
        }
    }

    result
}

/// Split sorted points into segments at discontinuities.
///
/// When a step between neighbours exceeds either gap, the current segment is
/// closed and the next one opens with the boundary point carried forward, so
/// neighbouring segments overlap by one point. A closed segment holding a
/// single point is dropped; its point lives on in the following segment.
pub fn detect_segments(
    points: &[CalibrationPoint],
    config: &OptimizerConfig,
) -> Vec<Vec<CalibrationPoint>> {
    let mut segments = Vec::new();
    let mut current: Vec<CalibrationPoint> = Vec::new();

    for &point in points {
        match current.last().copied() {
            Some(previous) if is_discontinuity(&previous, &point, config) => {
                let closed = std::mem::replace(&mut current, vec![previous, point]);
                if closed.len() > 1 {
                    segments.push(closed);
                }
            }
            _ => current.push(point),
        }
    }

    if current.len() > 1 {
        segments.push(current);
    }

    segments
}

fn is_discontinuity(
    previous: &CalibrationPoint,
    next: &CalibrationPoint,
    config: &OptimizerConfig,
) -> bool {
    next.lux.abs_diff(previous.lux) > config.segment_lux_gap
        || next.brightness.abs_diff(previous.brightness) > config.segment_brightness_gap
}

/// Smooth the interior points of one segment.
///
/// Endpoints are kept. An interior point whose brightness is further than
/// `smoothing_deviation` from the average of its window is replaced by a point
/// with the same lux and timestamp and the rounded average. Averages always
/// use the original brightness values. Segments of two points or fewer pass
/// through.
pub fn fit_segment(segment: &[CalibrationPoint], config: &OptimizerConfig) -> Vec<CalibrationPoint> {
    let len = segment.len();
    if len <= 2 {
        return segment.to_vec();
    }

    let window_size = config.smoothing_window.clamp(1, len);
    let mut fitted = Vec::with_capacity(len);
    fitted.push(segment[0]);

    for i in 1..len - 1 {
        let start = i.saturating_sub(1);
        let end = (start + window_size).min(len);
        let window = &segment[start..end];

        let average = window
            .iter()
            .map(|p| f64::from(p.brightness))
            .sum::<f64>()
            / window.len() as f64;

        let point = segment[i];
        if (f64::from(point.brightness) - average).abs() > config.smoothing_deviation {
            let smoothed = average.round().clamp(0.0, f64::from(MAX_BRIGHTNESS)) as u8;
            fitted.push(point.with_brightness(smoothed));
        } else {
            fitted.push(point);
        }
    }

    fitted.push(segment[len - 1]);
    fitted
}
