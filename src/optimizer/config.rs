/// Thresholds for the calibration optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Pruning only runs on sets larger than this
    pub prune_min_points: usize,

    /// Interior points within this many percentage points of the trend line are dropped
    pub prune_deviation: f64,

    /// Curve fitting only runs on sets at least this large
    pub fit_min_points: usize,

    /// Discontinuity heuristic: a lux step above this starts a new segment
    pub segment_lux_gap: u32,

    /// Discontinuity heuristic: a brightness step above this starts a new segment
    pub segment_brightness_gap: u8,

    /// Points averaged around each interior point
    pub smoothing_window: usize,

    /// Interior points further than this from their window average are replaced
    pub smoothing_deviation: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            prune_min_points: 3,
            prune_deviation: 5.0,
            fit_min_points: 3,
            segment_lux_gap: 100,
            segment_brightness_gap: 20,
            smoothing_window: 3,
            smoothing_deviation: 3.0,
        }
    }
}
