pub mod config;
pub mod fitting;
pub mod pruning;

use serde::{Deserialize, Serialize};

use crate::models::CalibrationPoint;

pub use config::OptimizerConfig;
pub use fitting::adaptive_curve_fitting;
pub use pruning::optimize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OptimizeStrategy {
    /// Deviation pruning only
    Prune,
    /// Per-segment smoothing only
    AdaptiveFit,
    /// Smoothing followed by pruning
    Compact,
}

impl OptimizeStrategy {
    pub fn apply(
        &self,
        points: &[CalibrationPoint],
        config: &OptimizerConfig,
    ) -> Vec<CalibrationPoint> {
        match self {
            OptimizeStrategy::Prune => optimize(points, config),
            OptimizeStrategy::AdaptiveFit => adaptive_curve_fitting(points, config),
            OptimizeStrategy::Compact => optimize(&adaptive_curve_fitting(points, config), config),
        }
    }
}
