use std::time::Duration;

use log::warn;

use crate::models::MappingMode;
use crate::optimizer::OptimizerConfig;

/// Quiet period after the last manual adjustment before it is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub debounce: Duration,

    /// Analytic curve used while the calibration set is empty.
    pub mode: MappingMode,

    /// Events buffered per subscriber before the slowest one starts lagging.
    pub event_capacity: usize,

    /// Compact the calibration set once a learned point leaves more than this many.
    pub auto_optimize_above: Option<usize>,

    pub optimizer: OptimizerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            mode: MappingMode::Forward,
            event_capacity: 64,
            auto_optimize_above: Some(24),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `LUMEN_DEBOUNCE_MS`, `LUMEN_MAPPING_MODE` and
    /// `LUMEN_AUTO_OPTIMIZE_ABOVE`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("LUMEN_DEBOUNCE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.debounce = Duration::from_millis(ms),
                Err(err) => warn!("Ignoring LUMEN_DEBOUNCE_MS={raw:?}: {err}"),
            }
        }

        if let Some(raw) = lookup("LUMEN_MAPPING_MODE") {
            match raw.parse::<MappingMode>() {
                Ok(mode) => self.mode = mode,
                Err(err) => warn!("Ignoring LUMEN_MAPPING_MODE={raw:?}: {err}"),
            }
        }

        if let Some(raw) = lookup("LUMEN_AUTO_OPTIMIZE_ABOVE") {
            match raw.trim().parse::<usize>() {
                Ok(0) => self.auto_optimize_above = None,
                Ok(limit) => self.auto_optimize_above = Some(limit),
                Err(err) => warn!("Ignoring LUMEN_AUTO_OPTIMIZE_ABOVE={raw:?}: {err}"),
            }
        }

        self
    }
}
