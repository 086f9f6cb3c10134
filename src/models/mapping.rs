use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

/// Direction of the analytic fallback curve.
///
/// Only consulted while no calibration point exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MappingMode {
    /// Brightness falls as ambient light rises.
    Inverse,
    /// Brightness rises with ambient light.
    #[default]
    Forward,
}

impl MappingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMode::Inverse => "inverse",
            MappingMode::Forward => "forward",
        }
    }
}

impl FromStr for MappingMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inverse" => Ok(MappingMode::Inverse),
            "forward" => Ok(MappingMode::Forward),
            other => Err(anyhow!("unknown mapping mode '{other}'")),
        }
    }
}
