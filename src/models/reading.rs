//! Light sample data model.
//!
//! A `LightSample` is produced by the reading parser for every accepted sensor
//! line and discarded once the brightness decision for it has been made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LightSample {
    pub lux: u32,
    pub observed_at: DateTime<Utc>,
}

impl LightSample {
    pub fn new(lux: u32, observed_at: DateTime<Utc>) -> Self {
        Self { lux, observed_at }
    }
}
