use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::LightSample;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub connection: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_sample: Option<LightSample>,
    pub readings_accepted: u64,
    pub readings_rejected: u64,
    /// Bumped by every manual adjustment and by disconnects; a debounced
    /// adjustment only applies while it still holds the latest value.
    #[serde(skip)]
    pub adjustment_generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        connection: String,
        connected_at: DateTime<Utc>,
    ) {
        *self = Self {
            status: SessionStatus::Connected,
            session_id: Some(session_id),
            connection: Some(connection),
            connected_at: Some(connected_at),
            adjustment_generation: self.adjustment_generation.wrapping_add(1),
            ..Self::default()
        };
    }

    /// Keeps id and counters for inspection; drops the last sample and
    /// invalidates any pending adjustment.
    pub fn end_session(&mut self) {
        self.status = SessionStatus::Disconnected;
        self.last_sample = None;
        self.adjustment_generation = self.adjustment_generation.wrapping_add(1);
    }

    pub fn record_sample(&mut self, sample: LightSample) {
        self.last_sample = Some(sample);
        self.readings_accepted = self.readings_accepted.saturating_add(1);
    }

    pub fn record_rejection(&mut self) {
        self.readings_rejected = self.readings_rejected.saturating_add(1);
    }

    /// Lux a manual adjustment is learned against; 0 until a sample arrives.
    pub fn learning_lux(&self) -> u32 {
        self.last_sample.map_or(0, |sample| sample.lux)
    }

    pub fn next_adjustment(&mut self) -> u64 {
        self.adjustment_generation = self.adjustment_generation.wrapping_add(1);
        self.adjustment_generation
    }

    pub fn is_current_adjustment(&self, generation: u64) -> bool {
        self.adjustment_generation == generation
    }
}
