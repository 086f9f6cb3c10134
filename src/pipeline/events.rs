//! Structured events for whatever presents the engine's activity.
//!
//! The engine keeps no log buffer of its own. Every decision and diagnostic is
//! broadcast as an [`EngineEvent`]; a send without subscribers is dropped.

use serde::Serialize;

use crate::curve::CurveSource;
use crate::models::CalibrationPoint;
use crate::optimizer::OptimizeStrategy;

use super::SessionStatus;

/// Where a brightness decision came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DecisionOrigin {
    Sensor,
    Manual,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    SessionStateChanged {
        session_id: Option<String>,
        status: SessionStatus,
        reason: Option<String>,
    },

    /// `curve` is `None` for manual adjustments.
    #[serde(rename_all = "camelCase")]
    BrightnessDecided {
        lux: u32,
        brightness: u8,
        curve: Option<CurveSource>,
        origin: DecisionOrigin,
        applied: bool,
        error: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ReadingRejected { line: String, reason: String },

    #[serde(rename_all = "camelCase")]
    CalibrationLearned { point: CalibrationPoint },

    #[serde(rename_all = "camelCase")]
    CalibrationOptimized {
        strategy: OptimizeStrategy,
        before: usize,
        after: usize,
    },

    #[serde(rename_all = "camelCase")]
    PersistenceFailed { message: String },

    #[serde(rename_all = "camelCase")]
    ManualControlSeeded { brightness: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_are_tagged_camel_case() {
        let event = EngineEvent::BrightnessDecided {
            lux: 300,
            brightness: 40,
            curve: Some(CurveSource::Calibration),
            origin: DecisionOrigin::Sensor,
            applied: true,
            error: None,
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "brightnessDecided",
                "lux": 300,
                "brightness": 40,
                "curve": "calibration",
                "origin": "sensor",
                "applied": true,
                "error": null,
            })
        );
    }

    #[test]
    fn test_session_event_fields() {
        let event = EngineEvent::SessionStateChanged {
            session_id: Some("s-1".into()),
            status: SessionStatus::Disconnected,
            reason: Some("sensor stream ended".into()),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "sessionStateChanged");
        assert_eq!(value["sessionId"], "s-1");
        assert_eq!(value["status"], "disconnected");
    }
}
