//! Ports defining the engine's boundaries.
//!
//! - **BrightnessActuator**: how a decided brightness reaches the display
//! - **CalibrationPersistence**: where the calibration set survives restarts
//! - **LineSource**: where decoded sensor lines come from

pub mod actuator;
pub mod line_source;
pub mod persistence;

pub use actuator::{BrightnessActuator, LogActuator};
pub use line_source::{BufLineSource, LineSource};
pub use persistence::{CalibrationPersistence, MemoryPersistence};
