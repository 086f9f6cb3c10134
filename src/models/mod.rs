pub mod calibration;
pub mod mapping;
pub mod reading;

pub use calibration::{CalibrationPoint, CalibrationStats, MAX_BRIGHTNESS};
pub use mapping::MappingMode;
pub use reading::LightSample;
