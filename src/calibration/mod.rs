pub mod store;

pub use store::{CalibrationStore, MERGE_TOLERANCE_LUX};
