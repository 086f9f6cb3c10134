pub mod config;
pub mod controller;
pub mod events;
pub mod state;

pub use config::{PipelineConfig, DEFAULT_DEBOUNCE};
pub use controller::{BrightnessDecision, IngestionPipeline};
pub use events::{DecisionOrigin, EngineEvent};
pub use state::{SessionState, SessionStatus};
