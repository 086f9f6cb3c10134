//! Engine error kinds.
//!
//! None of these is fatal: the worst outcome of any of them is that the
//! brightness does not change this cycle.

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The line carried no digit run. The reading is dropped.
    #[error("malformed reading: {line:?}")]
    MalformedReading { line: String },

    /// The brightness actuator refused or failed the request.
    #[error("brightness actuation failed: {0}")]
    ActuationFailure(String),

    /// Calibration could not be loaded or saved. The store keeps working in memory.
    #[error("calibration persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("an ingestion session is already connected")]
    SessionActive,
}

impl EngineError {
    pub fn malformed(line: &str) -> Self {
        EngineError::MalformedReading {
            line: line.to_string(),
        }
    }

    /// Wraps a collaborator failure, keeping the whole context chain.
    pub fn actuation(err: &anyhow::Error) -> Self {
        EngineError::ActuationFailure(format!("{err:#}"))
    }

    pub fn persistence(err: &anyhow::Error) -> Self {
        EngineError::PersistenceFailure(format!("{err:#}"))
    }
}
