//! Error types for the skybus broker

use thiserror::Error;

/// Core skybus errors
#[derive(Error, Debug)]
pub enum BusError {
    // Wire errors
    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("Message too large: {size} exceeds {max} reassembled bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Receiver already started")]
    AlreadyStarted,

    #[error("Socket not started")]
    NotStarted,

    // Dispatch errors
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Image capture failed: {0}")]
    ImageCapture(String),
}

impl From<std::io::Error> for BusError {
    fn from(e: std::io::Error) -> Self {
        BusError::Transport(e.to_string())
    }
}

/// Result type for skybus operations
pub type BusResult<T> = Result<T, BusError>;
