//! Pump Error Types

use frame_ring::BufferError;
use thiserror::Error;

/// Errors setting up or tearing down the producer/consumer pair
#[derive(Debug, Error)]
pub enum PumpError {
    /// Invalid adapter configuration
    #[error("Invalid pump configuration: {0}")]
    Config(String),

    /// Unrecognized source description
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Source could not be opened
    #[error("Failed to open source {target}: {error}")]
    Open {
        target: String,
        #[source]
        error: std::io::Error,
    },

    /// Producer thread could not be started
    #[error("Failed to spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Producer thread panicked before reporting
    #[error("Producer thread panicked")]
    ProducerPanicked,

    /// Ring buffer error
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
