//! Ring Buffer Error Types

use thiserror::Error;

/// Errors raised by the frame ring buffer
///
/// Overrunning the ring (producer outpacing the consumer) is not listed here:
/// dropping the oldest unread frames is the retention policy, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Invalid construction parameters
    #[error("Invalid ring geometry: {0}")]
    Config(String),

    /// A chunk length that cannot describe real data
    #[error("Invalid chunk length {length} for a {available}-byte read buffer")]
    Protocol { length: usize, available: usize },

    /// Destination too small for the frames currently available
    #[error("Drain needs {needed} bytes but destination holds {available}")]
    Overflow { needed: usize, available: usize },
}
