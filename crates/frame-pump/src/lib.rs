//! Frame Pump
//!
//! Moves a byte stream into a [`frame_ring::SharedRingBuffer`] on a dedicated
//! producer thread, and drains whole frames out of it once per render tick.
//!
//! ```text
//! source ──read──▶ producer thread ──append──▶ ring ──drain──▶ consumer ──▶ sink
//! ```

mod consumer;
mod error;
mod producer;
mod source;
mod synthetic;

pub use consumer::{Consumer, ConsumerConfig, ConsumerStats, FrameSink};
pub use error::PumpError;
pub use producer::{
    pump, Interrupter, ProducerConfig, ProducerExit, ProducerHandle, ProducerReport, StopSignal,
    DEFAULT_READ_CHUNK_BYTES,
};
#[cfg(unix)]
pub use source::PollingReader;
pub use source::{OpenedSource, SourceSpec, STDIN_POLL_INTERVAL};
pub use synthetic::{SpectrumConfig, SpectrumSource};
