//! Render-Tick Consumer

use crate::PumpError;
use frame_ring::{BufferError, SharedRingBuffer};
use tracing::debug;

/// Receives drained frames once per tick
pub trait FrameSink {
    /// `raw` holds `frame_count` whole frames, back to back
    fn on_frames(&mut self, frame_count: usize, raw: &[u8]);
}

impl<F> FrameSink for F
where
    F: FnMut(usize, &[u8]),
{
    fn on_frames(&mut self, frame_count: usize, raw: &[u8]) {
        self(frame_count, raw)
    }
}

/// Configuration for the consumer
#[derive(Debug, Clone, Default)]
pub struct ConsumerConfig {
    /// Frames one tick can take. Defaults to the ring capacity, which a
    /// drain can never exceed.
    pub max_frames_per_tick: Option<usize>,
}

/// Tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub ticks: u64,
    pub empty_ticks: u64,
    pub frames: u64,
}

/// Drains the shared ring once per render tick and feeds a sink
pub struct Consumer<S> {
    ring: SharedRingBuffer,
    /// Drain destination, allocated once
    scratch: Vec<u8>,
    sink: S,
    stats: ConsumerStats,
}

impl<S: FrameSink> Consumer<S> {
    /// Create a consumer with a destination sized for `max_frames_per_tick`
    pub fn new(ring: SharedRingBuffer, sink: S, config: ConsumerConfig) -> Result<Self, PumpError> {
        let geometry = ring.geometry();
        let frames = config
            .max_frames_per_tick
            .unwrap_or(geometry.capacity_frames);
        if frames == 0 {
            return Err(PumpError::Config("max_frames_per_tick must be positive".into()));
        }

        Ok(Self {
            ring,
            scratch: vec![0u8; frames * geometry.frame_bytes()],
            sink,
            stats: ConsumerStats::default(),
        })
    }

    /// Drain every available frame and hand them to the sink.
    ///
    /// Returns the number of frames delivered; zero is the usual answer
    /// between producer writes. On `Overflow` nothing is consumed.
    pub fn tick(&mut self) -> Result<usize, BufferError> {
        self.stats.ticks += 1;
        let drained = self.ring.drain_all(&mut self.scratch)?;

        if drained.is_empty() {
            self.stats.empty_ticks += 1;
            return Ok(0);
        }

        debug!(frames = drained.frames, "Delivering frames");
        self.stats.frames += drained.frames as u64;
        self.sink
            .on_frames(drained.frames, &self.scratch[..drained.bytes]);
        Ok(drained.frames)
    }

    /// Whether the producer has seen end-of-stream
    pub fn source_closed(&self) -> bool {
        self.ring.is_eof()
    }

    /// Get tick counters
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Consume the consumer, returning its sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}
