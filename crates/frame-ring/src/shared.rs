//! Shared Ring Buffer Handle

use crate::{BufferError, Drained, RingBuffer, RingGeometry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Point-in-time counters of a shared ring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    pub write_cursor: u64,
    pub read_cursor: u64,
    pub available_frames: usize,
    pub partial_offset: usize,
    pub dropped_frames: u64,
    pub eof: bool,
}

struct Shared {
    ring: Mutex<RingBuffer>,
    eof: AtomicBool,
}

/// Cloneable handle to a ring buffer shared by one producer and one consumer.
///
/// `append` and `drain_all` take the same lock for the duration of their copy.
/// The end-of-stream flag lives outside the lock so the render loop can poll it
/// freely.
#[derive(Clone)]
pub struct SharedRingBuffer {
    inner: Arc<Shared>,
}

impl SharedRingBuffer {
    /// Wrap a ring for shared use
    pub fn new(ring: RingBuffer) -> Self {
        let eof = AtomicBool::new(ring.is_eof());
        Self {
            inner: Arc::new(Shared {
                ring: Mutex::new(ring),
                eof,
            }),
        }
    }

    /// Create a shared ring from a geometry
    pub fn with_geometry(geometry: RingGeometry) -> Result<Self, BufferError> {
        RingBuffer::with_geometry(geometry).map(Self::new)
    }

    /// Append a chunk under the lock, returning the frames it displaced
    pub fn append(&self, chunk: &[u8]) -> u64 {
        let dropped = self.inner.ring.lock().append(chunk);
        log_overrun(dropped);
        dropped
    }

    /// Append the first `filled` bytes of a read buffer under the lock
    pub fn append_read(&self, scratch: &[u8], filled: usize) -> Result<u64, BufferError> {
        let dropped = self.inner.ring.lock().append_read(scratch, filled)?;
        log_overrun(dropped);
        Ok(dropped)
    }

    /// Drain every complete frame under the lock
    pub fn drain_all(&self, destination: &mut [u8]) -> Result<Drained, BufferError> {
        self.inner.ring.lock().drain_all(destination)
    }

    /// Mark the stream as ended
    pub fn mark_eof(&self) {
        self.inner.ring.lock().mark_eof();
        self.inner.eof.store(true, Ordering::Release);
    }

    /// Whether the stream has ended. Does not take the lock.
    pub fn is_eof(&self) -> bool {
        self.inner.eof.load(Ordering::Acquire)
    }

    /// Get the ring geometry
    pub fn geometry(&self) -> RingGeometry {
        self.inner.ring.lock().geometry()
    }

    /// Snapshot the ring counters
    pub fn stats(&self) -> RingStats {
        let ring = self.inner.ring.lock();
        RingStats {
            write_cursor: ring.write_cursor(),
            read_cursor: ring.read_cursor(),
            available_frames: ring.available_frames(),
            partial_offset: ring.partial_offset(),
            dropped_frames: ring.dropped_frames(),
            eof: self.is_eof(),
        }
    }
}

// Runs after the guard is dropped; no logging under the lock.
fn log_overrun(dropped: u64) {
    if dropped > 0 {
        debug!(dropped, "Ring overrun, oldest frames discarded");
    }
}

impl std::fmt::Debug for SharedRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRingBuffer")
            .field("eof", &self.is_eof())
            .finish_non_exhaustive()
    }
}
