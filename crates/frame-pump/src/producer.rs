//! Producer Thread
//!
//! Reads a blocking byte source on its own thread and appends every chunk to
//! the shared ring until end-of-stream, a read error, or a stop request.

use crate::PumpError;
use frame_ring::{BufferError, SharedRingBuffer};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default pipe capacity on Linux
pub const DEFAULT_READ_CHUNK_BYTES: usize = 65536;

/// Unblocks a pending read on the source, e.g. by shutting down a socket
pub type Interrupter = Box<dyn FnOnce() + Send>;

/// Configuration for the producer thread
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Largest single read from the source
    pub read_chunk_bytes: usize,
    /// Thread name
    pub thread_name: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
            thread_name: "frame-producer".to_string(),
        }
    }
}

/// Why the producer loop ended
#[derive(Debug)]
pub enum ProducerExit {
    /// Source reported a clean end-of-stream; the ring is marked EOF
    EndOfStream,
    /// A stop was requested
    Stopped,
    /// Source read failed
    ReadFailed(std::io::Error),
    /// Ring refused a chunk
    Rejected(BufferError),
}

impl ProducerExit {
    /// Whether the loop ended without an error
    pub fn is_clean(&self) -> bool {
        matches!(self, ProducerExit::EndOfStream | ProducerExit::Stopped)
    }
}

/// Summary of one producer run
#[derive(Debug)]
pub struct ProducerReport {
    pub exit: ProducerExit,
    /// Bytes appended to the ring
    pub bytes: u64,
    /// Reads that returned data
    pub chunks: u64,
}

/// Shared stop flag checked between reads
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Create an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run the read/append loop on the current thread.
///
/// `WouldBlock` and `TimedOut` mean "no data yet" (a polling source) and
/// `Interrupted` is re-issued; both go back to the stop check. Any other read
/// error ends the loop without retrying.
pub fn pump<R: Read>(
    mut source: R,
    ring: &SharedRingBuffer,
    stop: &StopSignal,
    read_chunk_bytes: usize,
) -> ProducerReport {
    let mut scratch = vec![0u8; read_chunk_bytes];
    let mut bytes = 0u64;
    let mut chunks = 0u64;

    let exit = loop {
        if stop.is_stopped() {
            break ProducerExit::Stopped;
        }

        match source.read(&mut scratch) {
            Ok(0) => {
                if stop.is_stopped() {
                    break ProducerExit::Stopped;
                }
                ring.mark_eof();
                info!(bytes, "Source hit EOF");
                break ProducerExit::EndOfStream;
            }
            Ok(n) => {
                if let Err(e) = ring.append_read(&scratch, n) {
                    error!("Source returned an invalid read: {}", e);
                    break ProducerExit::Rejected(e);
                }
                bytes += n as u64;
                chunks += 1;
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(e) => {
                if stop.is_stopped() {
                    debug!("Read aborted during shutdown: {}", e);
                    break ProducerExit::Stopped;
                }
                warn!("Source read failed: {}", e);
                break ProducerExit::ReadFailed(e);
            }
        }
    };

    ProducerReport { exit, bytes, chunks }
}

/// Producer thread handle
pub struct ProducerHandle {
    stop: StopSignal,
    interrupter: Option<Interrupter>,
    thread: JoinHandle<ProducerReport>,
}

impl ProducerHandle {
    /// Spawn the producer thread reading `source` into `ring`
    pub fn spawn<R>(
        source: R,
        ring: SharedRingBuffer,
        config: ProducerConfig,
    ) -> Result<Self, PumpError>
    where
        R: Read + Send + 'static,
    {
        if config.read_chunk_bytes == 0 {
            return Err(PumpError::Config("read_chunk_bytes must be positive".into()));
        }

        let stop = StopSignal::new();
        let thread_stop = stop.clone();
        let chunk = config.read_chunk_bytes;

        let thread = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                info!(chunk, "Producer started");
                let report = pump(source, &ring, &thread_stop, chunk);
                info!(
                    exit = ?report.exit,
                    bytes = report.bytes,
                    chunks = report.chunks,
                    "Producer finished"
                );
                report
            })
            .map_err(PumpError::Spawn)?;

        Ok(Self {
            stop,
            interrupter: None,
            thread,
        })
    }

    /// Attach a callback that unblocks a pending read on stop
    pub fn with_interrupter(mut self, interrupter: Interrupter) -> Self {
        self.interrupter = Some(interrupter);
        self
    }

    /// Get a clone of the stop signal
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Request a stop and unblock the source if possible
    pub fn stop(&mut self) {
        debug!("Stopping producer");
        self.stop.stop();
        if let Some(interrupt) = self.interrupter.take() {
            interrupt();
        }
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the thread to exit
    pub fn join(self) -> Result<ProducerReport, PumpError> {
        self.thread.join().map_err(|_| PumpError::ProducerPanicked)
    }

    /// Stop, then wait for the thread to exit
    pub fn shutdown(mut self) -> Result<ProducerReport, PumpError> {
        self.stop();
        self.join()
    }
}
