//! Frame Ring Buffer Implementation

use crate::{BufferError, ElementType};

/// Default number of frames retained (64 frames)
pub const DEFAULT_CAPACITY_FRAMES: usize = 64;

/// Default elements per frame
pub const DEFAULT_FRAME_SIZE: usize = 1024;

/// Fixed shape of a ring buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingGeometry {
    /// Elements per frame
    pub frame_size: usize,
    /// Frames the backing store can hold
    pub capacity_frames: usize,
    /// Bytes per element
    pub element_width: usize,
}

impl Default for RingGeometry {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            capacity_frames: DEFAULT_CAPACITY_FRAMES,
            element_width: std::mem::size_of::<f32>(),
        }
    }
}

impl RingGeometry {
    /// Geometry for frames of `frame_size` elements of the given type
    pub fn for_element(frame_size: usize, capacity_frames: usize, element: ElementType) -> Self {
        Self {
            frame_size,
            capacity_frames,
            element_width: element.element_width(),
        }
    }

    /// Bytes in one frame
    pub fn frame_bytes(&self) -> usize {
        self.frame_size * self.element_width
    }

    /// Total bytes of backing storage
    pub fn storage_bytes(&self) -> usize {
        self.frame_bytes() * self.capacity_frames
    }

    fn validate(&self) -> Result<(), BufferError> {
        if self.frame_size == 0 {
            return Err(BufferError::Config("frame_size must be positive".into()));
        }
        if self.capacity_frames == 0 {
            return Err(BufferError::Config("capacity_frames must be positive".into()));
        }
        if self.element_width == 0 {
            return Err(BufferError::Config("element_width must be positive".into()));
        }
        self.frame_size
            .checked_mul(self.element_width)
            .and_then(|frame| frame.checked_mul(self.capacity_frames))
            .map(|_| ())
            .ok_or_else(|| {
                BufferError::Config(format!(
                    "{} frames of {} x {}-byte elements exceed addressable memory",
                    self.capacity_frames, self.frame_size, self.element_width
                ))
            })
    }
}

/// Result of a successful drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    /// Whole frames copied out
    pub frames: usize,
    /// Bytes written to the destination
    pub bytes: usize,
}

impl Drained {
    /// True when nothing was available
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Frame-aligned byte ring buffer.
///
/// The producer appends byte chunks of any length; the consumer drains every
/// complete frame at once. Cursors count frames and only ever grow, the slot
/// of frame `k` being `k mod capacity_frames`. When the consumer falls behind,
/// the oldest unread frames are dropped so that the most recent ones survive.
pub struct RingBuffer {
    /// Pre-allocated storage, `capacity_frames * frame_bytes` long
    storage: Box<[u8]>,
    geometry: RingGeometry,
    frame_bytes: usize,
    /// Frames ever completed
    write_cursor: u64,
    /// Frames ever consumed or dropped
    read_cursor: u64,
    /// Bytes already written into the in-progress frame
    partial_bytes: usize,
    /// Frames discarded by overruns
    dropped_frames: u64,
    eof: bool,
}

impl RingBuffer {
    /// Create a ring holding `capacity_frames` frames of `frame_size`
    /// elements, each `element_width` bytes wide.
    pub fn new(
        frame_size: usize,
        capacity_frames: usize,
        element_width: usize,
    ) -> Result<Self, BufferError> {
        Self::with_geometry(RingGeometry {
            frame_size,
            capacity_frames,
            element_width,
        })
    }

    /// Create a ring from a geometry
    pub fn with_geometry(geometry: RingGeometry) -> Result<Self, BufferError> {
        geometry.validate()?;
        let storage = vec![0u8; geometry.storage_bytes()].into_boxed_slice();
        Ok(Self {
            storage,
            geometry,
            frame_bytes: geometry.frame_bytes(),
            write_cursor: 0,
            read_cursor: 0,
            partial_bytes: 0,
            dropped_frames: 0,
            eof: false,
        })
    }

    /// Append a chunk read from the source.
    ///
    /// Never blocks and never fails: if the chunk pushes unread data past
    /// capacity the oldest frames are discarded. Returns how many were.
    pub fn append(&mut self, chunk: &[u8]) -> u64 {
        if chunk.is_empty() {
            return 0;
        }

        let total = self.storage.len();
        let start = self.slot_offset(self.write_cursor) + self.partial_bytes;

        if chunk.len() >= total {
            // Only the newest `total` bytes survive. They land exactly where a
            // byte-by-byte copy would have left them.
            let skip = chunk.len() - total;
            self.copy_in((start + skip) % total, &chunk[skip..]);
        } else {
            self.copy_in(start, chunk);
        }

        let carried = self.partial_bytes + chunk.len();
        let completed = carried / self.frame_bytes;
        self.partial_bytes = carried % self.frame_bytes;
        self.write_cursor += completed as u64;

        self.enforce_retention()
    }

    /// Append the first `filled` bytes of a read buffer.
    ///
    /// `filled` comes from a source's read call; a value larger than the
    /// buffer means the source broke its contract.
    pub fn append_read(&mut self, scratch: &[u8], filled: usize) -> Result<u64, BufferError> {
        let chunk = scratch.get(..filled).ok_or(BufferError::Protocol {
            length: filled,
            available: scratch.len(),
        })?;
        Ok(self.append(chunk))
    }

    /// Copy every complete unread frame into `destination`.
    ///
    /// Returns immediately when nothing is available. Fails without touching
    /// any state when `destination` cannot hold all available frames.
    pub fn drain_all(&mut self, destination: &mut [u8]) -> Result<Drained, BufferError> {
        let frames = self.available_frames();
        if frames == 0 {
            return Ok(Drained::default());
        }

        let bytes = frames * self.frame_bytes;
        if bytes > destination.len() {
            return Err(BufferError::Overflow {
                needed: bytes,
                available: destination.len(),
            });
        }

        let at = self.slot_offset(self.read_cursor);
        self.copy_out(at, &mut destination[..bytes]);
        self.read_cursor += frames as u64;

        Ok(Drained { frames, bytes })
    }

    /// Mark the stream as ended. Appends are still accepted afterwards.
    pub fn mark_eof(&mut self) {
        self.eof = true;
    }

    /// Whether the stream has ended
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Number of complete frames waiting to be drained
    pub fn available_frames(&self) -> usize {
        (self.write_cursor - self.read_cursor) as usize
    }

    /// Check if nothing is waiting to be drained
    pub fn is_empty(&self) -> bool {
        self.write_cursor == self.read_cursor
    }

    /// Get the buffer geometry
    pub fn geometry(&self) -> RingGeometry {
        self.geometry
    }

    /// Frames the storage can hold
    pub fn capacity_frames(&self) -> usize {
        self.geometry.capacity_frames
    }

    /// Bytes per element
    pub fn element_width(&self) -> usize {
        self.geometry.element_width
    }

    /// Bytes per frame
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Total frames completed since creation
    pub fn write_cursor(&self) -> u64 {
        self.write_cursor
    }

    /// Total frames consumed or dropped since creation
    pub fn read_cursor(&self) -> u64 {
        self.read_cursor
    }

    /// Whole elements written into the in-progress frame
    pub fn partial_offset(&self) -> usize {
        self.partial_bytes / self.geometry.element_width
    }

    /// Bytes written into the in-progress frame, including a split element
    pub fn partial_bytes(&self) -> usize {
        self.partial_bytes
    }

    /// Frames discarded because the consumer fell behind
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    fn slot_offset(&self, cursor: u64) -> usize {
        (cursor % self.geometry.capacity_frames as u64) as usize * self.frame_bytes
    }

    /// Frames that may stay unread. An in-progress frame writes into the slot
    /// of the oldest frame, so that frame cannot be kept.
    fn retainable_frames(&self) -> u64 {
        let capacity = self.geometry.capacity_frames as u64;
        if self.partial_bytes == 0 {
            capacity
        } else {
            capacity - 1
        }
    }

    fn enforce_retention(&mut self) -> u64 {
        let retained = self.retainable_frames();
        let unread = self.write_cursor - self.read_cursor;
        if unread <= retained {
            return 0;
        }
        let dropped = unread - retained;
        self.read_cursor = self.write_cursor - retained;
        self.dropped_frames += dropped;
        dropped
    }

    fn copy_in(&mut self, at: usize, src: &[u8]) {
        let until_wrap = self.storage.len() - at;
        if src.len() > until_wrap {
            let (head, tail) = src.split_at(until_wrap);
            self.storage[at..].copy_from_slice(head);
            self.storage[..tail.len()].copy_from_slice(tail);
        } else {
            self.storage[at..at + src.len()].copy_from_slice(src);
        }
    }

    fn copy_out(&self, at: usize, dst: &mut [u8]) {
        let until_wrap = self.storage.len() - at;
        if dst.len() > until_wrap {
            let (head, tail) = dst.split_at_mut(until_wrap);
            head.copy_from_slice(&self.storage[at..]);
            tail.copy_from_slice(&self.storage[..tail.len()]);
        } else {
            let len = dst.len();
            dst.copy_from_slice(&self.storage[at..at + len]);
        }
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("geometry", &self.geometry)
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .field("partial_bytes", &self.partial_bytes)
            .field("dropped_frames", &self.dropped_frames)
            .field("eof", &self.eof)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4 frames of 2 x 4-byte elements, 32 bytes of storage
    fn small_ring() -> RingBuffer {
        RingBuffer::new(2, 4, 4).unwrap()
    }

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn test_rejects_zero_geometry() {
        assert!(matches!(RingBuffer::new(0, 4, 4), Err(BufferError::Config(_))));
        assert!(matches!(RingBuffer::new(2, 0, 4), Err(BufferError::Config(_))));
        assert!(matches!(RingBuffer::new(2, 4, 0), Err(BufferError::Config(_))));
        assert!(matches!(
            RingBuffer::new(usize::MAX, 2, 4),
            Err(BufferError::Config(_))
        ));
    }

    #[test]
    fn test_single_frame_round_trip() {
        let mut ring = small_ring();
        let data = ramp(8);
        ring.append(&data);

        let mut out = [0u8; 32];
        let drained = ring.drain_all(&mut out).unwrap();
        assert_eq!(drained, Drained { frames: 1, bytes: 8 });
        assert_eq!(&out[..8], &data[..]);
    }

    #[test]
    fn test_oversized_chunk_keeps_latest_frames() {
        let mut ring = small_ring();
        let data = ramp(40);
        assert_eq!(ring.append(&data), 1);

        assert_eq!(ring.write_cursor(), 5);
        assert_eq!(ring.read_cursor(), 1);
        assert_eq!(ring.dropped_frames(), 1);

        let mut out = [0u8; 32];
        let drained = ring.drain_all(&mut out).unwrap();
        assert_eq!(drained.frames, 4);
        assert_eq!(&out[..], &data[8..]);
    }

    #[test]
    fn test_oversized_chunk_after_partial_frame() {
        let mut ring = small_ring();
        let data = ramp(100);
        ring.append(&data[..3]);
        ring.append(&data[3..]);

        // 100 bytes = 12 frames + 4 bytes; the 4-byte tail occupies the slot
        // of the oldest frame, so three full frames remain.
        assert_eq!(ring.write_cursor(), 12);
        assert_eq!(ring.partial_bytes(), 4);
        assert_eq!(ring.partial_offset(), 1);

        let mut out = [0u8; 32];
        let drained = ring.drain_all(&mut out).unwrap();
        assert_eq!(drained.frames, 3);
        assert_eq!(&out[..24], &data[72..96]);
    }

    #[test]
    fn test_chunk_ending_mid_frame_never_yields_torn_frame() {
        let data = ramp(33);

        let mut whole = small_ring();
        whole.append(&data);
        let mut split = small_ring();
        split.append(&data[..32]);
        split.append(&data[32..]);

        for ring in [&mut whole, &mut split] {
            let mut out = [0u8; 32];
            let drained = ring.drain_all(&mut out).unwrap();
            assert_eq!(drained.frames, 3);
            assert_eq!(&out[..24], &data[8..32]);
        }
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut ring = small_ring();
        assert_eq!(ring.append(&[]), 0);
        assert!(ring.is_empty());
        assert_eq!(ring.write_cursor(), 0);
        assert_eq!(ring.partial_bytes(), 0);

        let mut out = [0u8; 32];
        assert!(ring.drain_all(&mut out).unwrap().is_empty());
    }

    #[test]
    fn test_append_after_eof() {
        let mut ring = small_ring();
        ring.mark_eof();
        ring.append(&ramp(16));
        assert!(ring.is_eof());

        let mut out = [0u8; 32];
        assert_eq!(ring.drain_all(&mut out).unwrap().frames, 2);
        ring.mark_eof();
        assert!(ring.is_eof());
    }

    #[test]
    fn test_second_drain_is_empty() {
        let mut ring = small_ring();
        ring.append(&ramp(20));

        let mut out = [0u8; 32];
        assert_eq!(ring.drain_all(&mut out).unwrap().frames, 2);
        assert_eq!(ring.drain_all(&mut out).unwrap(), Drained::default());
    }

    #[test]
    fn test_partial_frame_carries_over() {
        let mut ring = small_ring();
        let data = ramp(16);
        ring.append(&data[..5]);
        assert_eq!(ring.available_frames(), 0);
        assert_eq!(ring.partial_offset(), 1);

        ring.append(&data[5..11]);
        assert_eq!(ring.available_frames(), 1);
        assert_eq!(ring.partial_bytes(), 3);

        ring.append(&data[11..]);
        let mut out = [0u8; 32];
        let drained = ring.drain_all(&mut out).unwrap();
        assert_eq!(drained.frames, 2);
        assert_eq!(&out[..16], &data[..]);
        assert_eq!(ring.partial_bytes(), 0);
    }

    #[test]
    fn test_partial_carry_uses_frame_size_not_capacity() {
        // Capacity larger than frame size: carry must roll over per frame.
        let mut ring = RingBuffer::new(2, 16, 1).unwrap();
        ring.append(&[1]);
        ring.append(&[2]);
        assert_eq!(ring.available_frames(), 1);
        assert_eq!(ring.partial_offset(), 0);
    }

    #[test]
    fn test_wrapping_copy_in_and_out() {
        let mut ring = small_ring();
        let mut out = [0u8; 32];

        ring.append(&ramp(24));
        assert_eq!(ring.drain_all(&mut out).unwrap().frames, 3);

        // Write starts at byte 24 and wraps after 8 bytes.
        let data: Vec<u8> = (100..124).collect();
        ring.append(&data);
        let drained = ring.drain_all(&mut out).unwrap();
        assert_eq!(drained.frames, 3);
        assert_eq!(&out[..24], &data[..]);
    }

    #[test]
    fn test_overrun_drops_oldest_across_calls() {
        let mut ring = small_ring();
        let data = ramp(56);
        for chunk in data.chunks(8) {
            ring.append(chunk);
        }
        assert_eq!(ring.available_frames(), 4);
        assert_eq!(ring.dropped_frames(), 3);

        let mut out = [0u8; 32];
        ring.drain_all(&mut out).unwrap();
        assert_eq!(&out[..], &data[24..]);
    }

    #[test]
    fn test_partial_frame_evicts_overlapped_slot() {
        let mut ring = RingBuffer::new(1, 2, 4).unwrap();
        ring.append(&ramp(8));
        assert_eq!(ring.available_frames(), 2);

        assert_eq!(ring.append(&[0xAA]), 1);
        assert_eq!(ring.available_frames(), 1);

        let mut out = [0u8; 8];
        let drained = ring.drain_all(&mut out).unwrap();
        assert_eq!(drained.frames, 1);
        assert_eq!(&out[..4], &[4, 5, 6, 7]);
    }

    #[test]
    fn test_small_destination_is_rejected_untouched() {
        let mut ring = small_ring();
        ring.append(&ramp(24));

        let mut out = [0u8; 16];
        assert_eq!(
            ring.drain_all(&mut out),
            Err(BufferError::Overflow {
                needed: 24,
                available: 16
            })
        );
        assert_eq!(out, [0u8; 16]);
        assert_eq!(ring.available_frames(), 3);

        let mut bigger = [0u8; 24];
        assert_eq!(ring.drain_all(&mut bigger).unwrap().frames, 3);
    }

    #[test]
    fn test_append_read_rejects_bad_length() {
        let mut ring = small_ring();
        let scratch = [7u8; 8];
        assert_eq!(
            ring.append_read(&scratch, 9),
            Err(BufferError::Protocol {
                length: 9,
                available: 8
            })
        );
        assert_eq!(ring.write_cursor(), 0);

        assert_eq!(ring.append_read(&scratch, 8).unwrap(), 0);
        assert_eq!(ring.available_frames(), 1);
        assert!(!ring.is_empty());
    }
}
