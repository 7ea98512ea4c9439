//! Frame Ring Buffer
//!
//! Bridges a producer doing large blocking reads of arbitrary size and a
//! consumer polling at a fixed rate. Bytes go in as they arrive; whole frames
//! come out. When the consumer falls behind, the oldest unread frames are
//! dropped so a live view always shows the latest data.

mod buffer;
mod element;
mod error;
mod shared;

pub use buffer::{
    Drained, RingBuffer, RingGeometry, DEFAULT_CAPACITY_FRAMES, DEFAULT_FRAME_SIZE,
};
pub use element::{ElementType, UnknownElementType};
pub use error::BufferError;
pub use shared::{RingStats, SharedRingBuffer};
