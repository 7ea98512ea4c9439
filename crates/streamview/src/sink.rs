//! Frame Statistics Sink
//!
//! Stands in for the renderer: decodes each tick's frames, tracks the value
//! range a plot would auto-scale to, keeps the latest frame, and logs a
//! periodic summary.

use frame_pump::FrameSink;
use frame_ring::ElementType;
use std::time::{Duration, Instant};
use tracing::info;

/// Running totals of the sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSummary {
    pub frames: u64,
    /// Smallest value seen, `None` before any finite value
    pub min: Option<f32>,
    pub max: Option<f32>,
}

/// Decodes frames and reports their statistics
pub struct StatsSink {
    element: ElementType,
    /// Decoded values per frame
    values_per_frame: usize,
    decoded: Vec<f32>,
    latest: Vec<f32>,
    min: f32,
    max: f32,
    frames: u64,
    frames_since_report: u64,
    last_report: Instant,
    report_interval: Duration,
}

impl StatsSink {
    /// Create a sink for frames of `frame_size` elements
    pub fn new(element: ElementType, frame_size: usize, report_interval: Duration) -> Self {
        let components = if element.is_complex() { 2 } else { 1 };
        Self {
            element,
            values_per_frame: frame_size * components,
            decoded: Vec::new(),
            latest: Vec::with_capacity(frame_size * components),
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            frames: 0,
            frames_since_report: 0,
            last_report: Instant::now(),
            report_interval,
        }
    }

    /// Most recent frame, decoded
    pub fn latest(&self) -> &[f32] {
        &self.latest
    }

    /// Totals so far
    pub fn summary(&self) -> SinkSummary {
        let seen = self.min <= self.max;
        SinkSummary {
            frames: self.frames,
            min: seen.then_some(self.min),
            max: seen.then_some(self.max),
        }
    }

    fn report(&mut self) {
        let elapsed = self.last_report.elapsed();
        let rate = self.frames_since_report as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        let summary = self.summary();
        info!(
            frames = self.frames,
            frames_per_sec = rate,
            min = ?summary.min,
            max = ?summary.max,
            "Frame statistics"
        );
        self.frames_since_report = 0;
        self.last_report = Instant::now();
    }
}

impl FrameSink for StatsSink {
    fn on_frames(&mut self, frame_count: usize, raw: &[u8]) {
        self.decoded.clear();
        self.element.decode_f32(raw, &mut self.decoded);

        for &value in self.decoded.iter().filter(|v| v.is_finite()) {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        let start = self.decoded.len().saturating_sub(self.values_per_frame);
        self.latest.clear();
        self.latest.extend_from_slice(&self.decoded[start..]);

        self.frames += frame_count as u64;
        self.frames_since_report += frame_count as u64;
        if self.last_report.elapsed() >= self.report_interval {
            self.report();
        }
    }
}
