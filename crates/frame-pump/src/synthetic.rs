//! Synthetic Spectrum Source
//!
//! Produces log-magnitude spectra of a noisy tone as a live stream of `f32`
//! frames, for exercising the pipeline without an external feed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for the synthetic source
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    /// Elements (spectrum bins) per frame
    pub frame_size: usize,
    /// Tone frequency, in cycles per sample
    pub tone: f32,
    /// Time between frames
    pub interval: Duration,
    /// Fixed RNG seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            tone: 0.01,
            interval: Duration::from_millis(16),
            seed: None,
        }
    }
}

/// Endless paced stream of `20*log10(|FFT(noise + tone)|)` frames
pub struct SpectrumSource {
    config: SpectrumConfig,
    fft: Arc<dyn Fft<f32>>,
    rng: StdRng,
    signal: Vec<Complex<f32>>,
    /// Encoded bytes of the current frame
    pending: Vec<u8>,
    cursor: usize,
    next_frame: Instant,
}

impl SpectrumSource {
    /// Create a source; the first frame is available immediately
    pub fn new(config: SpectrumConfig) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.frame_size);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            fft,
            rng,
            signal: Vec::with_capacity(config.frame_size),
            pending: Vec::with_capacity(config.frame_size * std::mem::size_of::<f32>()),
            cursor: 0,
            next_frame: Instant::now(),
            config,
        }
    }

    /// Standard normal sample (Box-Muller)
    fn randn(&mut self) -> f32 {
        let u1: f32 = 1.0 - self.rng.gen::<f32>();
        let u2: f32 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn generate(&mut self) {
        let n = self.config.frame_size;
        let tone = self.config.tone;

        self.signal.clear();
        for i in 0..n {
            let noise = Complex::new(self.randn(), self.randn()) / 2f32.sqrt();
            let phase = 2.0 * PI * tone * i as f32;
            self.signal.push(noise + Complex::from_polar(1.0, phase));
        }
        self.fft.process(&mut self.signal);

        self.pending.clear();
        for bin in &self.signal {
            let db = 20.0 * bin.norm().max(f32::MIN_POSITIVE).log10();
            self.pending.extend_from_slice(&db.to_ne_bytes());
        }
        self.cursor = 0;
    }
}

impl Read for SpectrumSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.config.frame_size == 0 {
            return Ok(0);
        }

        if self.cursor == self.pending.len() {
            let now = Instant::now();
            if self.next_frame > now {
                std::thread::sleep(self.next_frame - now);
            }
            self.next_frame = Instant::now().max(self.next_frame) + self.config.interval;
            self.generate();
        }

        let n = buf.len().min(self.pending.len() - self.cursor);
        buf[..n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}
