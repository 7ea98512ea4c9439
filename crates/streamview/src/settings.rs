//! Application Settings
//!
//! Layered as built-in defaults, then an optional TOML file named by
//! `STREAMVIEW_CONFIG`, then `STREAMVIEW_*` environment variables.

use config::{Config, Environment, File, FileFormat};
use frame_pump::{ConsumerConfig, ProducerConfig, SourceSpec, SpectrumConfig};
use frame_ring::{ElementType, RingGeometry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

/// Environment variable naming the settings file
pub const CONFIG_PATH_VAR: &str = "STREAMVIEW_CONFIG";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "STREAMVIEW";

/// Fastest accepted render rate
pub const MAX_TICK_RATE_HZ: f64 = 1000.0;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Sources could not be read or deserialized
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Viewer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Elements per frame
    pub frame_size: usize,
    /// Frames kept in the ring
    pub capacity_frames: usize,
    /// Sample type carried by the stream
    pub element_type: ElementType,
    /// Largest single read from the source
    pub read_chunk_bytes: usize,
    /// Render ticks per second
    pub tick_rate_hz: f64,
    /// Byte source
    pub source: SourceSpec,
    /// Synthetic tone frequency (cycles per sample)
    pub synthetic_tone: f32,
    /// Milliseconds between synthetic frames
    pub synthetic_interval_ms: u64,
    /// Maximum log level
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Seconds between frame statistics reports
    pub report_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let geometry = RingGeometry::default();
        Self {
            frame_size: geometry.frame_size,
            capacity_frames: geometry.capacity_frames,
            element_type: ElementType::F32,
            read_chunk_bytes: frame_pump::DEFAULT_READ_CHUNK_BYTES,
            tick_rate_hz: 60.0,
            source: SourceSpec::Stdin,
            synthetic_tone: 0.01,
            synthetic_interval_ms: 16,
            log_level: "info".to_string(),
            log_json: false,
            report_interval_secs: 1,
        }
    }
}

impl Settings {
    /// Load from the settings file named by `STREAMVIEW_CONFIG` (if set) and
    /// the environment
    pub fn load() -> Result<Self, SettingsError> {
        let path = std::env::var_os(CONFIG_PATH_VAR);
        Self::load_from(path.as_deref().map(Path::new))
    }

    /// Load from an optional TOML file and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse TOML text over the defaults
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.frame_size == 0 {
            return Err(invalid("frame_size", "must be positive"));
        }
        if self.capacity_frames == 0 {
            return Err(invalid("capacity_frames", "must be positive"));
        }
        if self.read_chunk_bytes == 0 {
            return Err(invalid("read_chunk_bytes", "must be positive"));
        }
        if !(self.tick_rate_hz > 0.0 && self.tick_rate_hz <= MAX_TICK_RATE_HZ) {
            return Err(invalid(
                "tick_rate_hz",
                format!("must be in (0, {}]", MAX_TICK_RATE_HZ),
            ));
        }
        if self.report_interval_secs == 0 {
            return Err(invalid("report_interval_secs", "must be positive"));
        }
        self.log_level()?;
        Ok(())
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level, SettingsError> {
        self.log_level
            .parse()
            .map_err(|_| invalid("log_level", format!("unknown level {:?}", self.log_level)))
    }

    /// Ring shape for these settings
    pub fn geometry(&self) -> RingGeometry {
        RingGeometry::for_element(self.frame_size, self.capacity_frames, self.element_type)
    }

    /// Time between render ticks
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    /// Time between statistics reports
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    /// Producer thread configuration
    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            read_chunk_bytes: self.read_chunk_bytes,
            ..Default::default()
        }
    }

    /// Consumer configuration: one tick may drain the whole ring
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            max_frames_per_tick: Some(self.capacity_frames),
        }
    }

    /// Synthetic source configuration
    pub fn spectrum_config(&self) -> SpectrumConfig {
        SpectrumConfig {
            frame_size: self.frame_size,
            tone: self.synthetic_tone,
            interval: Duration::from_millis(self.synthetic_interval_ms),
            seed: None,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.geometry().storage_bytes(), 64 * 1024 * 4);
        assert_eq!(settings.log_level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            frame_size = 256
            element_type = "cf32"
            source = "tcp://127.0.0.1:7000"
            tick_rate_hz = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.frame_size, 256);
        assert_eq!(settings.capacity_frames, 64);
        assert_eq!(settings.element_type, ElementType::Cf32);
        assert_eq!(settings.geometry().element_width, 8);
        assert_eq!(settings.source, SourceSpec::Tcp("127.0.0.1:7000".into()));
        assert!((settings.tick_period().as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Settings::from_toml("capacity_frames = 0"),
            Err(SettingsError::Invalid { field: "capacity_frames", .. })
        ));
        assert!(matches!(
            Settings::from_toml("tick_rate_hz = 1e12"),
            Err(SettingsError::Invalid { field: "tick_rate_hz", .. })
        ));
        assert!(matches!(
            Settings::from_toml("tick_rate_hz = 0.0"),
            Err(SettingsError::Invalid { field: "tick_rate_hz", .. })
        ));
        assert!(matches!(
            Settings::from_toml("log_level = \"loud\""),
            Err(SettingsError::Invalid { field: "log_level", .. })
        ));
        assert!(matches!(
            Settings::from_toml("source = \"ftp://x\""),
            Err(SettingsError::Load(_))
        ));
        assert!(matches!(
            Settings::from_toml("element_type = \"f16\""),
            Err(SettingsError::Load(_))
        ));
    }

    #[test]
    fn test_highest_tick_rate_has_nonzero_period() {
        let settings = Settings::from_toml("tick_rate_hz = 1000.0").unwrap();
        assert_eq!(settings.tick_period(), Duration::from_millis(1));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamview.toml");
        std::fs::write(
            &path,
            "frame_size = 256\ncapacity_frames = 16\nsource = \"synthetic\"\n",
        )
        .unwrap();

        std::env::set_var("STREAMVIEW_CAPACITY_FRAMES", "32");
        let loaded = Settings::load_from(Some(path.as_path()));
        std::env::remove_var("STREAMVIEW_CAPACITY_FRAMES");
        let settings = loaded.unwrap();

        assert_eq!(settings.frame_size, 256);
        assert_eq!(settings.capacity_frames, 32);
        assert_eq!(settings.source, SourceSpec::Synthetic);
        assert_eq!(settings.tick_rate_hz, 60.0);
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Settings::load_from(Some(path.as_path())),
            Err(SettingsError::Load(_))
        ));
    }

    #[test]
    fn test_consumer_can_hold_whole_ring() {
        let settings = Settings::default();
        assert_eq!(
            settings.consumer_config().max_frames_per_tick,
            Some(settings.capacity_frames)
        );
    }
}
