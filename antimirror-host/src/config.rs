//! Configuration for the mirror runner.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use antimirror_core::{CaptureRegion, MirrorSettings, PipelineConfig, QuantizationConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Tick cadence.
    pub pipeline: PipelineSection,
    /// Frame source and capture rectangle.
    pub capture: CaptureSection,
    /// Quantization algorithm, tagged by `kind`.
    pub quantization: QuantizationConfig,
    /// Display device.
    pub device: DeviceSection,
    /// Local preview output.
    pub preview: PreviewSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Pipeline cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Ticks per second (clamped to 1..=60).
    pub fps: u8,
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Animated gradient bars.
    TestPattern,
    /// A still image, served on every tick.
    Image,
}

/// Frame source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    pub source: SourceKind,
    /// Image to mirror when `source = "image"`.
    pub image_path: PathBuf,
    /// Test pattern width in pixels.
    pub pattern_width: u32,
    /// Test pattern height in pixels.
    pub pattern_height: u32,
    /// Rectangle of the source sent to the display.
    pub region: CaptureRegion,
}

/// Device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Attach the simulated device.
    pub simulated: bool,
    /// How long the simulated device stays busy after each frame.
    pub transfer_ms: u64,
}

/// Preview configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSection {
    /// PNG file receiving the latest quantized frame. Empty disables it.
    pub path: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Seconds between device status lines.
    pub status_interval_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for PipelineSection {
    fn default() -> Self {
        Self { fps: 40 }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        // Large enough to contain the default region.
        Self {
            source: SourceKind::TestPattern,
            image_path: PathBuf::new(),
            pattern_width: 432,
            pattern_height: 270,
            region: CaptureRegion::default(),
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            simulated: true,
            transfer_ms: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            status_interval_secs: 1,
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Fixed pipeline parameters.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::with_fps(self.pipeline.fps)
    }

    /// Initial live settings.
    pub fn to_settings(&self) -> MirrorSettings {
        MirrorSettings {
            quantization: self.quantization,
            region: self.capture.region,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
