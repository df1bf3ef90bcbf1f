//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Device connection.
    pub network: NetworkConfig,
    /// Window settings.
    pub display: DisplayConfig,
    /// Frame hand-off tuning.
    pub presentation: PresentationConfig,
    /// Pointer forwarding.
    pub input: InputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Device connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Device address (IP:port of the mirroring server).
    pub device_address: String,
    /// Connect + handshake timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
}

/// Frame hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// How long the frame producer waits for the rendering loop before
    /// dropping a frame, in milliseconds.
    pub present_timeout_ms: u64,
}

/// Pointer forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Forward primary-button presses/drags as touches.
    pub forward_pointer: bool,
    /// Map the secondary button to BACK / screen-on.
    pub back_on_secondary: bool,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (overridden by `RUST_LOG`).
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device_address: "127.0.0.1:27183".into(),
            timeout_ms: 5000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "devmirror".into(),
            width: 540,
            height: 1200,
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            present_timeout_ms: 200,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            forward_pointer: true,
            back_on_secondary: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewConfig {
    /// Load from a TOML file, falling back to defaults.
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

    pub fn present_timeout(&self) -> Duration {
        Duration::from_millis(self.presentation.present_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.network.timeout_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────
