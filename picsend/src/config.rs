//! Sender configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use picsend_core::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, Endpoint, ImageEncoder, PicsendError};

/// Top-level configuration for the sender.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Receiver address.
    pub server: ServerConfig,
    /// Re-encoding settings.
    pub encoding: EncodingConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Receiver address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Receiver host name or IP.
    pub host: String,
    /// Receiver TCP port.
    pub port: u16,
}

/// Re-encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Images wider than this are scaled down to it.
    pub max_width: u32,
    /// JPEG quality, 1..=100.
    pub quality: u8,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5001,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl SenderConfig {
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

    /// Validated receiver endpoint.
    pub fn endpoint(&self) -> Result<Endpoint, PicsendError> {
        Endpoint::new(&self.server.host, self.server.port)
    }

    pub fn encoder(&self) -> ImageEncoder {
        ImageEncoder::new(self.encoding.max_width, self.encoding.quality)
    }
}

// ── Tests ────────────────────────────────────────────────────────
