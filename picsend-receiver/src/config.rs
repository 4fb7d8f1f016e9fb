//! Configuration for the receiver service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Where and how received images are stored.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind.
    pub host: String,
    /// TCP port to accept senders on.
    pub port: u16,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; images land in `<save_root>/<YYYY-MM-DD>/`.
    pub save_root: PathBuf,
    /// Largest accepted payload in bytes.
    pub max_frame_size: usize,
    /// Received images waiting to be written before new ones are dropped.
    pub queue_capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5001,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_root: PathBuf::from("data"),
            max_frame_size: 50 * 1024 * 1024,
            queue_capacity: 8,
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

impl ReceiverConfig {
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

    /// `host:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.host, self.network.port)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ReceiverConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("port"));
        assert!(text.contains("save_root"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let parsed: ReceiverConfig = toml::from_str("[network]\nport = 6000\n").unwrap();
        assert_eq!(parsed.network.port, 6000);
        assert_eq!(parsed.network.host, "0.0.0.0");
        assert_eq!(parsed.storage.max_frame_size, 50 * 1024 * 1024);
        assert_eq!(parsed.storage.queue_capacity, 8);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = ReceiverConfig::load(Path::new("/nonexistent/picsend-receiver.toml"));
        assert_eq!(cfg.bind_address(), "0.0.0.0:5001");
    }
}
