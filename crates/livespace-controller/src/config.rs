// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for livespace-controller.

use std::path::PathBuf;
use std::time::Duration;

/// Controller configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the per-activity storage (`{data_dir}/live/{uuid}/...`)
    pub data_dir: PathBuf,
    /// How often running activities are sampled
    pub sample_interval: Duration,
    /// JSON manifest of installed live activities, loaded at boot
    pub activity_manifest: Option<PathBuf>,
    /// Start every installed activity once the controller is up
    pub autostart: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".data"),
            sample_interval: Duration::from_millis(5000),
            activity_manifest: None,
            autostart: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(
            std::env::var("LIVESPACE_DATA_DIR").unwrap_or_else(|_| ".data".to_string()),
        );

        let sample_interval_ms: u64 = std::env::var("LIVESPACE_SAMPLE_INTERVAL_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LIVESPACE_SAMPLE_INTERVAL_MS"))?;

        if sample_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("LIVESPACE_SAMPLE_INTERVAL_MS"));
        }

        let activity_manifest = std::env::var("LIVESPACE_ACTIVITY_MANIFEST")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let autostart = std::env::var("LIVESPACE_AUTOSTART")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            data_dir,
            sample_interval: Duration::from_millis(sample_interval_ms),
            activity_manifest,
            autostart,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
