// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for livespace-master.

use std::time::Duration;

/// Deployment manager configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DeploymentManagerConfig {
    /// Resolve and commit dependencies on the master instead of querying the controller first
    pub always_send_dependencies: bool,
    /// Finalize transactions with no progress for this long. `None` keeps them in flight forever.
    pub deployment_timeout: Option<Duration>,
    /// How often the reaper looks for stale transactions
    pub sweep_interval: Duration,
}

impl Default for DeploymentManagerConfig {
    fn default() -> Self {
        Self {
            always_send_dependencies: true,
            deployment_timeout: None,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl DeploymentManagerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let always_send_dependencies = match std::env::var("LIVESPACE_ALWAYS_SEND_DEPENDENCIES") {
            Ok(v) => match v.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "LIVESPACE_ALWAYS_SEND_DEPENDENCIES",
                    ));
                }
            },
            Err(_) => true,
        };

        let deployment_timeout = std::env::var("LIVESPACE_DEPLOYMENT_TIMEOUT_SECS")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .ok_or(ConfigError::InvalidValue("LIVESPACE_DEPLOYMENT_TIMEOUT_SECS"))
            })
            .transpose()?;

        let sweep_interval_secs: u64 = std::env::var("LIVESPACE_DEPLOYMENT_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LIVESPACE_DEPLOYMENT_SWEEP_INTERVAL_SECS"))?;

        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "LIVESPACE_DEPLOYMENT_SWEEP_INTERVAL_SECS",
            ));
        }

        Ok(Self {
            always_send_dependencies,
            deployment_timeout,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
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
