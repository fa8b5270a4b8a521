// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for livespace-controller.

use thiserror::Error;

/// Controller errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// No wrapper factory is registered for the activity type.
    #[error("Unknown activity type: {0}")]
    UnknownActivityType(String),

    /// Wrapper factories exist for the type, but none matches the requested version.
    #[error("No wrapper factory for activity type {activity_type} matches version {version}")]
    UnresolvableVersion {
        /// Activity type that was requested.
        activity_type: String,
        /// Version or version range that was requested.
        version: String,
    },

    /// A version or version range could not be parsed.
    #[error("Version error: {0}")]
    Version(#[from] livespace_core::Error),

    /// No installed live activity has the UUID.
    #[error("Unknown live activity: {0}")]
    UnknownLiveActivity(String),

    /// The operation needs a started activity instance.
    #[error("Live activity {0} is not started")]
    ActivityNotStarted(String),

    /// Activity wrapper failed.
    #[error("Wrapper error: {0}")]
    Wrapper(#[from] crate::wrapper::WrapperError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using the controller Error.
pub type Result<T> = std::result::Result<T, Error>;
