// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for livespace-master.

use thiserror::Error;

/// Master errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// No resource in the master repository satisfies a dependency.
    #[error("Could not find a resource for the dependency {name} {range} in the master repository")]
    DependencyNotFound {
        /// Name of the required resource.
        name: String,
        /// Acceptable versions.
        range: String,
    },

    /// A request could not be handed to a remote controller.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A version or version range could not be parsed.
    #[error("Version error: {0}")]
    Version(#[from] livespace_core::Error),
}

/// Result type using the master Error.
pub type Result<T> = std::result::Result<T, Error>;
