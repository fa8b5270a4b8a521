// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for livespace-core.

use thiserror::Error;

/// Errors raised while parsing domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The text is not a legal version.
    #[error("Illegal version {0}")]
    InvalidVersion(String),

    /// The text is not a legal version range.
    #[error("Illegal version range {range}: {reason}")]
    InvalidVersionRange {
        /// The offending range text.
        range: String,
        /// Why the range was rejected.
        reason: &'static str,
    },
}

/// Result type using the core Error.
pub type Result<T> = std::result::Result<T, Error>;
