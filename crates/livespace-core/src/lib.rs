// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Livespace Core - shared domain values.
//!
//! This crate holds the value types shared by the space controller
//! (`livespace-controller`) and the master (`livespace-master`):
//!
//! - [`version`]: dotted versions and interval-notation version ranges
//! - [`activity`]: live activity states, immutable status snapshots and the
//!   lifecycle transition table
//! - [`resource`]: named, versioned resources used for dependency negotiation
//!
//! # Activity State Machine
//!
//! ```text
//!            startup            activate
//!   READY ─────────────► RUNNING ─────────► ACTIVE
//!     ▲                   │   ▲               │
//!     │     shutdown      │   └───────────────┘
//!     └───────────────────┘      deactivate
//!
//!   failures: STARTUP_FAILURE, ACTIVATE_FAILURE, DEACTIVATE_FAILURE,
//!             SHUTDOWN_FAILURE, CRASHED
//! ```
//!
//! Nothing in this crate performs I/O.

#![deny(missing_docs)]

/// Activity states, statuses and lifecycle transitions.
pub mod activity;

/// Error types for parsing domain values.
pub mod error;

/// Named, versioned resources.
pub mod resource;

/// Versions and version ranges.
pub mod version;

pub use activity::{ActivityState, ActivityStateTransition, ActivityStatus, TransitionResult};
pub use error::Error;
pub use resource::{NamedVersionedResource, ResourceDependencyReference};
pub use version::{Version, VersionRange};
