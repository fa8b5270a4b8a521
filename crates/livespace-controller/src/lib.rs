// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Livespace Controller - node-local live activity supervision
//!
//! The space controller runs on every node of a livespace installation. It
//! supervises the live activities installed on the node: it starts, activates,
//! deactivates and shuts them down on command, samples running activities to
//! notice crashes, and publishes every status change back to the master.
//!
//! # Architecture
//!
//! ```text
//!             lifecycle commands                     status updates
//!   master ──────────────────────┐          ┌──────────────────────► master
//!                                ▼          │
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     LiveActivityRuntime                               │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐  │
//! │  │  Repository  │   │   Wrapper    │   │  Status publisher/alerts │  │
//! │  │ (installed)  │   │   Registry   │   └──────────────────────────┘  │
//! │  └──────────────┘   └──────────────┘                ▲                │
//! │          │                 │ resolve                │ events         │
//! │          ▼                 ▼                        │                │
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │               LiveActivityRunner (one per UUID)                │  │
//! │  │     wrapper ──► instance (only while started) ──► process      │  │
//! │  └────────────────────────────────────────────────────────────────┘  │
//! │                              ▲                                       │
//! │                              │ sample                                │
//! │                    ┌──────────────────┐                              │
//! │                    │     Sampler      │                              │
//! │                    └──────────────────┘                              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Activity Types
//!
//! | Type | Wrapper |
//! |------|---------|
//! | `native` | Spawns the configured executable as a child process |
//! | `mock` | In-process stand-in with scriptable failures |
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LIVESPACE_DATA_DIR` | `.data` | Root of per-activity storage |
//! | `LIVESPACE_SAMPLE_INTERVAL_MS` | `5000` | Sampling period for running activities |
//! | `LIVESPACE_ACTIVITY_MANIFEST` | unset | JSON list of installed activities |
//! | `LIVESPACE_AUTOSTART` | `false` | Start every installed activity at boot |

#![deny(missing_docs)]

/// Environment configuration.
pub mod config;

/// Error types.
pub mod error;

/// Node-local registry of runners and command routing.
pub mod live_activity_runtime;

/// Activity wrapper factory registry.
pub mod registry;

/// Installed live activity records.
pub mod repository;

/// Per-activity supervisors.
pub mod runner;

/// Embeddable runtime.
pub mod runtime;

/// Periodic sampling of running activities.
pub mod sampler;

/// Status publication and alerting.
pub mod status;

/// Per-activity directories.
pub mod storage;

/// Activity wrapper abstraction and implementations.
pub mod wrapper;

pub use error::{Error, Result};
pub use live_activity_runtime::LiveActivityRuntime;
pub use registry::ActivityWrapperRegistry;
pub use repository::{
    ActivityConfiguration, InMemoryLiveActivityRepository, InstalledLiveActivity,
    LiveActivityRepository,
};
pub use runner::{LiveActivityRunner, LiveActivityRunnerListener};
pub use runtime::ControllerRuntime;
pub use sampler::{LiveActivityRunnerSampler, RunnerSampler};
pub use status::{AlertStatusManager, LiveActivityStatusPublisher};
pub use storage::{ActivityFilesystem, FilesystemStorageManager, LiveActivityStorageManager};
