// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Livespace Master - remote live activity deployment
//!
//! The master deploys live activities to remote space controllers. Each
//! deployment is a transaction: dependencies are negotiated with the hosting
//! controller first (queried, or resolved on the master and committed), then
//! the activity bundle is deployed. The controller's answers arrive
//! asynchronously through a [`RemoteControllerClient`], and the final outcome
//! is signalled to every registered [`RemoteSpaceControllerClientListener`].
//!
//! # Architecture
//!
//! ```text
//!   deploy_live_activity
//!            │
//!            ▼
//! ┌──────────────────────────────────┐  query / commit / deploy  ┌─────────────┐
//! │ RemoteActivityDeploymentManager  │ ────────────────────────► │   Remote    │
//! │  in-flight transactions          │                           │ Controller  │
//! │  (transaction ID ──► request)    │ ◄──────────────────────── │   Client    │
//! └──────────────────────────────────┘   responses by txn ID     └─────────────┘
//!     │               │                                                │
//!     │ resolve       │ outcome                                        │ transport
//!     ▼               ▼                                                ▼
//! ┌───────────┐  ┌─────────────────────┐                      space controllers
//! │ Container │  │ Listener helper     │
//! │ resources │  │ (fan-out)           │
//! └───────────┘  └─────────────────────┘
//! ```
//!
//! # Configuration
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LIVESPACE_ALWAYS_SEND_DEPENDENCIES` | `true` | Commit dependencies without querying first |
//! | `LIVESPACE_DEPLOYMENT_TIMEOUT_SECS` | unset | Finalize stalled transactions after this long |
//! | `LIVESPACE_DEPLOYMENT_SWEEP_INTERVAL_SECS` | `60` | How often stalled transactions are looked for |

#![deny(missing_docs)]

/// Remote controller transport contract and listener fan-out.
pub mod client;

/// Environment configuration.
pub mod config;

/// Deployment transactions.
pub mod deployment;

/// Error types.
pub mod error;

/// Stalled transaction reaper.
pub mod reaper;

/// Resource repository and dependency resolution.
pub mod resources;

/// Deployment messages and transaction records.
pub mod types;

pub use client::{
    RemoteControllerClient, RemoteControllerClientListenerHelper,
    RemoteSpaceControllerClientListener,
};
pub use config::{ConfigError, DeploymentManagerConfig};
pub use deployment::RemoteActivityDeploymentManager;
pub use error::{Error, Result};
pub use reaper::DeploymentReaper;
pub use resources::{
    BaseUrlResourceRepositoryServer, ContainerResourceDeploymentManager,
    ResourceRepositoryServer, StandardContainerResourceDeploymentManager,
};
pub use types::{
    ActiveLiveActivity, ActiveSpaceController, Activity, ActivityDependency, ActivityDeployStatus,
    LiveActivityDeploymentResponse, MasterActivityDeploymentRequest,
    MasterActivityDeploymentRequestStatus,
};
