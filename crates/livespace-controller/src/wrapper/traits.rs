// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wrapper trait definitions.
//!
//! A wrapper factory is registered per activity type and version. For every
//! live activity of that type it creates a wrapper, and the wrapper creates a
//! fresh instance each time the activity is started.

use async_trait::async_trait;
use livespace_core::{ActivityStatus, Version};
use thiserror::Error;

use crate::repository::{ActivityConfiguration, InstalledLiveActivity};
use crate::storage::ActivityFilesystem;

/// Errors from wrapper operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WrapperError {
    /// A configuration value the wrapper needs is missing.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    /// Executable was not found.
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    /// The activity could not be started.
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// The activity failed while handling a lifecycle call.
    #[error("Activity failed: {0}")]
    ActivityFailed(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wrapper operations.
pub type Result<T> = std::result::Result<T, WrapperError>;

/// Creates wrappers for one activity type at one version.
pub trait ActivityWrapperFactory: Send + Sync {
    /// Activity type this factory handles.
    fn activity_type(&self) -> &str;

    /// Version of the factory. `None` registers it as the unversioned default.
    fn version(&self) -> Option<&Version>;

    /// Create a wrapper for an installed live activity.
    fn new_activity_wrapper(
        &self,
        activity: &InstalledLiveActivity,
        filesystem: &ActivityFilesystem,
    ) -> Result<Box<dyn ActivityWrapper>>;
}

/// Creates activity instances for a single live activity.
pub trait ActivityWrapper: Send + Sync {
    /// Create a fresh, not yet started instance.
    fn new_instance(
        &self,
        configuration: &ActivityConfiguration,
    ) -> Result<Box<dyn ActivityInstance>>;
}

/// A started (or starting) activity.
///
/// Lifecycle calls are serialized by the owning runner; an instance is never
/// called concurrently.
#[async_trait]
pub trait ActivityInstance: Send {
    /// Start the activity.
    async fn startup(&mut self) -> Result<()>;

    /// Activate a running activity.
    async fn activate(&mut self) -> Result<()>;

    /// Deactivate an active activity.
    async fn deactivate(&mut self) -> Result<()>;

    /// Stop the activity and release its resources.
    async fn shutdown(&mut self) -> Result<()>;

    /// Check the activity for changes it made on its own.
    ///
    /// Returns a new status when the activity is no longer in the state the
    /// runner last put it in, e.g. `CRASHED` after its process exited.
    async fn check_activity_state(&mut self) -> Option<ActivityStatus>;

    /// Push a configuration update to the running activity.
    async fn update_configuration(&mut self, _update: &ActivityConfiguration) -> Result<()> {
        Ok(())
    }

    /// Release whatever a failed startup left behind.
    async fn handle_startup_failure(&mut self) {}
}
