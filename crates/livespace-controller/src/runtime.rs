// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for livespace-controller.
//!
//! [`ControllerRuntime`] wires the wrapper registry, repository, storage and
//! status sinks into a [`LiveActivityRuntime`] and runs the sampler in the
//! background.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use livespace_controller::repository::InMemoryLiveActivityRepository;
//! use livespace_controller::runtime::ControllerRuntime;
//! use livespace_controller::wrapper::NativeActivityWrapperFactory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ControllerRuntime::builder()
//!         .repository(Arc::new(InMemoryLiveActivityRepository::new()))
//!         .wrapper_factory(Arc::new(NativeActivityWrapperFactory::new()))
//!         .data_dir("/var/lib/livespace")
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     runtime.activities().startup_live_activity("9f1c").await?;
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::live_activity_runtime::LiveActivityRuntime;
use crate::registry::ActivityWrapperRegistry;
use crate::repository::LiveActivityRepository;
use crate::sampler::{LiveActivityRunnerSampler, LiveActivityRunnerSamplerConfig};
use crate::status::{
    AlertStatusManager, LiveActivityStatusPublisher, TracingAlertStatusManager,
    TracingStatusPublisher,
};
use crate::storage::{FilesystemStorageManager, LiveActivityStorageManager};
use crate::wrapper::ActivityWrapperFactory;

/// Builder for creating a [`ControllerRuntime`].
pub struct ControllerRuntimeBuilder {
    repository: Option<Arc<dyn LiveActivityRepository>>,
    storage: Option<Arc<dyn LiveActivityStorageManager>>,
    publisher: Arc<dyn LiveActivityStatusPublisher>,
    alerts: Arc<dyn AlertStatusManager>,
    factories: Vec<Arc<dyn ActivityWrapperFactory>>,
    data_dir: PathBuf,
    sample_interval: Duration,
    autostart: bool,
}

impl Default for ControllerRuntimeBuilder {
    fn default() -> Self {
        Self {
            repository: None,
            storage: None,
            publisher: Arc::new(TracingStatusPublisher),
            alerts: Arc::new(TracingAlertStatusManager),
            factories: Vec::new(),
            data_dir: PathBuf::from(".data"),
            sample_interval: LiveActivityRunnerSamplerConfig::default().sample_interval,
            autostart: false,
        }
    }
}

impl ControllerRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the installed activity repository (required).
    pub fn repository(mut self, repository: Arc<dyn LiveActivityRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the storage manager.
    ///
    /// Default: [`FilesystemStorageManager`] rooted at [`data_dir`](Self::data_dir)
    pub fn storage(mut self, storage: Arc<dyn LiveActivityStorageManager>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the status publisher.
    ///
    /// Default: [`TracingStatusPublisher`]
    pub fn publisher(mut self, publisher: Arc<dyn LiveActivityStatusPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Set the alert manager.
    ///
    /// Default: [`TracingAlertStatusManager`]
    pub fn alert_manager(mut self, alerts: Arc<dyn AlertStatusManager>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Register an activity wrapper factory. At least one is required.
    pub fn wrapper_factory(mut self, factory: Arc<dyn ActivityWrapperFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Set the data directory used by the default storage manager.
    ///
    /// Default: `.data`
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Set how often running activities are sampled.
    ///
    /// Default: 5 seconds
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Start every installed activity when the runtime starts.
    ///
    /// Default: `false`
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<ControllerRuntimeConfig> {
        let repository = self
            .repository
            .ok_or_else(|| anyhow::anyhow!("repository is required"))?;
        if self.factories.is_empty() {
            anyhow::bail!("at least one wrapper factory is required");
        }
        if self.sample_interval.is_zero() {
            anyhow::bail!("sample_interval must be greater than zero");
        }

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(FilesystemStorageManager::new(&self.data_dir)));

        let registry = Arc::new(ActivityWrapperRegistry::new());
        for factory in self.factories {
            registry.register_activity_wrapper_factory(factory);
        }

        Ok(ControllerRuntimeConfig {
            registry,
            repository,
            storage,
            publisher: self.publisher,
            alerts: self.alerts,
            sample_interval: self.sample_interval,
            autostart: self.autostart,
        })
    }
}

/// Configuration for a [`ControllerRuntime`].
pub struct ControllerRuntimeConfig {
    registry: Arc<ActivityWrapperRegistry>,
    repository: Arc<dyn LiveActivityRepository>,
    storage: Arc<dyn LiveActivityStorageManager>,
    publisher: Arc<dyn LiveActivityStatusPublisher>,
    alerts: Arc<dyn AlertStatusManager>,
    sample_interval: Duration,
    autostart: bool,
}

impl ControllerRuntimeConfig {
    /// Start the runtime, spawning the sampler task.
    pub async fn start(self) -> Result<ControllerRuntime> {
        let sampler = Arc::new(LiveActivityRunnerSampler::new(
            LiveActivityRunnerSamplerConfig {
                sample_interval: self.sample_interval,
            },
        ));
        let sampler_shutdown = sampler.shutdown_handle();

        let activities = LiveActivityRuntime::new(
            self.registry,
            self.repository,
            self.storage,
            self.publisher,
            self.alerts,
            sampler.clone(),
        );

        // Read before spawning so a repository error leaves no sampler behind.
        let installed = if self.autostart {
            activities.all_installed_live_activities().await?
        } else {
            Vec::new()
        };

        let sampler_task = sampler.clone();
        let sampler_handle = tokio::spawn(async move {
            sampler_task.run().await;
        });

        if self.autostart {
            info!(count = installed.len(), "Autostarting installed live activities");
            for activity in installed {
                if let Err(e) = activities.startup_live_activity(&activity.uuid).await {
                    error!(uuid = %activity.uuid, error = %e, "Failed to autostart live activity");
                }
            }
        }

        info!(
            sample_interval_ms = self.sample_interval.as_millis() as u64,
            autostart = self.autostart,
            "ControllerRuntime started"
        );

        Ok(ControllerRuntime {
            activities,
            sampler,
            sampler_handle,
            sampler_shutdown,
        })
    }
}

/// A running space controller that can be embedded in an application.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination. Every
/// registered live activity is shut down before the sampler stops.
pub struct ControllerRuntime {
    activities: Arc<LiveActivityRuntime>,
    sampler: Arc<LiveActivityRunnerSampler>,
    sampler_handle: JoinHandle<()>,
    sampler_shutdown: Arc<Notify>,
}

impl ControllerRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> ControllerRuntimeBuilder {
        ControllerRuntimeBuilder::new()
    }

    /// The live activity runtime that handles lifecycle commands.
    pub fn activities(&self) -> &Arc<LiveActivityRuntime> {
        &self.activities
    }

    /// The background sampler.
    pub fn sampler(&self) -> &Arc<LiveActivityRunnerSampler> {
        &self.sampler
    }

    /// Gracefully shut down the runtime.
    pub async fn shutdown(self) -> Result<()> {
        info!("ControllerRuntime shutting down...");

        self.activities.shutdown_all_activities().await;

        self.sampler_shutdown.notify_one();
        if let Err(e) = self.sampler_handle.await {
            error!("Live activity sampler task panicked: {}", e);
            return Err(anyhow::anyhow!("sampler task panicked: {}", e));
        }

        info!("ControllerRuntime shutdown complete");
        Ok(())
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        !self.sampler_handle.is_finished()
    }
}
