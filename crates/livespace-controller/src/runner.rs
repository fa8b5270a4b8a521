// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Live activity runner.
//!
//! A runner supervises one installed live activity. It holds an activity
//! instance only while the activity is started, caches the last known status,
//! and reports every status it sets to its listener:
//!
//! - with a live instance: [`LiveActivityRunnerListener::on_activity_status_change`]
//! - without one (failed startup, crash cleanup):
//!   [`LiveActivityRunnerListener::on_no_instance_activity_status_event`]
//!
//! All lifecycle calls and samples on one runner are serialized through a
//! per-runner lock. Wrapper failures never escape a lifecycle call, they become
//! the matching `*_FAILURE` status.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use livespace_core::{ActivityState, ActivityStatus};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::repository::{ActivityConfiguration, InstalledLiveActivity};
use crate::storage::ActivityFilesystem;
use crate::wrapper::{ActivityInstance, ActivityWrapper};

/// How long to wait on the instance lock before warning that it is blocked.
const INSTANCE_LOCK_WAIT: Duration = Duration::from_secs(20);

/// Receives status events from runners.
pub trait LiveActivityRunnerListener: Send + Sync {
    /// A status was set while the runner had a live instance.
    fn on_activity_status_change(
        &self,
        runner: &Arc<LiveActivityRunner>,
        old_status: &ActivityStatus,
        new_status: &ActivityStatus,
    );

    /// A status was set while the runner had no live instance.
    fn on_no_instance_activity_status_event(&self, runner: &Arc<LiveActivityRunner>);
}

struct RunnerState {
    instance: Option<Box<dyn ActivityInstance>>,
    configuration: ActivityConfiguration,
}

/// Supervisor of one installed live activity.
pub struct LiveActivityRunner {
    installed: InstalledLiveActivity,
    wrapper: Box<dyn ActivityWrapper>,
    filesystem: ActivityFilesystem,
    state: Mutex<RunnerState>,
    cached_status: RwLock<ActivityStatus>,
    listener: Weak<dyn LiveActivityRunnerListener>,
}

impl fmt::Debug for LiveActivityRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveActivityRunner")
            .field("uuid", &self.installed.uuid)
            .field("status", &self.cached_activity_status())
            .finish_non_exhaustive()
    }
}

fn failure(state: ActivityState, uuid: &str, error: impl fmt::Display) -> ActivityStatus {
    error!(uuid = %uuid, state = %state, error = %error, "Live activity operation failed");
    ActivityStatus::with_detail(state, error.to_string())
}

impl LiveActivityRunner {
    /// Create a runner in the `READY` state.
    pub fn new(
        installed: InstalledLiveActivity,
        wrapper: Box<dyn ActivityWrapper>,
        filesystem: ActivityFilesystem,
        listener: Weak<dyn LiveActivityRunnerListener>,
    ) -> Self {
        let configuration = installed.configuration.clone();
        Self {
            installed,
            wrapper,
            filesystem,
            state: Mutex::new(RunnerState {
                instance: None,
                configuration,
            }),
            cached_status: RwLock::new(ActivityStatus::ready()),
            listener,
        }
    }

    /// UUID of the live activity.
    pub fn uuid(&self) -> &str {
        &self.installed.uuid
    }

    /// The installed live activity this runner supervises.
    pub fn installed_activity(&self) -> &InstalledLiveActivity {
        &self.installed
    }

    /// Directories of the live activity.
    pub fn filesystem(&self) -> &ActivityFilesystem {
        &self.filesystem
    }

    /// Last known status. Does no I/O and does not wait on lifecycle calls.
    pub fn cached_activity_status(&self) -> ActivityStatus {
        self.cached_status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overwrite the cached status without notifying the listener.
    pub fn set_cached_activity_status(&self, status: ActivityStatus) {
        *self
            .cached_status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Start the activity. Does nothing if an instance is already running.
    pub async fn startup(self: &Arc<Self>) {
        let mut state = self.lock_state("startup").await;
        if state.instance.is_some() {
            warn!(uuid = %self.uuid(), "Attempt to start activity that is already started");
            return;
        }

        let mut instance = match self.wrapper.new_instance(&state.configuration) {
            Ok(instance) => instance,
            Err(e) => {
                let status = failure(ActivityState::StartupFailure, self.uuid(), e);
                self.set_status(&state, status);
                return;
            }
        };

        match instance.startup().await {
            Ok(()) => {
                state.instance = Some(instance);
                self.set_status(&state, ActivityStatus::new(ActivityState::Running));
            }
            Err(e) => {
                instance.handle_startup_failure().await;
                let status = failure(ActivityState::StartupFailure, self.uuid(), e);
                self.set_status(&state, status);
            }
        }
    }

    /// Activate the started activity.
    pub async fn activate(self: &Arc<Self>) -> Result<()> {
        let mut state = self.lock_state("activate").await;
        let Some(instance) = state.instance.as_mut() else {
            return Err(Error::ActivityNotStarted(self.uuid().to_string()));
        };

        let status = match instance.activate().await {
            Ok(()) => ActivityStatus::new(ActivityState::Active),
            Err(e) => failure(ActivityState::ActivateFailure, self.uuid(), e),
        };
        self.set_status(&state, status);
        Ok(())
    }

    /// Deactivate the started activity.
    pub async fn deactivate(self: &Arc<Self>) -> Result<()> {
        let mut state = self.lock_state("deactivate").await;
        let Some(instance) = state.instance.as_mut() else {
            return Err(Error::ActivityNotStarted(self.uuid().to_string()));
        };

        let status = match instance.deactivate().await {
            Ok(()) => ActivityStatus::new(ActivityState::Running),
            Err(e) => failure(ActivityState::DeactivateFailure, self.uuid(), e),
        };
        self.set_status(&state, status);
        Ok(())
    }

    /// Shut the activity down. Can be called any number of times.
    pub async fn shutdown(self: &Arc<Self>) {
        let mut state = self.lock_state("shutdown").await;
        let Some(instance) = state.instance.as_mut() else {
            warn!(uuid = %self.uuid(), "Attempt to shut down activity that wasn't running");
            return;
        };

        match instance.shutdown().await {
            Ok(()) => {
                self.set_status(&state, ActivityStatus::ready());
                state.instance = None;
            }
            Err(e) => {
                let status = failure(ActivityState::ShutdownFailure, self.uuid(), e);
                self.set_status(&state, status);
            }
        }
    }

    /// Ask the live instance for its state and update the cached status.
    ///
    /// An instance that reports a non-running state (it crashed) is dropped.
    pub async fn sample_activity_status(self: &Arc<Self>) -> ActivityStatus {
        let mut state = self.lock_state("sample").await;
        let sampled = match state.instance.as_mut() {
            Some(instance) => instance.check_activity_state().await,
            None => None,
        };

        if let Some(status) = sampled {
            let still_running = status.state().is_running();
            self.set_status(&state, status);
            if !still_running {
                debug!(uuid = %self.uuid(), "Dropping activity instance that stopped on its own");
                state.instance = None;
            }
        }

        self.cached_activity_status()
    }

    /// Merge a configuration update and push it to the running instance.
    pub async fn update_configuration(&self, update: ActivityConfiguration) -> Result<()> {
        let mut state = self.lock_state("configure").await;
        state
            .configuration
            .extend(update.iter().map(|(k, v)| (k.clone(), v.clone())));

        if self.cached_activity_status().state().is_running()
            && let Some(instance) = state.instance.as_mut()
        {
            instance.update_configuration(&update).await?;
        }
        Ok(())
    }

    /// Current configuration, including every update applied so far.
    pub async fn configuration(&self) -> ActivityConfiguration {
        self.lock_state("configuration").await.configuration.clone()
    }

    async fn lock_state(&self, operation: &'static str) -> MutexGuard<'_, RunnerState> {
        let started = Instant::now();
        loop {
            if let Ok(guard) = tokio::time::timeout(INSTANCE_LOCK_WAIT, self.state.lock()).await {
                return guard;
            }
            warn!(
                uuid = %self.uuid(),
                operation = operation,
                waited_ms = started.elapsed().as_millis() as u64,
                "Wait on the activity instance lock is blocked"
            );
        }
    }

    fn set_status(self: &Arc<Self>, state: &RunnerState, status: ActivityStatus) {
        let old_status = {
            let mut cached = self
                .cached_status
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *cached, status.clone())
        };

        let Some(listener) = self.listener.upgrade() else {
            debug!(uuid = %self.uuid(), "Runner listener is gone, status not reported");
            return;
        };

        if state.instance.is_some() {
            listener.on_activity_status_change(self, &old_status, &status);
        } else {
            listener.on_no_instance_activity_status_event(self);
        }
    }
}
