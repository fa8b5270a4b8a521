// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node-local live activity runtime.
//!
//! The runtime owns the runner registry (UUID to runner), routes lifecycle
//! commands to runners, and relays runner status events to the status
//! publisher, the alert manager and the sampler.
//!
//! # Command Semantics
//!
//! | Command | Runner created on demand | No-op reply |
//! |---------|--------------------------|-------------|
//! | startup | yes | current status when already running |
//! | activate | yes (starts first when needed) | `ACTIVE` |
//! | deactivate | no | `RUNNING` |
//! | shutdown | no | `READY` |
//! | status | no | `READY` for installed, never started activities |
//!
//! Every command on a UUID with no installed activity publishes
//! `DOESNT_EXIST` and returns [`Error::UnknownLiveActivity`].

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use livespace_core::{ActivityState, ActivityStateTransition, ActivityStatus, TransitionResult};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::registry::ActivityWrapperRegistry;
use crate::repository::{ActivityConfiguration, InstalledLiveActivity, LiveActivityRepository};
use crate::runner::{LiveActivityRunner, LiveActivityRunnerListener};
use crate::sampler::RunnerSampler;
use crate::status::{AlertStatusManager, LiveActivityStatusPublisher};
use crate::storage::LiveActivityStorageManager;

/// Registry and command router for the live activities of this controller.
pub struct LiveActivityRuntime {
    registry: Arc<ActivityWrapperRegistry>,
    repository: Arc<dyn LiveActivityRepository>,
    storage: Arc<dyn LiveActivityStorageManager>,
    publisher: Arc<dyn LiveActivityStatusPublisher>,
    alerts: Arc<dyn AlertStatusManager>,
    sampler: Arc<dyn RunnerSampler>,
    runners: DashMap<String, Arc<LiveActivityRunner>>,
    me: Weak<LiveActivityRuntime>,
}

impl LiveActivityRuntime {
    /// Create a runtime.
    pub fn new(
        registry: Arc<ActivityWrapperRegistry>,
        repository: Arc<dyn LiveActivityRepository>,
        storage: Arc<dyn LiveActivityStorageManager>,
        publisher: Arc<dyn LiveActivityStatusPublisher>,
        alerts: Arc<dyn AlertStatusManager>,
        sampler: Arc<dyn RunnerSampler>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            registry,
            repository,
            storage,
            publisher,
            alerts,
            sampler,
            runners: DashMap::new(),
            me: me.clone(),
        })
    }

    /// The wrapper factory registry used to create runners.
    pub fn registry(&self) -> &Arc<ActivityWrapperRegistry> {
        &self.registry
    }

    /// Get the runner for a live activity.
    ///
    /// When no runner exists and `create_if_missing` is set, a runner is created
    /// from the installed activity record. Fails with
    /// [`Error::UnknownLiveActivity`] when there is no runner and none may or
    /// can be created.
    pub async fn live_activity_runner(
        &self,
        uuid: &str,
        create_if_missing: bool,
    ) -> Result<Arc<LiveActivityRunner>> {
        if let Some(runner) = self.existing_runner(uuid) {
            return Ok(runner);
        }
        if !create_if_missing {
            return Err(Error::UnknownLiveActivity(uuid.to_string()));
        }

        let installed = self
            .repository
            .installed_live_activity(uuid)
            .await?
            .ok_or_else(|| Error::UnknownLiveActivity(uuid.to_string()))?;

        let runner = self.new_live_activity_runner(installed)?;
        let runner = self
            .runners
            .entry(uuid.to_string())
            .or_insert(runner)
            .value()
            .clone();

        debug!(uuid = %uuid, "Live activity runner registered");
        Ok(runner)
    }

    /// Every registered runner.
    pub fn live_activity_runners(&self) -> Vec<Arc<LiveActivityRunner>> {
        self.runners
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Every installed live activity, whether it has a runner or not.
    pub async fn all_installed_live_activities(&self) -> Result<Vec<InstalledLiveActivity>> {
        self.repository.all_installed_live_activities().await
    }

    /// Start a live activity.
    ///
    /// An activity that is already running is left alone and its current
    /// status is published again.
    pub async fn startup_live_activity(&self, uuid: &str) -> Result<TransitionResult> {
        info!(uuid = %uuid, "Starting up live activity");
        let runner = self
            .runner_for_command(uuid, ActivityState::StartupFailure)
            .await?;

        let status = runner.cached_activity_status();
        if status.state().is_running() {
            self.publish(uuid, &status);
            return Ok(TransitionResult::Noop);
        }

        self.attempt_transition(&runner, ActivityStateTransition::Startup)
            .await
    }

    /// Activate a live activity, starting it first if it is not running.
    pub async fn activate_live_activity(&self, uuid: &str) -> Result<TransitionResult> {
        info!(uuid = %uuid, "Activating live activity");
        let runner = self
            .runner_for_command(uuid, ActivityState::ActivateFailure)
            .await?;

        let status = runner.sample_activity_status().await;
        if ActivityStateTransition::Startup.can_transition(status.state()) == TransitionResult::Ok {
            debug!(uuid = %uuid, "Live activity not running, starting before activation");
            runner.startup().await;
            if runner.cached_activity_status().state().is_running() {
                runner.activate().await?;
            }
            return Ok(TransitionResult::Ok);
        }

        self.attempt_transition(&runner, ActivityStateTransition::Activate)
            .await
    }

    /// Deactivate a live activity.
    pub async fn deactivate_live_activity(&self, uuid: &str) -> Result<TransitionResult> {
        info!(uuid = %uuid, "Deactivating live activity");
        match self.runner_or_installed(uuid).await? {
            Some(runner) => {
                self.attempt_transition(&runner, ActivityStateTransition::Deactivate)
                    .await
            }
            None => {
                error!(
                    uuid = %uuid,
                    state = %ActivityState::Ready,
                    "Tried to deactivate live activity that was never started"
                );
                Ok(TransitionResult::Illegal)
            }
        }
    }

    /// Shut a live activity down.
    pub async fn shutdown_live_activity(&self, uuid: &str) -> Result<TransitionResult> {
        info!(uuid = %uuid, "Shutting down live activity");
        match self.runner_or_installed(uuid).await? {
            Some(runner) => {
                self.attempt_transition(&runner, ActivityStateTransition::Shutdown)
                    .await
            }
            None => {
                self.publish(uuid, &ActivityStatus::ready());
                Ok(TransitionResult::Noop)
            }
        }
    }

    /// Sample a live activity and publish its status.
    pub async fn status_live_activity(&self, uuid: &str) -> Result<ActivityStatus> {
        let status = match self.runner_or_installed(uuid).await? {
            Some(runner) => runner.sample_activity_status().await,
            None => ActivityStatus::ready(),
        };

        info!(uuid = %uuid, status = %status, "Reporting live activity status");
        self.publish(uuid, &status);
        Ok(status)
    }

    /// Merge a configuration update into a live activity.
    pub async fn configure_live_activity(
        &self,
        uuid: &str,
        configuration: ActivityConfiguration,
    ) -> Result<()> {
        info!(uuid = %uuid, keys = configuration.len(), "Configuring live activity");
        let runner = self
            .runner_for_command(uuid, ActivityState::Unknown)
            .await?;
        runner.update_configuration(configuration).await
    }

    /// Empty the tmp data directory of a live activity that is not running.
    ///
    /// Returns whether the directory was cleaned.
    pub async fn clean_live_activity_tmp_data(&self, uuid: &str) -> Result<bool> {
        if self.is_runner_running(uuid) {
            warn!(
                uuid = %uuid,
                "Attempting to clean activity tmp directory for a running activity. Aborting."
            );
            return Ok(false);
        }

        info!(uuid = %uuid, "Cleaning activity tmp directory");
        self.storage.clean_tmp_activity_data_directory(uuid).await?;
        Ok(true)
    }

    /// Empty the permanent data directory of a live activity that is not running.
    ///
    /// Returns whether the directory was cleaned.
    pub async fn clean_live_activity_permanent_data(&self, uuid: &str) -> Result<bool> {
        if self.is_runner_running(uuid) {
            warn!(
                uuid = %uuid,
                "Attempting to clean activity permanent data directory for a running activity. Aborting."
            );
            return Ok(false);
        }

        info!(uuid = %uuid, "Cleaning activity permanent data directory");
        self.storage
            .clean_permanent_activity_data_directory(uuid)
            .await?;
        Ok(true)
    }

    /// Attempt startup on every registered runner.
    pub async fn startup_all_activities(&self) {
        let runners = self.live_activity_runners();
        info!(count = runners.len(), "Starting up all live activities");
        for runner in runners {
            if let Err(e) = self
                .attempt_transition(&runner, ActivityStateTransition::Startup)
                .await
            {
                error!(uuid = %runner.uuid(), error = %e, "Failed to start live activity");
            }
        }
    }

    /// Attempt shutdown on every registered runner.
    pub async fn shutdown_all_activities(&self) {
        let runners = self.live_activity_runners();
        info!(count = runners.len(), "Shutting down all live activities");
        for runner in runners {
            if let Err(e) = self
                .attempt_transition(&runner, ActivityStateTransition::Shutdown)
                .await
            {
                error!(uuid = %runner.uuid(), error = %e, "Failed to shut down live activity");
            }
        }
    }

    fn existing_runner(&self, uuid: &str) -> Option<Arc<LiveActivityRunner>> {
        self.runners.get(uuid).map(|entry| entry.value().clone())
    }

    fn is_runner_running(&self, uuid: &str) -> bool {
        self.existing_runner(uuid)
            .is_some_and(|runner| runner.cached_activity_status().state().is_running())
    }

    fn new_live_activity_runner(
        &self,
        installed: InstalledLiveActivity,
    ) -> Result<Arc<LiveActivityRunner>> {
        let factory = self.registry.resolve_factory(&installed.activity_type)?;

        let mut filesystem = self.storage.activity_filesystem(&installed.uuid)?;
        if let Some(install_path) = &installed.install_path {
            filesystem = filesystem.with_install_dir(install_path);
        }

        let wrapper = factory.new_activity_wrapper(&installed, &filesystem)?;
        let listener: Weak<dyn LiveActivityRunnerListener> = self.me.clone();

        info!(
            uuid = %installed.uuid,
            name = %installed.identifying_name,
            activity_type = %installed.activity_type,
            "Created live activity runner"
        );

        Ok(Arc::new(LiveActivityRunner::new(
            installed, wrapper, filesystem, listener,
        )))
    }

    /// Get or create the runner for a command, publishing a status that
    /// explains why when there is none.
    async fn runner_for_command(
        &self,
        uuid: &str,
        failure_state: ActivityState,
    ) -> Result<Arc<LiveActivityRunner>> {
        match self.live_activity_runner(uuid, true).await {
            Ok(runner) => Ok(runner),
            Err(Error::UnknownLiveActivity(_)) => Err(self.report_missing(uuid)),
            Err(e) => {
                error!(uuid = %uuid, error = %e, "Could not create live activity runner");
                self.publish(uuid, &ActivityStatus::with_detail(failure_state, e.to_string()));
                Err(e)
            }
        }
    }

    /// Existing runner, `None` for an installed activity without one.
    async fn runner_or_installed(&self, uuid: &str) -> Result<Option<Arc<LiveActivityRunner>>> {
        if let Some(runner) = self.existing_runner(uuid) {
            return Ok(Some(runner));
        }

        match self.repository.installed_live_activity(uuid).await? {
            Some(_) => Ok(None),
            None => Err(self.report_missing(uuid)),
        }
    }

    fn report_missing(&self, uuid: &str) -> Error {
        warn!(uuid = %uuid, "Live activity does not exist on controller");
        self.publish(
            uuid,
            &ActivityStatus::with_detail(ActivityState::DoesntExist, "Activity does not exist"),
        );
        Error::UnknownLiveActivity(uuid.to_string())
    }

    async fn attempt_transition(
        &self,
        runner: &Arc<LiveActivityRunner>,
        transition: ActivityStateTransition,
    ) -> Result<TransitionResult> {
        let status = runner.sample_activity_status().await;
        let result = transition.can_transition(status.state());

        match result {
            TransitionResult::Ok => match transition {
                ActivityStateTransition::Startup => runner.startup().await,
                ActivityStateTransition::Activate => runner.activate().await?,
                ActivityStateTransition::Deactivate => runner.deactivate().await?,
                ActivityStateTransition::Shutdown => runner.shutdown().await,
            },
            TransitionResult::Noop => {
                let reply = match transition {
                    ActivityStateTransition::Startup => status,
                    ActivityStateTransition::Activate => ActivityStatus::new(ActivityState::Active),
                    ActivityStateTransition::Deactivate => {
                        ActivityStatus::new(ActivityState::Running)
                    }
                    ActivityStateTransition::Shutdown => ActivityStatus::ready(),
                };
                warn!(
                    uuid = %runner.uuid(),
                    transition = %transition,
                    reply = %reply.state(),
                    "Live activity already in target state"
                );
                self.publish(runner.uuid(), &reply);
            }
            TransitionResult::Illegal => {
                error!(
                    uuid = %runner.uuid(),
                    transition = %transition,
                    state = %status,
                    "Illegal live activity state transition"
                );
            }
        }

        Ok(result)
    }

    fn publish(&self, uuid: &str, status: &ActivityStatus) {
        self.publisher.publish_activity_status(uuid, status);
    }
}

impl LiveActivityRunnerListener for LiveActivityRuntime {
    fn on_activity_status_change(
        &self,
        runner: &Arc<LiveActivityRunner>,
        old_status: &ActivityStatus,
        new_status: &ActivityStatus,
    ) {
        let old_state = old_status.state();
        let new_state = new_status.state();
        let error = new_state.is_error();

        if error {
            error!(
                uuid = %runner.uuid(),
                state = %new_state,
                detail = new_status.detail(),
                "Error for live activity"
            );
        } else {
            info!(uuid = %runner.uuid(), state = %new_state, "Live activity state changed");
        }

        if !old_state.is_running() && new_state.is_running() && !error {
            self.sampler.start_sampling_runner(runner.clone());
        } else if old_state.is_running() && !new_state.is_running() {
            self.sampler.stop_sampling_runner(runner.uuid());
        }

        self.publish(runner.uuid(), new_status);

        if error {
            self.alerts.announce_live_activity_status(runner);
        }
    }

    fn on_no_instance_activity_status_event(&self, runner: &Arc<LiveActivityRunner>) {
        let status = runner.cached_activity_status();
        if !status.state().is_error() {
            warn!(
                uuid = %runner.uuid(),
                state = %status.state(),
                "Live activity runner without instance reported a non-error status"
            );
        }

        self.publish(runner.uuid(), &status);
        self.alerts.announce_live_activity_status(runner);
    }
}
