// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock wrapper for testing.
//!
//! A wrapper implementation that simulates activities without running
//! anything. All instances created through one factory share a
//! [`MockActivityBehavior`] so tests can inject failures and crashes and
//! count lifecycle calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use livespace_core::{ActivityState, ActivityStatus, Version};

use super::traits::*;
use crate::repository::{ActivityConfiguration, InstalledLiveActivity};
use crate::storage::ActivityFilesystem;

/// Failure switches and call counters shared by mock activities.
#[derive(Debug, Default)]
pub struct MockActivityBehavior {
    fail_startup: AtomicBool,
    fail_activate: AtomicBool,
    fail_deactivate: AtomicBool,
    fail_shutdown: AtomicBool,
    crash_pending: AtomicBool,
    startup_delay_ms: AtomicU64,
    startups: AtomicUsize,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    shutdowns: AtomicUsize,
    configuration_updates: AtomicUsize,
}

impl MockActivityBehavior {
    /// Make startup fail.
    pub fn set_fail_startup(&self, fail: bool) {
        self.fail_startup.store(fail, Ordering::SeqCst);
    }

    /// Make activation fail.
    pub fn set_fail_activate(&self, fail: bool) {
        self.fail_activate.store(fail, Ordering::SeqCst);
    }

    /// Make deactivation fail.
    pub fn set_fail_deactivate(&self, fail: bool) {
        self.fail_deactivate.store(fail, Ordering::SeqCst);
    }

    /// Make shutdown fail.
    pub fn set_fail_shutdown(&self, fail: bool) {
        self.fail_shutdown.store(fail, Ordering::SeqCst);
    }

    /// Delay every startup, to simulate a slow activity.
    pub fn set_startup_delay(&self, delay: Duration) {
        self.startup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make the next running instance report a crash when it is checked.
    pub fn crash(&self) {
        self.crash_pending.store(true, Ordering::SeqCst);
    }

    /// Number of startup calls.
    pub fn startups(&self) -> usize {
        self.startups.load(Ordering::SeqCst)
    }

    /// Number of activate calls.
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    /// Number of deactivate calls.
    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    /// Number of shutdown calls.
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Number of configuration updates pushed to running instances.
    pub fn configuration_updates(&self) -> usize {
        self.configuration_updates.load(Ordering::SeqCst)
    }
}

/// Mock wrapper factory.
pub struct MockActivityWrapperFactory {
    activity_type: String,
    version: Option<Version>,
    behavior: Arc<MockActivityBehavior>,
}

impl MockActivityWrapperFactory {
    /// Create an unversioned factory for the activity type.
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
            version: None,
            behavior: Arc::new(MockActivityBehavior::default()),
        }
    }

    /// Create a factory for the activity type at a version.
    pub fn versioned(activity_type: impl Into<String>, version: Version) -> Self {
        Self {
            version: Some(version),
            ..Self::new(activity_type)
        }
    }

    /// Behavior shared by every instance of this factory.
    pub fn behavior(&self) -> Arc<MockActivityBehavior> {
        self.behavior.clone()
    }
}

impl ActivityWrapperFactory for MockActivityWrapperFactory {
    fn activity_type(&self) -> &str {
        &self.activity_type
    }

    fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    fn new_activity_wrapper(
        &self,
        _activity: &InstalledLiveActivity,
        _filesystem: &ActivityFilesystem,
    ) -> Result<Box<dyn ActivityWrapper>> {
        Ok(Box::new(MockActivityWrapper {
            behavior: self.behavior.clone(),
        }))
    }
}

struct MockActivityWrapper {
    behavior: Arc<MockActivityBehavior>,
}

impl ActivityWrapper for MockActivityWrapper {
    fn new_instance(
        &self,
        _configuration: &ActivityConfiguration,
    ) -> Result<Box<dyn ActivityInstance>> {
        Ok(Box::new(MockActivityInstance {
            behavior: self.behavior.clone(),
            running: false,
        }))
    }
}

struct MockActivityInstance {
    behavior: Arc<MockActivityBehavior>,
    running: bool,
}

#[async_trait]
impl ActivityInstance for MockActivityInstance {
    async fn startup(&mut self) -> Result<()> {
        self.behavior.startups.fetch_add(1, Ordering::SeqCst);

        let delay_ms = self.behavior.startup_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.behavior.fail_startup.load(Ordering::SeqCst) {
            return Err(WrapperError::StartFailed("mock startup failure".to_string()));
        }
        self.running = true;
        Ok(())
    }

    async fn activate(&mut self) -> Result<()> {
        self.behavior.activations.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_activate.load(Ordering::SeqCst) {
            return Err(WrapperError::ActivityFailed(
                "mock activate failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<()> {
        self.behavior.deactivations.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_deactivate.load(Ordering::SeqCst) {
            return Err(WrapperError::ActivityFailed(
                "mock deactivate failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.behavior.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_shutdown.load(Ordering::SeqCst) {
            return Err(WrapperError::ActivityFailed(
                "mock shutdown failure".to_string(),
            ));
        }
        self.running = false;
        Ok(())
    }

    async fn check_activity_state(&mut self) -> Option<ActivityStatus> {
        if self.running && self.behavior.crash_pending.swap(false, Ordering::SeqCst) {
            self.running = false;
            return Some(ActivityStatus::with_detail(
                ActivityState::Crashed,
                "mock activity crashed",
            ));
        }
        None
    }

    async fn update_configuration(&mut self, _update: &ActivityConfiguration) -> Result<()> {
        self.behavior
            .configuration_updates
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
