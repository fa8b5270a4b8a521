// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for livespace-controller tests.
//!
//! Provides recording implementations of every runtime seam and a
//! [`TestContext`] that wires them to a [`LiveActivityRuntime`].

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use livespace_core::{ActivityState, ActivityStatus, Version};
use tempfile::TempDir;

use livespace_controller::error::Result;
use livespace_controller::repository::{InMemoryLiveActivityRepository, InstalledLiveActivity};
use livespace_controller::runner::LiveActivityRunner;
use livespace_controller::sampler::RunnerSampler;
use livespace_controller::status::{AlertStatusManager, LiveActivityStatusPublisher};
use livespace_controller::storage::{ActivityFilesystem, LiveActivityStorageManager};
use livespace_controller::wrapper::{MockActivityBehavior, MockActivityWrapperFactory};
use livespace_controller::{ActivityWrapperRegistry, LiveActivityRuntime};

/// Activity type served by the mock factory of a [`TestContext`].
pub const MOCK_TYPE: &str = "mock";

/// Publisher that records every published status.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, ActivityStatus)>>,
}

impl RecordingPublisher {
    /// States published for a UUID, oldest first.
    pub fn states(&self, uuid: &str) -> Vec<ActivityState> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == uuid)
            .map(|(_, status)| status.state())
            .collect()
    }

    /// Last status published for a UUID.
    pub fn last(&self, uuid: &str) -> Option<ActivityStatus> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == uuid)
            .map(|(_, status)| status.clone())
    }

    /// Forget everything published so far.
    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl LiveActivityStatusPublisher for RecordingPublisher {
    fn publish_activity_status(&self, uuid: &str, status: &ActivityStatus) {
        self.published
            .lock()
            .unwrap()
            .push((uuid.to_string(), status.clone()));
    }
}

/// Alert manager that records every announcement.
#[derive(Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<(String, ActivityState)>>,
}

impl RecordingAlerts {
    /// States announced for a UUID.
    pub fn states(&self, uuid: &str) -> Vec<ActivityState> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == uuid)
            .map(|(_, state)| *state)
            .collect()
    }
}

impl AlertStatusManager for RecordingAlerts {
    fn announce_live_activity_status(&self, runner: &LiveActivityRunner) {
        self.alerts.lock().unwrap().push((
            runner.uuid().to_string(),
            runner.cached_activity_status().state(),
        ));
    }
}

/// Sampler that only records registrations.
#[derive(Default)]
pub struct RecordingSampler {
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl RecordingSampler {
    /// How many times sampling was started for a UUID.
    pub fn started(&self, uuid: &str) -> usize {
        self.started.lock().unwrap().iter().filter(|u| *u == uuid).count()
    }

    /// How many times sampling was stopped for a UUID.
    pub fn stopped(&self, uuid: &str) -> usize {
        self.stopped.lock().unwrap().iter().filter(|u| *u == uuid).count()
    }
}

impl RunnerSampler for RecordingSampler {
    fn start_sampling_runner(&self, runner: Arc<LiveActivityRunner>) {
        self.started.lock().unwrap().push(runner.uuid().to_string());
    }

    fn stop_sampling_runner(&self, uuid: &str) {
        self.stopped.lock().unwrap().push(uuid.to_string());
    }
}

/// Storage manager that counts clean calls and hands out temp directories.
pub struct CountingStorage {
    root: TempDir,
    tmp_cleans: AtomicUsize,
    permanent_cleans: AtomicUsize,
}

impl CountingStorage {
    /// Create a storage manager over a fresh temp directory.
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            tmp_cleans: AtomicUsize::new(0),
            permanent_cleans: AtomicUsize::new(0),
        }
    }

    /// Number of tmp directory cleans.
    pub fn tmp_cleans(&self) -> usize {
        self.tmp_cleans.load(Ordering::SeqCst)
    }

    /// Number of permanent directory cleans.
    pub fn permanent_cleans(&self) -> usize {
        self.permanent_cleans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveActivityStorageManager for CountingStorage {
    async fn clean_tmp_activity_data_directory(&self, _uuid: &str) -> Result<()> {
        self.tmp_cleans.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clean_permanent_activity_data_directory(&self, _uuid: &str) -> Result<()> {
        self.permanent_cleans.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn activity_filesystem(&self, uuid: &str) -> Result<ActivityFilesystem> {
        Ok(ActivityFilesystem::new(self.root.path().join(uuid)))
    }
}

/// A live activity runtime over recording seams and a mock wrapper factory.
pub struct TestContext {
    pub runtime: Arc<LiveActivityRuntime>,
    pub repository: Arc<InMemoryLiveActivityRepository>,
    pub publisher: Arc<RecordingPublisher>,
    pub alerts: Arc<RecordingAlerts>,
    pub sampler: Arc<RecordingSampler>,
    pub storage: Arc<CountingStorage>,
    pub behavior: Arc<MockActivityBehavior>,
}

impl TestContext {
    /// Create a context with the given activities installed.
    pub fn new(installed: impl IntoIterator<Item = InstalledLiveActivity>) -> Self {
        let factory = MockActivityWrapperFactory::new(MOCK_TYPE);
        let behavior = factory.behavior();
        let registry = Arc::new(ActivityWrapperRegistry::new());
        registry.register_activity_wrapper_factory(Arc::new(factory));

        let repository = Arc::new(InMemoryLiveActivityRepository::from_activities(installed));
        let publisher = Arc::new(RecordingPublisher::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let sampler = Arc::new(RecordingSampler::default());
        let storage = Arc::new(CountingStorage::new());

        let runtime = LiveActivityRuntime::new(
            registry,
            repository.clone(),
            storage.clone(),
            publisher.clone(),
            alerts.clone(),
            sampler.clone(),
        );

        Self {
            runtime,
            repository,
            publisher,
            alerts,
            sampler,
            storage,
            behavior,
        }
    }

    /// Create a context with one mock activity installed under `uuid`.
    pub fn with_activity(uuid: &str) -> Self {
        Self::new([mock_activity(uuid)])
    }
}

/// An installed mock activity.
pub fn mock_activity(uuid: &str) -> InstalledLiveActivity {
    InstalledLiveActivity::new(
        uuid,
        format!("com.example.{}", uuid),
        Version::new(1, 0, 0),
        MOCK_TYPE,
    )
}
