// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for livespace-master tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use livespace_core::{NamedVersionedResource, ResourceDependencyReference, Version};
use tokio::sync::Notify;
use uuid::Uuid;

use livespace_master::client::{
    RemoteControllerClient, RemoteControllerClientListenerHelper,
    RemoteSpaceControllerClientListener,
};
use livespace_master::error::{Error, Result};
use livespace_master::resources::{
    BaseUrlResourceRepositoryServer, ContainerResourceDeploymentManager,
};
use livespace_master::types::{
    ActiveLiveActivity, ActiveSpaceController, Activity, ActivityDependency,
    ActivityDeployStatus, ContainerResourceDeploymentCommitRequest,
    ContainerResourceDeploymentQueryRequest, LiveActivityDeleteRequest,
    LiveActivityDeploymentResponse, MasterActivityDeploymentRequest,
};
use livespace_master::{DeploymentManagerConfig, RemoteActivityDeploymentManager};

/// Base URL of the test resource repository.
pub const REPOSITORY_URL: &str = "http://master:10000/repo";

/// Everything a [`RecordingClient`] was asked to send, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Deploy(MasterActivityDeploymentRequest),
    Query(ContainerResourceDeploymentQueryRequest),
    Commit(ContainerResourceDeploymentCommitRequest),
    Delete(LiveActivityDeleteRequest),
}

/// Client that records every request and can be told to fail sends.
pub struct RecordingClient {
    helper: Arc<RemoteControllerClientListenerHelper>,
    manager: Mutex<Option<Weak<RemoteActivityDeploymentManager>>>,
    sent: Mutex<Vec<Sent>>,
    fail_sends: AtomicBool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            helper: Arc::new(RemoteControllerClientListenerHelper::new()),
            manager: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Make every following send fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Requests sent so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deploys(&self) -> Vec<MasterActivityDeploymentRequest> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Deploy(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn queries(&self) -> Vec<ContainerResourceDeploymentQueryRequest> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Query(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn commits(&self) -> Vec<ContainerResourceDeploymentCommitRequest> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Commit(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<LiveActivityDeleteRequest> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Delete(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// The manager registered with this client, if it is still alive.
    pub fn registered_manager(&self) -> Option<Arc<RemoteActivityDeploymentManager>> {
        self.manager.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }

    fn record(&self, sent: Sent) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl RemoteControllerClient for RecordingClient {
    fn register_remote_activity_deployment_manager(
        &self,
        manager: Weak<RemoteActivityDeploymentManager>,
    ) -> Arc<RemoteControllerClientListenerHelper> {
        *self.manager.lock().unwrap() = Some(manager);
        self.helper.clone()
    }

    async fn deploy_activity(
        &self,
        _activity: &ActiveLiveActivity,
        request: &MasterActivityDeploymentRequest,
    ) -> Result<()> {
        self.record(Sent::Deploy(request.clone()))
    }

    async fn query_resource_deployment(
        &self,
        _controller: &ActiveSpaceController,
        query: &ContainerResourceDeploymentQueryRequest,
    ) -> Result<()> {
        self.record(Sent::Query(query.clone()))
    }

    async fn commit_resource_deployment(
        &self,
        _controller: &ActiveSpaceController,
        request: &ContainerResourceDeploymentCommitRequest,
    ) -> Result<()> {
        self.record(Sent::Commit(request.clone()))
    }

    async fn delete_activity(
        &self,
        _activity: &ActiveLiveActivity,
        request: &LiveActivityDeleteRequest,
    ) -> Result<()> {
        self.record(Sent::Delete(request.clone()))
    }
}

/// Resource deployment that satisfies everything unless told otherwise and
/// records commits.
#[derive(Default)]
pub struct ScriptedResources {
    unsatisfiable: AtomicBool,
    fail_commits: AtomicBool,
    commits: Mutex<Vec<(Uuid, Vec<NamedVersionedResource>)>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl ScriptedResources {
    /// Hold every following resolution until the returned gate is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Wait until a resolution is held at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn set_unsatisfiable(&self, value: bool) {
        self.unsatisfiable.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_commits(&self, value: bool) {
        self.fail_commits.store(value, Ordering::SeqCst);
    }

    pub fn commits(&self) -> Vec<(Uuid, Vec<NamedVersionedResource>)> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerResourceDeploymentManager for ScriptedResources {
    async fn satisfy_dependencies(
        &self,
        dependencies: &[ResourceDependencyReference],
    ) -> Result<Vec<NamedVersionedResource>> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.entered.notify_one();
            gate.notified().await;
        }

        if self.unsatisfiable.load(Ordering::SeqCst)
            && let Some(dependency) = dependencies.first()
        {
            return Err(Error::DependencyNotFound {
                name: dependency.name.clone(),
                range: dependency.version_range.to_string(),
            });
        }
        Ok(dependencies
            .iter()
            .map(|dependency| {
                NamedVersionedResource::new(
                    dependency.name.clone(),
                    dependency.version_range.minimum().clone(),
                )
            })
            .collect())
    }

    async fn commit_resources(
        &self,
        transaction_id: Uuid,
        _controller: &ActiveSpaceController,
        resources: &[NamedVersionedResource],
    ) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection reset".to_string()));
        }
        self.commits
            .lock()
            .unwrap()
            .push((transaction_id, resources.to_vec()));
        Ok(())
    }
}

/// Listener that records every deployment outcome.
#[derive(Default)]
pub struct RecordingListener {
    deployments: Mutex<Vec<LiveActivityDeploymentResponse>>,
}

impl RecordingListener {
    pub fn deployments(&self) -> Vec<LiveActivityDeploymentResponse> {
        self.deployments.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<(String, ActivityDeployStatus)> {
        self.deployments()
            .into_iter()
            .map(|response| (response.uuid, response.status))
            .collect()
    }
}

impl RemoteSpaceControllerClientListener for RecordingListener {
    fn on_live_activity_deployment(&self, _uuid: &str, response: &LiveActivityDeploymentResponse) {
        self.deployments.lock().unwrap().push(response.clone());
    }
}

/// A deployment manager over recording seams.
pub struct TestContext {
    pub manager: Arc<RemoteActivityDeploymentManager>,
    pub client: Arc<RecordingClient>,
    pub resources: Arc<ScriptedResources>,
    pub listener: Arc<RecordingListener>,
}

impl TestContext {
    pub fn new(config: DeploymentManagerConfig) -> Self {
        let client = Arc::new(RecordingClient::new());
        let resources = Arc::new(ScriptedResources::default());
        let listener = Arc::new(RecordingListener::default());

        let manager = RemoteActivityDeploymentManager::new(
            client.clone(),
            Arc::new(BaseUrlResourceRepositoryServer::new(REPOSITORY_URL)),
            resources.clone(),
            config,
        );
        manager.listeners().add_listener(listener.clone());

        Self {
            manager,
            client,
            resources,
            listener,
        }
    }

    /// Context that queries the controller before committing dependencies.
    pub fn querying() -> Self {
        Self::new(DeploymentManagerConfig {
            always_send_dependencies: false,
            ..DeploymentManagerConfig::default()
        })
    }
}

pub fn controller() -> ActiveSpaceController {
    ActiveSpaceController::new("controller-1", "Lobby")
}

/// A live activity without dependencies.
pub fn plain_activity(uuid: &str) -> ActiveLiveActivity {
    ActiveLiveActivity::new(
        uuid,
        Activity::new("com.example.clock", Version::new(1, 0, 0)),
        controller(),
    )
}

/// A live activity depending on `lib.gfx [1.0.0, 2.0.0)`.
pub fn dependent_activity(uuid: &str) -> ActiveLiveActivity {
    ActiveLiveActivity::new(
        uuid,
        Activity::new("com.example.wall", Version::new(2, 1, 0)).with_dependency(
            ActivityDependency::new("lib.gfx", Version::new(1, 0, 0), Version::new(2, 0, 0)),
        ),
        controller(),
    )
}

/// Deploy response for a transaction.
pub fn deploy_response(
    transaction_id: Uuid,
    uuid: &str,
    status: ActivityDeployStatus,
) -> LiveActivityDeploymentResponse {
    LiveActivityDeploymentResponse::new(transaction_id, uuid, status)
}
