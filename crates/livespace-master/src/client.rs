// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Remote controller transport contract and listener fan-out.
//!
//! A [`RemoteControllerClient`] hands requests to remote controllers and
//! routes their asynchronous answers back: deployment-related answers to the
//! registered [`RemoteActivityDeploymentManager`], everything else to the
//! listeners of a [`RemoteControllerClientListenerHelper`].

use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use livespace_core::ActivityState;
use tracing::debug;

use crate::deployment::RemoteActivityDeploymentManager;
use crate::error::Result;
use crate::types::{
    ActiveLiveActivity, ActiveSpaceController, ContainerResourceDeploymentCommitRequest,
    ContainerResourceDeploymentQueryRequest, LiveActivityDeleteRequest, LiveActivityDeleteResult,
    LiveActivityDeploymentResponse, MasterActivityDeploymentRequest,
};

/// Transport to remote space controllers.
///
/// Every send returns once the request was handed to the transport. Answers
/// arrive later through the registered deployment manager or listeners.
#[async_trait]
pub trait RemoteControllerClient: Send + Sync {
    /// Register the deployment manager that receives deploy, query and commit
    /// answers. Returns the fan-out used to signal listeners.
    fn register_remote_activity_deployment_manager(
        &self,
        manager: Weak<RemoteActivityDeploymentManager>,
    ) -> Arc<RemoteControllerClientListenerHelper>;

    /// Send the deploy command for a live activity.
    async fn deploy_activity(
        &self,
        activity: &ActiveLiveActivity,
        request: &MasterActivityDeploymentRequest,
    ) -> Result<()>;

    /// Ask a controller whether it has the resources of a query.
    async fn query_resource_deployment(
        &self,
        controller: &ActiveSpaceController,
        query: &ContainerResourceDeploymentQueryRequest,
    ) -> Result<()>;

    /// Ask a controller to install a set of resources.
    async fn commit_resource_deployment(
        &self,
        controller: &ActiveSpaceController,
        request: &ContainerResourceDeploymentCommitRequest,
    ) -> Result<()>;

    /// Ask a controller to delete a live activity.
    async fn delete_activity(
        &self,
        activity: &ActiveLiveActivity,
        request: &LiveActivityDeleteRequest,
    ) -> Result<()>;
}

/// Receives events about remote controllers and their live activities.
///
/// Every method has an empty default so listeners only implement what they
/// care about.
pub trait RemoteSpaceControllerClientListener: Send + Sync {
    /// A deployment finished, successfully or not.
    fn on_live_activity_deployment(&self, _uuid: &str, _response: &LiveActivityDeploymentResponse) {}

    /// A controller answered a delete request.
    fn on_live_activity_delete(&self, _uuid: &str, _result: &LiveActivityDeleteResult) {}

    /// A controller reported a new state for a live activity.
    fn on_live_activity_state_change(
        &self,
        _uuid: &str,
        _state: ActivityState,
        _detail: Option<&str>,
    ) {
    }
}

/// Fan-out of remote controller events to any number of listeners.
///
/// Listeners are called outside the internal lock, so a listener may add or
/// remove listeners while it is being signalled.
#[derive(Default)]
pub struct RemoteControllerClientListenerHelper {
    listeners: RwLock<Vec<Arc<dyn RemoteSpaceControllerClientListener>>>,
}

impl RemoteControllerClientListenerHelper {
    /// Create a helper with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener.
    pub fn add_listener(&self, listener: Arc<dyn RemoteSpaceControllerClientListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn RemoteSpaceControllerClientListener>) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|registered| !Arc::ptr_eq(registered, listener));
        listeners.len() != before
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal the outcome of a deployment.
    pub fn signal_activity_deploy_status(&self, uuid: &str, response: &LiveActivityDeploymentResponse) {
        debug!(
            uuid = %uuid,
            transaction_id = %response.transaction_id,
            status = %response.status,
            "Signalling live activity deployment"
        );
        for listener in self.snapshot() {
            listener.on_live_activity_deployment(uuid, response);
        }
    }

    /// Signal the outcome of a delete.
    pub fn signal_activity_delete(&self, uuid: &str, result: &LiveActivityDeleteResult) {
        for listener in self.snapshot() {
            listener.on_live_activity_delete(uuid, result);
        }
    }

    /// Signal a live activity state change.
    pub fn signal_activity_state_change(&self, uuid: &str, state: ActivityState, detail: Option<&str>) {
        for listener in self.snapshot() {
            listener.on_live_activity_state_change(uuid, state, detail);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn RemoteSpaceControllerClientListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
