// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Remote live activity deployment transactions.
//!
//! Each deployment runs as a transaction keyed by a fresh transaction ID:
//!
//! ```text
//!                 no dependencies
//!   deploy ─────────────────────────────────────────┐
//!     │                                             ▼
//!     │ always send          commit SUCCESS    DEPLOYING_ACTIVITY ──► DEPLOYMENT_COMPLETE
//!     ├──────────► SATISFYING_DEPENDENCIES ────────►  ▲          deploy result
//!     │                │ commit FAILURE               │
//!     │                └──────────────────────────────┼──────────► DEPLOYMENT_COMPLETE
//!     │ query first           query SATISFIED         │      (dependencies not satisfied)
//!     └──────────► QUERYING_DEPENDENCIES ─────────────┘
//!                      │ query NOT_SATISFIED
//!                      └──► SATISFYING_DEPENDENCIES
//! ```
//!
//! `DEPLOYMENT_COMPLETE` does not say whether the deployment worked. Listeners
//! inspect the [`LiveActivityDeploymentResponse`] they are signalled with.
//!
//! A transaction is inserted already in its first phase. Every answer moves
//! it on with a compare-and-transition on the map entry, so of two answers
//! racing for the same phase only one proceeds. Answers that do not fit the
//! transaction's phase are logged and dropped; the transaction stays in
//! flight. Answers for unknown transaction IDs are logged and dropped.
//! Finalization removes the transaction from the map atomically, so
//! listeners hear about a transaction at most once.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client::{RemoteControllerClient, RemoteControllerClientListenerHelper};
use crate::config::DeploymentManagerConfig;
use crate::error::Result;
use crate::resources::{
    ContainerResourceDeploymentManager, RESOURCE_CATEGORY_ACTIVITY, ResourceRepositoryServer,
};
use crate::types::{
    ActiveLiveActivity, ActivityDeployStatus, CommitResponseStatus,
    ContainerResourceDeploymentCommitResponse, ContainerResourceDeploymentQueryRequest,
    ContainerResourceDeploymentQueryResponse, LiveActivityDeleteRequest,
    LiveActivityDeploymentResponse, MasterActivityDeploymentRequest,
    MasterActivityDeploymentRequestStatus as Status, QueryResponseStatus,
};

/// Master-side manager of live activity deployment transactions.
pub struct RemoteActivityDeploymentManager {
    client: Arc<dyn RemoteControllerClient>,
    repository_server: Arc<dyn ResourceRepositoryServer>,
    resource_deployment: Arc<dyn ContainerResourceDeploymentManager>,
    listeners: Arc<RemoteControllerClientListenerHelper>,
    deployment_requests: DashMap<Uuid, MasterActivityDeploymentRequest>,
    config: DeploymentManagerConfig,
}

impl RemoteActivityDeploymentManager {
    /// Create a manager and register it with the client.
    pub fn new(
        client: Arc<dyn RemoteControllerClient>,
        repository_server: Arc<dyn ResourceRepositoryServer>,
        resource_deployment: Arc<dyn ContainerResourceDeploymentManager>,
        config: DeploymentManagerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| {
            let listeners = client.register_remote_activity_deployment_manager(me.clone());
            Self {
                client,
                repository_server,
                resource_deployment,
                listeners,
                deployment_requests: DashMap::new(),
                config,
            }
        })
    }

    /// Configuration of this manager.
    pub fn config(&self) -> &DeploymentManagerConfig {
        &self.config
    }

    /// Listener fan-out that receives finalized deployments.
    pub fn listeners(&self) -> &Arc<RemoteControllerClientListenerHelper> {
        &self.listeners
    }

    /// Start deploying a live activity. Returns the transaction ID.
    ///
    /// Failures along the way never surface here. They finalize the
    /// transaction with a failure outcome delivered to listeners.
    pub async fn deploy_live_activity(&self, live_activity: &ActiveLiveActivity) -> Uuid {
        let transaction_id = Uuid::new_v4();
        let activity = &live_activity.activity;

        let resource_uri = self.repository_server.resource_uri(
            RESOURCE_CATEGORY_ACTIVITY,
            &activity.identifying_name,
            &activity.version,
        );
        let query = (!activity.dependencies.is_empty()).then(|| {
            ContainerResourceDeploymentQueryRequest {
                transaction_id,
                queries: activity
                    .dependencies
                    .iter()
                    .map(|dependency| dependency.to_reference())
                    .collect(),
            }
        });
        let first_phase = match &query {
            Some(_) if self.config.always_send_dependencies => Status::SatisfyingDependencies,
            Some(_) => Status::QueryingDependencies,
            None => Status::DeployingActivity,
        };

        let mut request = MasterActivityDeploymentRequest::new(
            transaction_id,
            live_activity.clone(),
            resource_uri,
            first_phase,
        );
        request.resource_deployment_query = query;

        info!(
            transaction_id = %transaction_id,
            uuid = %live_activity.uuid,
            activity = %activity.identifying_name,
            version = %activity.version,
            dependencies = activity.dependencies.len(),
            "Deploying live activity"
        );

        self.begin_deployment(request).await;
        transaction_id
    }

    /// Ask the hosting controller to delete a live activity.
    ///
    /// Deletes are not tracked as transactions. The answer reaches listeners
    /// through the client.
    pub async fn delete_live_activity(&self, live_activity: &ActiveLiveActivity) -> Result<()> {
        let request = LiveActivityDeleteRequest {
            uuid: live_activity.uuid.clone(),
            identifying_name: live_activity.activity.identifying_name.clone(),
            version: live_activity.activity.version.clone(),
            force: true,
        };

        info!(
            uuid = %live_activity.uuid,
            controller = %live_activity.controller.uuid,
            "Deleting live activity"
        );
        self.client.delete_activity(live_activity, &request).await
    }

    /// Handle the controller's answer to a deploy command.
    ///
    /// Returns whether the transaction ID was known.
    pub async fn handle_live_deploy_result(&self, response: LiveActivityDeploymentResponse) -> bool {
        let transaction_id = response.transaction_id;
        if !self.deployment_requests.contains_key(&transaction_id) {
            info!(
                transaction_id = %transaction_id,
                "Got activity deployment status with unknown transaction ID"
            );
            return false;
        }

        info!(
            transaction_id = %transaction_id,
            outcome = %response.status,
            "Got activity deployment status"
        );

        if !self.finalize_activity_deployment(transaction_id, Status::DeployingActivity, response) {
            self.report_inconsistent(transaction_id, "Activity deployment status");
        }
        true
    }

    /// Handle the controller's answer to a dependency query.
    ///
    /// Returns whether the transaction ID was known.
    pub async fn handle_resource_deployment_query_response(
        &self,
        response: ContainerResourceDeploymentQueryResponse,
    ) -> bool {
        let transaction_id = response.transaction_id;
        if !self.deployment_requests.contains_key(&transaction_id) {
            debug!(
                transaction_id = %transaction_id,
                "Got resource deployment query response with unknown transaction ID"
            );
            return false;
        }

        info!(
            transaction_id = %transaction_id,
            query_status = ?response.status,
            "Got resource deployment query response as part of a live activity deployment"
        );

        let next = match response.status {
            QueryResponseStatus::SpecificQuerySatisfied => Status::DeployingActivity,
            QueryResponseStatus::SpecificQueryNotSatisfied => Status::SatisfyingDependencies,
            other => {
                warn!(
                    transaction_id = %transaction_id,
                    query_status = ?other,
                    "Resource deployment query response has inconsistent status"
                );
                return true;
            }
        };

        let Some(request) = self.transition(transaction_id, Status::QueryingDependencies, next)
        else {
            self.report_inconsistent(transaction_id, "Resource deployment query response");
            return true;
        };

        match next {
            Status::DeployingActivity => self.send_deployment(request).await,
            _ => self.satisfy_dependencies(request).await,
        }
        true
    }

    /// Handle the controller's answer to a resource commit.
    ///
    /// Returns whether the transaction ID was known.
    pub async fn handle_resource_deployment_commit_response(
        &self,
        response: ContainerResourceDeploymentCommitResponse,
    ) -> bool {
        let transaction_id = response.transaction_id;
        if !self.deployment_requests.contains_key(&transaction_id) {
            debug!(
                transaction_id = %transaction_id,
                "Got resource deployment commit response with unknown transaction ID"
            );
            return false;
        }

        info!(
            transaction_id = %transaction_id,
            commit_status = ?response.status,
            "Got resource deployment commit response as part of a live activity deployment"
        );

        let handled = match response.status {
            CommitResponseStatus::Success => {
                match self.transition(
                    transaction_id,
                    Status::SatisfyingDependencies,
                    Status::DeployingActivity,
                ) {
                    Some(request) => {
                        self.send_deployment(request).await;
                        true
                    }
                    None => false,
                }
            }
            CommitResponseStatus::Failure => self.finalize_with_failure(
                transaction_id,
                Status::SatisfyingDependencies,
                ActivityDeployStatus::FailureDependenciesNotSatisfied,
                response.detail,
            ),
        };

        if !handled {
            self.report_inconsistent(transaction_id, "Resource deployment commit response");
        }
        true
    }

    /// Snapshot of an in-flight transaction.
    pub fn deployment_request(&self, transaction_id: Uuid) -> Option<MasterActivityDeploymentRequest> {
        self.deployment_requests
            .get(&transaction_id)
            .map(|entry| entry.value().clone())
    }

    /// Snapshots of every in-flight transaction.
    pub fn in_flight_transactions(&self) -> Vec<MasterActivityDeploymentRequest> {
        self.deployment_requests
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of in-flight transactions.
    pub fn in_flight_count(&self) -> usize {
        self.deployment_requests.len()
    }

    /// Finalize every transaction whose phase has not changed for longer than
    /// `timeout`, with outcome [`ActivityDeployStatus::FailureTimedOut`].
    ///
    /// Returns the number of transactions finalized.
    pub fn evict_stale_transactions(&self, timeout: Duration) -> usize {
        let Ok(timeout) = chrono::Duration::from_std(timeout) else {
            return 0;
        };
        let cutoff = Utc::now() - timeout;

        let stale: Vec<Uuid> = self
            .deployment_requests
            .iter()
            .filter(|entry| entry.status_updated_at < cutoff)
            .map(|entry| *entry.key())
            .collect();

        let mut evicted = 0;
        for transaction_id in stale {
            let Some((_, request)) = self
                .deployment_requests
                .remove_if(&transaction_id, |_, request| request.status_updated_at < cutoff)
            else {
                continue;
            };

            warn!(
                transaction_id = %transaction_id,
                uuid = %request.uuid(),
                status = %request.status,
                "Live activity deployment timed out"
            );
            let response = LiveActivityDeploymentResponse::new(
                transaction_id,
                request.uuid(),
                ActivityDeployStatus::FailureTimedOut,
            )
            .with_detail(format!("No progress while {}", request.status));
            self.complete(request, response);
            evicted += 1;
        }
        evicted
    }

    async fn begin_deployment(&self, request: MasterActivityDeploymentRequest) {
        let transaction_id = request.transaction_id;
        self.deployment_requests
            .insert(transaction_id, request.clone());

        match request.status {
            Status::SatisfyingDependencies => self.satisfy_dependencies(request).await,
            Status::QueryingDependencies => self.send_query(request).await,
            _ => self.send_deployment(request).await,
        }
    }

    async fn send_query(&self, request: MasterActivityDeploymentRequest) {
        let transaction_id = request.transaction_id;
        let Some(query) = &request.resource_deployment_query else {
            return;
        };

        if let Err(e) = self
            .client
            .query_resource_deployment(&request.live_activity.controller, query)
            .await
        {
            error!(transaction_id = %transaction_id, error = %e, "Failed to send resource deployment query");
            self.finalize_with_failure(
                transaction_id,
                Status::QueryingDependencies,
                ActivityDeployStatus::FailureTransport,
                Some(e.to_string()),
            );
        }
    }

    /// Resolve dependencies on the master and commit them to the controller.
    ///
    /// The transaction must already be in `SatisfyingDependencies`.
    async fn satisfy_dependencies(&self, request: MasterActivityDeploymentRequest) {
        let transaction_id = request.transaction_id;
        let Some(query) = &request.resource_deployment_query else {
            return;
        };

        let resources = match self
            .resource_deployment
            .satisfy_dependencies(&query.queries)
            .await
        {
            Ok(resources) => resources,
            Err(e) => {
                warn!(transaction_id = %transaction_id, error = %e, "Could not satisfy live activity dependencies");
                self.finalize_with_failure(
                    transaction_id,
                    Status::SatisfyingDependencies,
                    ActivityDeployStatus::FailureDependenciesNotSatisfied,
                    Some(e.to_string()),
                );
                return;
            }
        };

        if let Err(e) = self
            .resource_deployment
            .commit_resources(transaction_id, &request.live_activity.controller, &resources)
            .await
        {
            error!(transaction_id = %transaction_id, error = %e, "Failed to send resource commit");
            self.finalize_with_failure(
                transaction_id,
                Status::SatisfyingDependencies,
                ActivityDeployStatus::FailureTransport,
                Some(e.to_string()),
            );
        }
    }

    /// Send the deploy command. The transaction must already be in
    /// `DeployingActivity`.
    async fn send_deployment(&self, request: MasterActivityDeploymentRequest) {
        let transaction_id = request.transaction_id;
        if let Err(e) = self
            .client
            .deploy_activity(&request.live_activity, &request)
            .await
        {
            error!(transaction_id = %transaction_id, error = %e, "Failed to send live activity deployment");
            self.finalize_with_failure(
                transaction_id,
                Status::DeployingActivity,
                ActivityDeployStatus::FailureTransport,
                Some(e.to_string()),
            );
        }
    }

    /// Move a transaction from `from` to `to` if it is in `from`.
    ///
    /// Check and update happen under the entry lock. Returns a snapshot of the
    /// updated transaction, `None` if it is gone or in another phase.
    fn transition(
        &self,
        transaction_id: Uuid,
        from: Status,
        to: Status,
    ) -> Option<MasterActivityDeploymentRequest> {
        let mut request = self.deployment_requests.get_mut(&transaction_id)?;
        if request.status != from {
            return None;
        }
        debug!(
            transaction_id = %transaction_id,
            from = %from,
            to = %to,
            "Deployment transaction status changed"
        );
        request.update_status(to, Utc::now());
        Some(request.clone())
    }

    fn report_inconsistent(&self, transaction_id: Uuid, what: &str) {
        let status = self
            .deployment_requests
            .get(&transaction_id)
            .map(|entry| entry.status);
        warn!(
            transaction_id = %transaction_id,
            status = ?status,
            answer = what,
            "Answer arrived while the transaction was in an inconsistent state"
        );
    }

    /// Finalize with a failure outcome if the transaction is still in
    /// `expected`. Returns whether it was finalized.
    fn finalize_with_failure(
        &self,
        transaction_id: Uuid,
        expected: Status,
        outcome: ActivityDeployStatus,
        detail: Option<String>,
    ) -> bool {
        let Some(uuid) = self
            .deployment_requests
            .get(&transaction_id)
            .map(|entry| entry.uuid().to_string())
        else {
            return false;
        };

        let mut response = LiveActivityDeploymentResponse::new(transaction_id, uuid, outcome);
        response.detail = detail;
        self.finalize_activity_deployment(transaction_id, expected, response)
    }

    /// Remove the transaction and signal listeners if it is still in flight
    /// in `expected` status.
    fn finalize_activity_deployment(
        &self,
        transaction_id: Uuid,
        expected: Status,
        response: LiveActivityDeploymentResponse,
    ) -> bool {
        let removed = self
            .deployment_requests
            .remove_if(&transaction_id, |_, request| request.status == expected);

        match removed {
            Some((_, request)) => {
                self.complete(request, response);
                true
            }
            None => false,
        }
    }

    fn complete(
        &self,
        mut request: MasterActivityDeploymentRequest,
        response: LiveActivityDeploymentResponse,
    ) {
        request.update_status(Status::DeploymentComplete, Utc::now());
        info!(
            transaction_id = %request.transaction_id,
            uuid = %response.uuid,
            outcome = %response.status,
            detail = response.detail.as_deref(),
            "Live activity deployment complete"
        );
        self.listeners
            .signal_activity_deploy_status(&response.uuid, &response);
    }
}
