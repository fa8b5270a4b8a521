// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment messages and transaction records.
//!
//! Every type here derives serde so a transport can carry it; the encoding
//! itself is up to the transport.

use std::fmt;

use chrono::{DateTime, Utc};
use livespace_core::{ResourceDependencyReference, Version, VersionRange};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A space controller known to the master.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveSpaceController {
    /// Controller UUID
    pub uuid: String,
    /// Human-readable controller name
    pub name: String,
}

impl ActiveSpaceController {
    /// Create a controller reference.
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

/// A dependency declared by an activity: `[minimum_version, maximum_version)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDependency {
    /// Name of the required resource
    pub name: String,
    /// Lowest acceptable version (inclusive)
    pub minimum_version: Version,
    /// Upper bound (exclusive, unless equal to the minimum)
    pub maximum_version: Version,
}

impl ActivityDependency {
    /// Create a dependency.
    pub fn new(name: impl Into<String>, minimum_version: Version, maximum_version: Version) -> Self {
        Self {
            name: name.into(),
            minimum_version,
            maximum_version,
        }
    }

    /// The dependency as a query reference.
    pub fn to_reference(&self) -> ResourceDependencyReference {
        ResourceDependencyReference::new(
            self.name.clone(),
            VersionRange::new(
                self.minimum_version.clone(),
                self.maximum_version.clone(),
                false,
            ),
        )
    }
}

/// An activity bundle as known to the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Identifying name of the bundle
    pub identifying_name: String,
    /// Bundle version
    pub version: Version,
    /// Resources the bundle needs on the controller
    #[serde(default)]
    pub dependencies: Vec<ActivityDependency>,
}

impl Activity {
    /// Create an activity without dependencies.
    pub fn new(identifying_name: impl Into<String>, version: Version) -> Self {
        Self {
            identifying_name: identifying_name.into(),
            version,
            dependencies: Vec::new(),
        }
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, dependency: ActivityDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// A live activity bound to the controller that hosts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLiveActivity {
    /// Live activity UUID
    pub uuid: String,
    /// The activity bundle
    pub activity: Activity,
    /// Hosting controller
    pub controller: ActiveSpaceController,
}

impl ActiveLiveActivity {
    /// Create a live activity reference.
    pub fn new(uuid: impl Into<String>, activity: Activity, controller: ActiveSpaceController) -> Self {
        Self {
            uuid: uuid.into(),
            activity,
            controller,
        }
    }
}

/// Phase of a deployment transaction.
///
/// `DeploymentComplete` is terminal for both successful and failed
/// deployments. The outcome is carried by [`LiveActivityDeploymentResponse::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MasterActivityDeploymentRequestStatus {
    /// Waiting for the controller to answer a dependency query.
    QueryingDependencies,
    /// Dependencies were resolved on the master and a commit was requested.
    SatisfyingDependencies,
    /// The deploy command was sent to the controller.
    DeployingActivity,
    /// The transaction is finished.
    DeploymentComplete,
}

impl fmt::Display for MasterActivityDeploymentRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::QueryingDependencies => "QUERYING_DEPENDENCIES",
            Self::SatisfyingDependencies => "SATISFYING_DEPENDENCIES",
            Self::DeployingActivity => "DEPLOYING_ACTIVITY",
            Self::DeploymentComplete => "DEPLOYMENT_COMPLETE",
        };
        f.write_str(s)
    }
}

/// Query for the dependencies of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResourceDeploymentQueryRequest {
    /// Transaction the query belongs to
    pub transaction_id: Uuid,
    /// Required resources
    pub queries: Vec<ResourceDependencyReference>,
}

/// Outcome of a dependency query on a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryResponseStatus {
    /// Every queried dependency is already present.
    SpecificQuerySatisfied,
    /// At least one queried dependency is missing.
    SpecificQueryNotSatisfied,
    /// Answer to a general inventory query, not to a specific one.
    GeneralQueryResponse,
}

/// A controller's answer to a dependency query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResourceDeploymentQueryResponse {
    /// Transaction the query belonged to
    pub transaction_id: Uuid,
    /// Query outcome
    pub status: QueryResponseStatus,
}

/// One resource to install on a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResourceDeploymentItem {
    /// Resource name
    pub name: String,
    /// Resource version
    pub version: Version,
    /// Where the controller can fetch the resource
    pub resource_uri: String,
}

/// Request that a controller install a set of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResourceDeploymentCommitRequest {
    /// Transaction the commit belongs to
    pub transaction_id: Uuid,
    /// Resources to install
    pub items: Vec<ContainerResourceDeploymentItem>,
}

/// Outcome of a resource commit on a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitResponseStatus {
    /// Every resource was installed.
    Success,
    /// At least one resource could not be installed.
    Failure,
}

/// A controller's answer to a commit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResourceDeploymentCommitResponse {
    /// Transaction the commit belonged to
    pub transaction_id: Uuid,
    /// Commit outcome
    pub status: CommitResponseStatus,
    /// Failure detail, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of a live activity deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityDeployStatus {
    /// The activity was deployed.
    #[serde(rename = "STATUS_SUCCESS")]
    Success,
    /// The bundle could not be copied to the controller.
    #[serde(rename = "STATUS_FAILURE_COPY")]
    FailureCopy,
    /// The bundle could not be unpacked on the controller.
    #[serde(rename = "STATUS_FAILURE_UNPACK")]
    FailureUnpack,
    /// Dependencies could not be resolved or committed.
    #[serde(rename = "STATUS_FAILURE_DEPENDENCIES_NOT_SATISFIED")]
    FailureDependenciesNotSatisfied,
    /// A request could not be handed to the transport.
    #[serde(rename = "STATUS_FAILURE_TRANSPORT")]
    FailureTransport,
    /// No response arrived within the deployment timeout.
    #[serde(rename = "STATUS_FAILURE_TIMED_OUT")]
    FailureTimedOut,
}

impl ActivityDeployStatus {
    /// Whether the deployment succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ActivityDeployStatus::Success)
    }

    /// Get the status string
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityDeployStatus::Success => "STATUS_SUCCESS",
            ActivityDeployStatus::FailureCopy => "STATUS_FAILURE_COPY",
            ActivityDeployStatus::FailureUnpack => "STATUS_FAILURE_UNPACK",
            ActivityDeployStatus::FailureDependenciesNotSatisfied => {
                "STATUS_FAILURE_DEPENDENCIES_NOT_SATISFIED"
            }
            ActivityDeployStatus::FailureTransport => "STATUS_FAILURE_TRANSPORT",
            ActivityDeployStatus::FailureTimedOut => "STATUS_FAILURE_TIMED_OUT",
        }
    }
}

impl fmt::Display for ActivityDeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final word on a deployment, delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveActivityDeploymentResponse {
    /// Transaction the response belongs to
    pub transaction_id: Uuid,
    /// Live activity UUID
    pub uuid: String,
    /// Deployment outcome
    pub status: ActivityDeployStatus,
    /// Failure detail, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the outcome was determined
    pub timestamp: DateTime<Utc>,
}

impl LiveActivityDeploymentResponse {
    /// Create a response stamped now.
    pub fn new(transaction_id: Uuid, uuid: impl Into<String>, status: ActivityDeployStatus) -> Self {
        Self {
            transaction_id,
            uuid: uuid.into(),
            status,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Request that a controller remove a live activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveActivityDeleteRequest {
    /// Live activity UUID
    pub uuid: String,
    /// Identifying name of the bundle
    pub identifying_name: String,
    /// Bundle version
    pub version: Version,
    /// Delete even if the activity is running
    pub force: bool,
}

/// Outcome of a live activity delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveActivityDeleteStatus {
    /// The activity was removed.
    Success,
    /// The controller did not have the activity.
    DoesntExist,
    /// The activity could not be removed.
    Failure,
}

/// A controller's answer to a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveActivityDeleteResult {
    /// Live activity UUID
    pub uuid: String,
    /// Delete outcome
    pub status: LiveActivityDeleteStatus,
    /// When the controller answered
    pub timestamp: DateTime<Utc>,
}

/// An in-flight deployment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterActivityDeploymentRequest {
    /// Transaction ID, unique per deployment attempt
    pub transaction_id: Uuid,
    /// The live activity being deployed
    pub live_activity: ActiveLiveActivity,
    /// Where the controller can fetch the activity bundle
    pub resource_uri: String,
    /// Dependency query, when the activity has dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_deployment_query: Option<ContainerResourceDeploymentQueryRequest>,
    /// Current phase
    pub status: MasterActivityDeploymentRequestStatus,
    /// When the transaction was opened
    pub created_at: DateTime<Utc>,
    /// When the phase last changed
    pub status_updated_at: DateTime<Utc>,
}

impl MasterActivityDeploymentRequest {
    /// Open a transaction in its first phase.
    pub fn new(
        transaction_id: Uuid,
        live_activity: ActiveLiveActivity,
        resource_uri: impl Into<String>,
        status: MasterActivityDeploymentRequestStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            transaction_id,
            live_activity,
            resource_uri: resource_uri.into(),
            resource_deployment_query: None,
            status,
            created_at: now,
            status_updated_at: now,
        }
    }

    /// Live activity UUID.
    pub fn uuid(&self) -> &str {
        &self.live_activity.uuid
    }

    /// Move to a new phase.
    pub fn update_status(&mut self, status: MasterActivityDeploymentRequestStatus, at: DateTime<Utc>) {
        self.status = status;
        self.status_updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_upper_bound_is_exclusive() {
        let dependency =
            ActivityDependency::new("lib.gfx", Version::new(1, 0, 0), Version::new(2, 0, 0));
        let reference = dependency.to_reference();

        assert!(reference.version_range.contains(&Version::new(1, 9, 9)));
        assert!(!reference.version_range.contains(&Version::new(2, 0, 0)));
    }

    #[test]
    fn test_deploy_status_wire_names() {
        let json = serde_json::to_string(&ActivityDeployStatus::FailureDependenciesNotSatisfied)
            .unwrap();
        assert_eq!(json, "\"STATUS_FAILURE_DEPENDENCIES_NOT_SATISFIED\"");
        assert_eq!(
            ActivityDeployStatus::FailureDependenciesNotSatisfied.to_string(),
            "STATUS_FAILURE_DEPENDENCIES_NOT_SATISFIED"
        );
        assert!(ActivityDeployStatus::Success.is_success());
        assert!(!ActivityDeployStatus::FailureTimedOut.is_success());
    }

    #[test]
    fn test_request_status_serialization() {
        let json =
            serde_json::to_string(&MasterActivityDeploymentRequestStatus::SatisfyingDependencies)
                .unwrap();
        assert_eq!(json, "\"SATISFYING_DEPENDENCIES\"");
    }
}
