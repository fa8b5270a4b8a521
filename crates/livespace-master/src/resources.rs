// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource repository and dependency resolution on the master.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use livespace_core::{NamedVersionedResource, ResourceDependencyReference, Version};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::RemoteControllerClient;
use crate::error::{Error, Result};
use crate::types::{
    ActiveSpaceController, ContainerResourceDeploymentCommitRequest,
    ContainerResourceDeploymentItem,
};

/// Repository category of activity bundles.
pub const RESOURCE_CATEGORY_ACTIVITY: &str = "activity";

/// Repository category of container bundles (shared dependencies).
pub const RESOURCE_CATEGORY_CONTAINER_BUNDLE: &str = "bundle";

/// Tells controllers where to fetch resources from.
pub trait ResourceRepositoryServer: Send + Sync {
    /// URI of a resource in the repository.
    fn resource_uri(&self, category: &str, identifying_name: &str, version: &Version) -> String;
}

/// Repository server reachable under a base URL: `{base}/{category}/{name}/{version}`.
#[derive(Debug, Clone)]
pub struct BaseUrlResourceRepositoryServer {
    base_url: String,
}

impl BaseUrlResourceRepositoryServer {
    /// Create a server for a base URL. A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ResourceRepositoryServer for BaseUrlResourceRepositoryServer {
    fn resource_uri(&self, category: &str, identifying_name: &str, version: &Version) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url, category, identifying_name, version
        )
    }
}

/// Resolves dependencies on the master and installs them on controllers.
#[async_trait]
pub trait ContainerResourceDeploymentManager: Send + Sync {
    /// Pick a resource for every dependency. Fails if any cannot be satisfied.
    async fn satisfy_dependencies(
        &self,
        dependencies: &[ResourceDependencyReference],
    ) -> Result<Vec<NamedVersionedResource>>;

    /// Ask a controller to install resources as part of a transaction.
    async fn commit_resources(
        &self,
        transaction_id: Uuid,
        controller: &ActiveSpaceController,
        resources: &[NamedVersionedResource],
    ) -> Result<()>;
}

/// Resolves dependencies against a catalog of container bundles and commits
/// them through the remote controller client.
pub struct StandardContainerResourceDeploymentManager {
    catalog: DashMap<String, BTreeSet<Version>>,
    repository_server: Arc<dyn ResourceRepositoryServer>,
    client: Arc<dyn RemoteControllerClient>,
}

impl StandardContainerResourceDeploymentManager {
    /// Create a manager with an empty catalog.
    pub fn new(
        repository_server: Arc<dyn ResourceRepositoryServer>,
        client: Arc<dyn RemoteControllerClient>,
    ) -> Self {
        Self {
            catalog: DashMap::new(),
            repository_server,
            client,
        }
    }

    /// Make a container bundle available for dependency resolution.
    pub fn add_resource(&self, resource: NamedVersionedResource) {
        debug!(resource = %resource, "Container bundle added to catalog");
        self.catalog
            .entry(resource.name)
            .or_default()
            .insert(resource.version);
    }

    /// Highest cataloged version satisfying a dependency.
    pub fn resolve(&self, dependency: &ResourceDependencyReference) -> Option<NamedVersionedResource> {
        let versions = self.catalog.get(&dependency.name)?;
        let range = &dependency.version_range;
        versions
            .range(range.minimum().clone()..=range.maximum().clone())
            .rev()
            .find(|version| range.contains(version))
            .map(|version| NamedVersionedResource::new(dependency.name.clone(), version.clone()))
    }
}

#[async_trait]
impl ContainerResourceDeploymentManager for StandardContainerResourceDeploymentManager {
    async fn satisfy_dependencies(
        &self,
        dependencies: &[ResourceDependencyReference],
    ) -> Result<Vec<NamedVersionedResource>> {
        dependencies
            .iter()
            .map(|dependency| {
                self.resolve(dependency)
                    .ok_or_else(|| Error::DependencyNotFound {
                        name: dependency.name.clone(),
                        range: dependency.version_range.to_string(),
                    })
            })
            .collect()
    }

    async fn commit_resources(
        &self,
        transaction_id: Uuid,
        controller: &ActiveSpaceController,
        resources: &[NamedVersionedResource],
    ) -> Result<()> {
        let items = resources
            .iter()
            .map(|resource| ContainerResourceDeploymentItem {
                name: resource.name.clone(),
                version: resource.version.clone(),
                resource_uri: self.repository_server.resource_uri(
                    RESOURCE_CATEGORY_CONTAINER_BUNDLE,
                    &resource.name,
                    &resource.version,
                ),
            })
            .collect();

        let request = ContainerResourceDeploymentCommitRequest {
            transaction_id,
            items,
        };

        info!(
            transaction_id = %transaction_id,
            controller = %controller.uuid,
            count = resources.len(),
            "Committing container resources"
        );

        self.client
            .commit_resource_deployment(controller, &request)
            .await
    }
}
