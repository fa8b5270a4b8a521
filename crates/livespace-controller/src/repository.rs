// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Installed live activity records.
//!
//! The repository is the source of truth for which live activities exist on
//! this controller. Runners are only ever created for UUIDs found here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use livespace_core::Version;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Key/value configuration handed to activity instances.
pub type ActivityConfiguration = HashMap<String, String>;

/// Identity record of a live activity installed on this controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledLiveActivity {
    /// Globally unique live activity UUID
    pub uuid: String,
    /// Identifying name of the activity bundle
    pub identifying_name: String,
    /// Version of the activity bundle
    pub version: Version,
    /// Activity type, optionally qualified with a version (`type;[1.0,2.0)`)
    pub activity_type: String,
    /// Where the bundle was unpacked. Defaults to the storage install directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
    /// When the activity was installed
    #[serde(default = "Utc::now")]
    pub installed_at: DateTime<Utc>,
    /// Base configuration of the activity
    #[serde(default)]
    pub configuration: ActivityConfiguration,
}

impl InstalledLiveActivity {
    /// Create a record with empty configuration, installed now.
    pub fn new(
        uuid: impl Into<String>,
        identifying_name: impl Into<String>,
        version: Version,
        activity_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            identifying_name: identifying_name.into(),
            version,
            activity_type: activity_type.into(),
            install_path: None,
            installed_at: Utc::now(),
            configuration: ActivityConfiguration::new(),
        }
    }

    /// Set a configuration value.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }
}

/// Storage of installed live activity records.
#[async_trait]
pub trait LiveActivityRepository: Send + Sync {
    /// Get an installed live activity by UUID.
    async fn installed_live_activity(&self, uuid: &str) -> Result<Option<InstalledLiveActivity>>;

    /// Get every installed live activity.
    async fn all_installed_live_activities(&self) -> Result<Vec<InstalledLiveActivity>>;

    /// Insert or replace a record.
    async fn save_installed_live_activity(&self, activity: InstalledLiveActivity) -> Result<()>;

    /// Remove a record. Returns whether it existed.
    async fn delete_installed_live_activity(&self, uuid: &str) -> Result<bool>;
}

/// In-memory repository.
#[derive(Debug, Default)]
pub struct InMemoryLiveActivityRepository {
    activities: DashMap<String, InstalledLiveActivity>,
}

impl InMemoryLiveActivityRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding the given records.
    pub fn from_activities(activities: impl IntoIterator<Item = InstalledLiveActivity>) -> Self {
        let repository = Self::new();
        for activity in activities {
            repository.activities.insert(activity.uuid.clone(), activity);
        }
        repository
    }

    /// Load records from a JSON manifest holding an array of installed activities.
    pub async fn load_manifest(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let activities: Vec<InstalledLiveActivity> = serde_json::from_slice(&bytes)?;

        info!(
            path = %path.display(),
            count = activities.len(),
            "Loaded live activity manifest"
        );

        Ok(Self::from_activities(activities))
    }

    /// Number of installed activities.
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Whether no activities are installed.
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[async_trait]
impl LiveActivityRepository for InMemoryLiveActivityRepository {
    async fn installed_live_activity(&self, uuid: &str) -> Result<Option<InstalledLiveActivity>> {
        Ok(self.activities.get(uuid).map(|entry| entry.value().clone()))
    }

    async fn all_installed_live_activities(&self) -> Result<Vec<InstalledLiveActivity>> {
        Ok(self
            .activities
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn save_installed_live_activity(&self, activity: InstalledLiveActivity) -> Result<()> {
        self.activities.insert(activity.uuid.clone(), activity);
        Ok(())
    }

    async fn delete_installed_live_activity(&self, uuid: &str) -> Result<bool> {
        Ok(self.activities.remove(uuid).is_some())
    }
}
