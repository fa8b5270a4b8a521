// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-activity storage.
//!
//! Each live activity owns a directory tree under the controller data dir:
//!
//! ```text
//! {data_dir}/live/{uuid}/
//!   install/   unpacked activity bundle
//!   log/       activity logs (stdout.log, stderr.log for native activities)
//!   data/      permanent data, survives restarts
//!   tmp/       temporary data
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;

/// Directories of a single live activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFilesystem {
    install_dir: PathBuf,
    log_dir: PathBuf,
    permanent_data_dir: PathBuf,
    tmp_data_dir: PathBuf,
}

impl ActivityFilesystem {
    /// Lay out the standard directories under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            install_dir: root.join("install"),
            log_dir: root.join("log"),
            permanent_data_dir: root.join("data"),
            tmp_data_dir: root.join("tmp"),
        }
    }

    /// Use a different install directory.
    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = install_dir.into();
        self
    }

    /// Directory holding the unpacked bundle.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Directory for activity logs.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Directory for permanent data.
    pub fn permanent_data_dir(&self) -> &Path {
        &self.permanent_data_dir
    }

    /// Directory for temporary data.
    pub fn tmp_data_dir(&self) -> &Path {
        &self.tmp_data_dir
    }

    /// Create every directory that does not exist yet.
    pub async fn ensure_directories(&self) -> io::Result<()> {
        for dir in [
            &self.install_dir,
            &self.log_dir,
            &self.permanent_data_dir,
            &self.tmp_data_dir,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

/// Access to live activity storage.
#[async_trait]
pub trait LiveActivityStorageManager: Send + Sync {
    /// Empty the temporary data directory of an activity.
    async fn clean_tmp_activity_data_directory(&self, uuid: &str) -> Result<()>;

    /// Empty the permanent data directory of an activity.
    async fn clean_permanent_activity_data_directory(&self, uuid: &str) -> Result<()>;

    /// Directories of an activity.
    fn activity_filesystem(&self, uuid: &str) -> Result<ActivityFilesystem>;
}

/// Storage manager rooted at `{data_dir}/live`.
#[derive(Debug, Clone)]
pub struct FilesystemStorageManager {
    live_dir: PathBuf,
}

impl FilesystemStorageManager {
    /// Create a storage manager for the controller data directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            live_dir: data_dir.as_ref().join("live"),
        }
    }

    fn activity_root(&self, uuid: &str) -> io::Result<PathBuf> {
        let legal = !uuid.is_empty()
            && uuid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !legal {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Illegal live activity UUID for storage: {:?}", uuid),
            ));
        }
        Ok(self.live_dir.join(uuid))
    }
}

/// Remove a directory and recreate it empty.
async fn recreate_dir(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Directory did not exist, creating");
        }
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(dir).await
}

#[async_trait]
impl LiveActivityStorageManager for FilesystemStorageManager {
    async fn clean_tmp_activity_data_directory(&self, uuid: &str) -> Result<()> {
        let filesystem = self.activity_filesystem(uuid)?;
        recreate_dir(filesystem.tmp_data_dir()).await?;
        info!(uuid = %uuid, "Cleaned activity tmp data directory");
        Ok(())
    }

    async fn clean_permanent_activity_data_directory(&self, uuid: &str) -> Result<()> {
        let filesystem = self.activity_filesystem(uuid)?;
        recreate_dir(filesystem.permanent_data_dir()).await?;
        info!(uuid = %uuid, "Cleaned activity permanent data directory");
        Ok(())
    }

    fn activity_filesystem(&self, uuid: &str) -> Result<ActivityFilesystem> {
        Ok(ActivityFilesystem::new(self.activity_root(uuid)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_layout() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FilesystemStorageManager::new(temp_dir.path());

        let fs = storage.activity_filesystem("abc-123").unwrap();
        let root = temp_dir.path().join("live").join("abc-123");
        assert_eq!(fs.install_dir(), root.join("install"));
        assert_eq!(fs.log_dir(), root.join("log"));
        assert_eq!(fs.permanent_data_dir(), root.join("data"));
        assert_eq!(fs.tmp_data_dir(), root.join("tmp"));
    }

    #[tokio::test]
    async fn test_clean_tmp_keeps_permanent_data() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FilesystemStorageManager::new(temp_dir.path());
        let fs = storage.activity_filesystem("u1").unwrap();
        fs.ensure_directories().await.unwrap();

        tokio::fs::write(fs.tmp_data_dir().join("scratch"), "x")
            .await
            .unwrap();
        tokio::fs::write(fs.permanent_data_dir().join("state"), "y")
            .await
            .unwrap();

        storage.clean_tmp_activity_data_directory("u1").await.unwrap();

        assert!(fs.tmp_data_dir().exists());
        assert!(!fs.tmp_data_dir().join("scratch").exists());
        assert!(fs.permanent_data_dir().join("state").exists());
    }

    #[tokio::test]
    async fn test_clean_permanent_on_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FilesystemStorageManager::new(temp_dir.path());

        storage
            .clean_permanent_activity_data_directory("never-started")
            .await
            .unwrap();

        let fs = storage.activity_filesystem("never-started").unwrap();
        assert!(fs.permanent_data_dir().exists());
    }

    #[test]
    fn test_rejects_path_like_uuid() {
        let storage = FilesystemStorageManager::new("/tmp/livespace");
        assert!(storage.activity_filesystem("../etc").is_err());
        assert!(storage.activity_filesystem("").is_err());
    }
}
