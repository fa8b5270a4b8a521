// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Native wrapper: runs an activity as a child process.
//!
//! Configuration keys read from the live activity configuration:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `executable` | Program to run, relative paths resolve against the install dir (required) |
//! | `args` | Arguments, either a JSON array of strings or whitespace separated |
//! | `env.<NAME>` | Extra environment variable `NAME` |
//! | `shutdown_timeout_ms` | Grace period between SIGTERM and SIGKILL (default 5000) |
//!
//! The process runs in the install directory with stdout and stderr
//! redirected to `stdout.log` and `stderr.log` in the activity log directory.
//! Activation has no process-level meaning and only changes the state the
//! controller reports.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use livespace_core::{ActivityState, ActivityStatus, Version};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::traits::*;
use crate::repository::{ActivityConfiguration, InstalledLiveActivity};
use crate::storage::ActivityFilesystem;

/// Activity type handled by the native wrapper.
pub const NATIVE_ACTIVITY_TYPE: &str = "native";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Factory for native activity wrappers.
#[derive(Debug, Default)]
pub struct NativeActivityWrapperFactory {
    version: Option<Version>,
}

impl NativeActivityWrapperFactory {
    /// Create an unversioned factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory registered at a version.
    pub fn versioned(version: Version) -> Self {
        Self {
            version: Some(version),
        }
    }
}

impl ActivityWrapperFactory for NativeActivityWrapperFactory {
    fn activity_type(&self) -> &str {
        NATIVE_ACTIVITY_TYPE
    }

    fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    fn new_activity_wrapper(
        &self,
        activity: &InstalledLiveActivity,
        filesystem: &ActivityFilesystem,
    ) -> Result<Box<dyn ActivityWrapper>> {
        Ok(Box::new(NativeActivityWrapper {
            uuid: activity.uuid.clone(),
            filesystem: filesystem.clone(),
        }))
    }
}

struct NativeActivityWrapper {
    uuid: String,
    filesystem: ActivityFilesystem,
}

impl ActivityWrapper for NativeActivityWrapper {
    fn new_instance(
        &self,
        configuration: &ActivityConfiguration,
    ) -> Result<Box<dyn ActivityInstance>> {
        let executable = configuration
            .get("executable")
            .filter(|v| !v.trim().is_empty())
            .ok_or(WrapperError::MissingConfiguration("executable"))?;

        let mut executable = PathBuf::from(executable.trim());
        if executable.is_relative() {
            executable = self.filesystem.install_dir().join(executable);
        }

        let args = configuration
            .get("args")
            .map(|v| parse_args(v))
            .unwrap_or_default();

        let env = configuration
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("env.").map(|k| (k.to_string(), v.clone())))
            .collect();

        let shutdown_timeout = configuration
            .get("shutdown_timeout_ms")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        Ok(Box::new(NativeActivityInstance {
            uuid: self.uuid.clone(),
            filesystem: self.filesystem.clone(),
            executable,
            args,
            env,
            shutdown_timeout,
            child: None,
        }))
    }
}

fn parse_args(value: &str) -> Vec<String> {
    if value.trim_start().starts_with('[')
        && let Ok(args) = serde_json::from_str::<Vec<String>>(value)
    {
        return args;
    }
    value.split_whitespace().map(str::to_string).collect()
}

struct NativeActivityInstance {
    uuid: String,
    filesystem: ActivityFilesystem,
    executable: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    shutdown_timeout: Duration,
    child: Option<Child>,
}

impl NativeActivityInstance {
    async fn stop_child(&mut self, mut child: Child) -> Result<()> {
        if let Some(pid) = child.id() {
            match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => debug!(uuid = %self.uuid, pid = pid, "Sent SIGTERM to activity process"),
                Err(nix::errno::Errno::ESRCH) => {
                    debug!(uuid = %self.uuid, pid = pid, "Activity process already gone");
                }
                Err(e) => {
                    warn!(uuid = %self.uuid, pid = pid, error = %e, "Failed to send SIGTERM");
                }
            }
        }

        match tokio::time::timeout(self.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!(uuid = %self.uuid, status = %status, "Activity process exited");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(
                    uuid = %self.uuid,
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Activity process ignored SIGTERM, killing"
                );
                child.kill().await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ActivityInstance for NativeActivityInstance {
    async fn startup(&mut self) -> Result<()> {
        if !self.executable.exists() {
            return Err(WrapperError::ExecutableNotFound(
                self.executable.display().to_string(),
            ));
        }

        self.filesystem.ensure_directories().await?;
        let stdout_file = tokio::fs::File::create(self.filesystem.log_dir().join("stdout.log"))
            .await?
            .into_std()
            .await;
        let stderr_file = tokio::fs::File::create(self.filesystem.log_dir().join("stderr.log"))
            .await?
            .into_std()
            .await;

        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args)
            .current_dir(self.filesystem.install_dir())
            .env("LIVESPACE_ACTIVITY_UUID", &self.uuid)
            .env("LIVESPACE_ACTIVITY_DATA_DIR", self.filesystem.permanent_data_dir())
            .env("LIVESPACE_ACTIVITY_TMP_DIR", self.filesystem.tmp_data_dir())
            .env("LIVESPACE_ACTIVITY_LOG_DIR", self.filesystem.log_dir())
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WrapperError::ExecutableNotFound(self.executable.display().to_string())
            } else {
                WrapperError::Io(e)
            }
        })?;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(WrapperError::StartFailed(format!(
                "process exited immediately with {}",
                status
            )));
        }

        info!(
            uuid = %self.uuid,
            pid = child.id(),
            executable = %self.executable.display(),
            "Launched native activity"
        );
        self.child = Some(child);
        Ok(())
    }

    async fn activate(&mut self) -> Result<()> {
        debug!(uuid = %self.uuid, "Native activity activated");
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<()> {
        debug!(uuid = %self.uuid, "Native activity deactivated");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        match self.child.take() {
            Some(child) => self.stop_child(child).await,
            None => Ok(()),
        }
    }

    async fn check_activity_state(&mut self) -> Option<ActivityStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                Some(ActivityStatus::with_detail(
                    ActivityState::Crashed,
                    format!("process exited with {}", status),
                ))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(uuid = %self.uuid, error = %e, "Failed to check activity process");
                None
            }
        }
    }

    async fn handle_startup_failure(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.kill().await
        {
            warn!(uuid = %self.uuid, error = %e, "Failed to kill activity after startup failure");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn instance(temp_dir: &TempDir, config: &[(&str, &str)]) -> Result<Box<dyn ActivityInstance>> {
        let activity = InstalledLiveActivity::new("n1", "com.example.native", Version::new(1, 0, 0), "native");
        let filesystem = ActivityFilesystem::new(temp_dir.path().join("n1"));
        let wrapper = NativeActivityWrapperFactory::new().new_activity_wrapper(&activity, &filesystem)?;
        let configuration = config
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        wrapper.new_instance(&configuration)
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args("-c  'x'"), vec!["-c", "'x'"]);
        assert_eq!(parse_args(r#"["-c", "exit 3"]"#), vec!["-c", "exit 3"]);
        assert!(parse_args("").is_empty());
    }

    #[test]
    fn test_missing_executable_configuration() {
        let temp_dir = TempDir::new().unwrap();
        let result = instance(&temp_dir, &[]);
        assert!(matches!(
            result,
            Err(WrapperError::MissingConfiguration("executable"))
        ));
    }

    #[tokio::test]
    async fn test_startup_with_missing_binary() {
        let temp_dir = TempDir::new().unwrap();
        let mut instance = instance(&temp_dir, &[("executable", "/nonexistent/activity")]).unwrap();
        let result = instance.startup().await;
        assert!(matches!(result, Err(WrapperError::ExecutableNotFound(_))));
    }

    #[tokio::test]
    async fn test_startup_and_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let mut instance = instance(
            &temp_dir,
            &[
                ("executable", "/bin/sh"),
                ("args", r#"["-c", "sleep 30"]"#),
                ("shutdown_timeout_ms", "2000"),
            ],
        )
        .unwrap();

        instance.startup().await.unwrap();
        assert!(instance.check_activity_state().await.is_none());
        instance.shutdown().await.unwrap();
        assert!(instance.check_activity_state().await.is_none());
    }

    #[tokio::test]
    async fn test_exited_process_reports_crash() {
        let temp_dir = TempDir::new().unwrap();
        let mut instance = instance(
            &temp_dir,
            &[("executable", "/bin/sh"), ("args", r#"["-c", "sleep 0.1; exit 3"]"#)],
        )
        .unwrap();

        instance.startup().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let status = instance.check_activity_state().await.unwrap();
        assert_eq!(status.state(), ActivityState::Crashed);
        assert!(status.detail().unwrap().contains("exit"));
    }

    #[tokio::test]
    async fn test_process_output_goes_to_log_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut instance = instance(
            &temp_dir,
            &[
                ("executable", "/bin/sh"),
                ("args", r#"["-c", "echo hello; echo oops >&2; sleep 30"]"#),
                ("shutdown_timeout_ms", "2000"),
            ],
        )
        .unwrap();

        instance.startup().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        instance.shutdown().await.unwrap();

        let log_dir = ActivityFilesystem::new(temp_dir.path().join("n1"))
            .log_dir()
            .to_path_buf();
        let stdout = tokio::fs::read_to_string(log_dir.join("stdout.log")).await.unwrap();
        let stderr = tokio::fs::read_to_string(log_dir.join("stderr.log")).await.unwrap();
        assert_eq!(stdout, "hello\n");
        assert_eq!(stderr, "oops\n");
    }
}
