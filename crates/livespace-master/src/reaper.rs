// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that finalizes stalled deployment transactions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::deployment::RemoteActivityDeploymentManager;

/// Periodically finalizes transactions that made no progress within the
/// deployment timeout.
pub struct DeploymentReaper {
    manager: Arc<RemoteActivityDeploymentManager>,
    timeout: Duration,
    sweep_interval: Duration,
    shutdown: Arc<Notify>,
}

impl DeploymentReaper {
    /// Create a reaper with an explicit timeout and sweep interval.
    pub fn new(
        manager: Arc<RemoteActivityDeploymentManager>,
        timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            manager,
            timeout,
            sweep_interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Create a reaper from the manager's configuration.
    ///
    /// Returns `None` when no deployment timeout is configured.
    pub fn for_manager(manager: Arc<RemoteActivityDeploymentManager>) -> Option<Self> {
        let config = manager.config();
        let timeout = config.deployment_timeout?;
        let sweep_interval = config.sweep_interval;
        Some(Self::new(manager, timeout, sweep_interval))
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the sweep loop until the shutdown signal is received.
    pub async fn run(&self) {
        info!(
            timeout_secs = self.timeout.as_secs(),
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Deployment reaper started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Deployment reaper received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.sweep_interval) => {
                    self.sweep();
                }
            }
        }

        info!("Deployment reaper stopped");
    }

    /// Finalize stalled transactions once. Returns how many were finalized.
    pub fn sweep(&self) -> usize {
        let evicted = self.manager.evict_stale_transactions(self.timeout);
        if evicted > 0 {
            warn!(
                count = evicted,
                remaining = self.manager.in_flight_count(),
                "Finalized stalled deployment transactions"
            );
        }
        evicted
    }
}
