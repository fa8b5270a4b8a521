// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status publication and alerting seams.
//!
//! The runtime pushes every status it wants the outside world to see through
//! a [`LiveActivityStatusPublisher`], and every failure through an
//! [`AlertStatusManager`]. Both are fire-and-forget.

use chrono::{DateTime, Utc};
use livespace_core::ActivityStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::runner::LiveActivityRunner;

/// Receives live activity statuses for delivery to the master.
pub trait LiveActivityStatusPublisher: Send + Sync {
    /// Publish the status of a live activity.
    fn publish_activity_status(&self, uuid: &str, status: &ActivityStatus);
}

/// Receives live activities that need someone's attention.
pub trait AlertStatusManager: Send + Sync {
    /// Announce the current status of a runner.
    fn announce_live_activity_status(&self, runner: &LiveActivityRunner);
}

/// Publisher that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusPublisher;

impl LiveActivityStatusPublisher for TracingStatusPublisher {
    fn publish_activity_status(&self, uuid: &str, status: &ActivityStatus) {
        info!(
            uuid = %uuid,
            state = %status.state(),
            detail = status.detail(),
            "Live activity status"
        );
    }
}

/// A published status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Live activity UUID
    pub uuid: String,
    /// Published status
    pub status: ActivityStatus,
    /// When the status was published
    pub timestamp: DateTime<Utc>,
}

/// Publisher that forwards statuses over a channel, for bridging to a transport.
#[derive(Debug, Clone)]
pub struct ChannelStatusPublisher {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelStatusPublisher {
    /// Create a publisher and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LiveActivityStatusPublisher for ChannelStatusPublisher {
    fn publish_activity_status(&self, uuid: &str, status: &ActivityStatus) {
        let update = StatusUpdate {
            uuid: uuid.to_string(),
            status: status.clone(),
            timestamp: Utc::now(),
        };
        if self.tx.send(update).is_err() {
            debug!(uuid = %uuid, "Status receiver dropped, status not delivered");
        }
    }
}

/// Alert manager that logs every announcement as an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertStatusManager;

impl AlertStatusManager for TracingAlertStatusManager {
    fn announce_live_activity_status(&self, runner: &LiveActivityRunner) {
        let status = runner.cached_activity_status();
        error!(
            uuid = %runner.uuid(),
            name = %runner.installed_activity().identifying_name,
            state = %status.state(),
            detail = status.detail(),
            "Live activity needs attention"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livespace_core::ActivityState;

    #[tokio::test]
    async fn test_channel_publisher_forwards() {
        let (publisher, mut rx) = ChannelStatusPublisher::channel();
        publisher.publish_activity_status("u1", &ActivityStatus::new(ActivityState::Running));

        let update = rx.recv().await.unwrap();
        assert_eq!(update.uuid, "u1");
        assert_eq!(update.status.state(), ActivityState::Running);
    }

    #[test]
    fn test_channel_publisher_survives_dropped_receiver() {
        let (publisher, rx) = ChannelStatusPublisher::channel();
        drop(rx);
        publisher.publish_activity_status("u1", &ActivityStatus::ready());
    }
}
