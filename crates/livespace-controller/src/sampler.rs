// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that samples running live activities.
//!
//! Runners are registered and unregistered only through [`RunnerSampler`],
//! which the runtime listener calls when a runner enters or leaves a running
//! state. Each round samples every runner concurrently; a sample that changes
//! a runner's status is reported through the runner's listener like any other
//! status change, so a crash found here unregisters the runner from there.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::runner::LiveActivityRunner;

/// Registration of runners for periodic sampling.
pub trait RunnerSampler: Send + Sync {
    /// Start sampling a runner. Sampling the same UUID again replaces the runner.
    fn start_sampling_runner(&self, runner: Arc<LiveActivityRunner>);

    /// Stop sampling a runner.
    fn stop_sampling_runner(&self, uuid: &str);
}

/// Configuration for the sampler.
#[derive(Debug, Clone)]
pub struct LiveActivityRunnerSamplerConfig {
    /// How often to sample running activities.
    pub sample_interval: Duration,
}

impl Default for LiveActivityRunnerSamplerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
        }
    }
}

/// Background worker that periodically samples running live activities.
pub struct LiveActivityRunnerSampler {
    runners: DashMap<String, Arc<LiveActivityRunner>>,
    config: LiveActivityRunnerSamplerConfig,
    shutdown: Arc<Notify>,
}

impl LiveActivityRunnerSampler {
    /// Create a new sampler.
    pub fn new(config: LiveActivityRunnerSamplerConfig) -> Self {
        Self {
            runners: DashMap::new(),
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Number of runners being sampled.
    pub fn sampled_count(&self) -> usize {
        self.runners.len()
    }

    /// Whether a runner is being sampled.
    pub fn is_sampling(&self, uuid: &str) -> bool {
        self.runners.contains_key(uuid)
    }

    /// Run the sampling loop until the shutdown signal is received.
    pub async fn run(&self) {
        info!(
            sample_interval_ms = self.config.sample_interval.as_millis() as u64,
            "Live activity sampler started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Live activity sampler received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.sample_interval) => {
                    self.sample_all().await;
                }
            }
        }

        info!("Live activity sampler stopped");
    }

    /// Sample every registered runner once.
    ///
    /// Returns the number of runners sampled. Membership is left to the
    /// runners' listener, which may already have restarted a runner by the
    /// time its sample is collected here.
    pub async fn sample_all(&self) -> usize {
        let runners: Vec<Arc<LiveActivityRunner>> = self
            .runners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        if runners.is_empty() {
            return 0;
        }

        let count = runners.len();
        let mut samples = JoinSet::new();
        for runner in runners {
            samples.spawn(async move {
                let status = runner.sample_activity_status().await;
                (runner, status)
            });
        }

        while let Some(result) = samples.join_next().await {
            match result {
                Ok((runner, status)) => {
                    debug!(
                        uuid = %runner.uuid(),
                        state = %status.state(),
                        "Sampled live activity"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Live activity sample task panicked");
                }
            }
        }

        count
    }
}

impl RunnerSampler for LiveActivityRunnerSampler {
    fn start_sampling_runner(&self, runner: Arc<LiveActivityRunner>) {
        debug!(uuid = %runner.uuid(), "Sampling live activity");
        self.runners.insert(runner.uuid().to_string(), runner);
    }

    fn stop_sampling_runner(&self, uuid: &str) {
        if self.runners.remove(uuid).is_some() {
            debug!(uuid = %uuid, "Stopped sampling live activity");
        }
    }
}
