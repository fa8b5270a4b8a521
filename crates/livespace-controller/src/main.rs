// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Livespace Controller - Live Activity Supervision Daemon
//!
//! Supervises the live activities installed on this node:
//! - Lifecycle commands (startup, activate, deactivate, shutdown)
//! - Crash detection through periodic sampling
//! - Status publication and alerting

use std::sync::Arc;
use tracing::{info, warn};

use livespace_controller::config::Config;
use livespace_controller::repository::InMemoryLiveActivityRepository;
use livespace_controller::runtime::ControllerRuntime;
use livespace_controller::wrapper::{MockActivityWrapperFactory, NativeActivityWrapperFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livespace_controller=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        data_dir = %config.data_dir.display(),
        sample_interval_ms = config.sample_interval.as_millis() as u64,
        autostart = config.autostart,
        "Starting Livespace Controller"
    );

    let repository = match &config.activity_manifest {
        Some(path) => InMemoryLiveActivityRepository::load_manifest(path).await?,
        None => {
            info!("No activity manifest configured, starting with no installed activities");
            InMemoryLiveActivityRepository::new()
        }
    };

    let runtime = ControllerRuntime::builder()
        .repository(Arc::new(repository))
        .wrapper_factory(Arc::new(NativeActivityWrapperFactory::new()))
        .wrapper_factory(Arc::new(MockActivityWrapperFactory::new("mock")))
        .data_dir(&config.data_dir)
        .sample_interval(config.sample_interval)
        .autostart(config.autostart)
        .build()?
        .start()
        .await?;

    info!("Livespace Controller ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Livespace Controller shut down");

    Ok(())
}
