// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the live activity sampler.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingStorage, MOCK_TYPE, RecordingAlerts, RecordingPublisher, mock_activity};
use livespace_controller::repository::InMemoryLiveActivityRepository;
use livespace_controller::sampler::{
    LiveActivityRunnerSampler, LiveActivityRunnerSamplerConfig, RunnerSampler,
};
use livespace_controller::wrapper::{MockActivityBehavior, MockActivityWrapperFactory};
use livespace_controller::{ActivityWrapperRegistry, LiveActivityRuntime};
use livespace_core::ActivityState;

struct SamplerContext {
    runtime: Arc<LiveActivityRuntime>,
    sampler: Arc<LiveActivityRunnerSampler>,
    publisher: Arc<RecordingPublisher>,
    alerts: Arc<RecordingAlerts>,
    behavior: Arc<MockActivityBehavior>,
}

fn context(uuids: &[&str], sample_interval: Duration) -> SamplerContext {
    let factory = MockActivityWrapperFactory::new(MOCK_TYPE);
    let behavior = factory.behavior();
    let registry = Arc::new(ActivityWrapperRegistry::new());
    registry.register_activity_wrapper_factory(Arc::new(factory));

    let repository = Arc::new(InMemoryLiveActivityRepository::from_activities(
        uuids.iter().map(|uuid| mock_activity(uuid)),
    ));
    let publisher = Arc::new(RecordingPublisher::default());
    let alerts = Arc::new(RecordingAlerts::default());
    let sampler = Arc::new(LiveActivityRunnerSampler::new(
        LiveActivityRunnerSamplerConfig { sample_interval },
    ));

    let runtime = LiveActivityRuntime::new(
        registry,
        repository,
        Arc::new(CountingStorage::new()),
        publisher.clone(),
        alerts.clone(),
        sampler.clone(),
    );

    SamplerContext {
        runtime,
        sampler,
        publisher,
        alerts,
        behavior,
    }
}

#[tokio::test]
async fn test_running_activity_is_sampled() {
    let ctx = context(&["a"], Duration::from_secs(60));

    assert!(!ctx.sampler.is_sampling("a"));
    ctx.runtime.startup_live_activity("a").await.unwrap();
    assert!(ctx.sampler.is_sampling("a"));

    ctx.runtime.shutdown_live_activity("a").await.unwrap();
    assert!(!ctx.sampler.is_sampling("a"));
    assert_eq!(ctx.sampler.sampled_count(), 0);
}

#[tokio::test]
async fn test_failed_startup_is_not_sampled() {
    let ctx = context(&["a"], Duration::from_secs(60));
    ctx.behavior.set_fail_startup(true);

    ctx.runtime.startup_live_activity("a").await.unwrap();

    assert!(!ctx.sampler.is_sampling("a"));
}

#[tokio::test]
async fn test_sample_all_detects_crash() {
    let ctx = context(&["a", "b"], Duration::from_secs(60));
    ctx.runtime.startup_live_activity("a").await.unwrap();
    ctx.runtime.startup_live_activity("b").await.unwrap();
    ctx.behavior.crash();

    assert_eq!(ctx.sampler.sample_all().await, 2);

    // Exactly one of the two instances consumed the crash.
    let crashed: Vec<&str> = ["a", "b"]
        .into_iter()
        .filter(|uuid| ctx.publisher.last(uuid).unwrap().state() == ActivityState::Crashed)
        .collect();
    assert_eq!(crashed.len(), 1);
    let crashed = crashed[0];

    assert_eq!(ctx.alerts.states(crashed), vec![ActivityState::Crashed]);
    assert!(!ctx.sampler.is_sampling(crashed));
    assert_eq!(ctx.sampler.sampled_count(), 1);

    // A quiet round changes nothing.
    ctx.publisher.clear();
    assert_eq!(ctx.sampler.sample_all().await, 1);
    assert!(ctx.publisher.states("a").is_empty());
    assert!(ctx.publisher.states("b").is_empty());
}

#[tokio::test]
async fn test_restarted_activity_stays_sampled() {
    let ctx = context(&["a"], Duration::from_secs(60));
    ctx.runtime.startup_live_activity("a").await.unwrap();
    ctx.behavior.crash();
    ctx.sampler.sample_all().await;
    assert!(!ctx.sampler.is_sampling("a"));

    ctx.runtime.startup_live_activity("a").await.unwrap();
    assert!(ctx.sampler.is_sampling("a"));
    assert_eq!(ctx.sampler.sample_all().await, 1);
    assert!(ctx.sampler.is_sampling("a"));

    // The restarted instance is still watched for the next crash.
    ctx.behavior.crash();
    assert_eq!(ctx.sampler.sample_all().await, 1);
    assert_eq!(
        ctx.alerts.states("a"),
        vec![ActivityState::Crashed, ActivityState::Crashed]
    );
    assert!(!ctx.sampler.is_sampling("a"));
}

#[tokio::test]
async fn test_sample_does_not_unregister_runner() {
    let ctx = context(&["a"], Duration::from_secs(60));
    let runner = ctx.runtime.live_activity_runner("a", true).await.unwrap();
    assert!(!runner.cached_activity_status().state().is_running());

    // Registration stays with whoever registered the runner, whatever a
    // sample reports.
    ctx.sampler.start_sampling_runner(runner);
    assert_eq!(ctx.sampler.sample_all().await, 1);
    assert!(ctx.sampler.is_sampling("a"));

    ctx.sampler.stop_sampling_runner("a");
    assert!(!ctx.sampler.is_sampling("a"));
}

#[tokio::test]
async fn test_sample_all_with_nothing_to_sample() {
    let ctx = context(&[], Duration::from_secs(60));
    assert_eq!(ctx.sampler.sample_all().await, 0);
}

#[tokio::test]
async fn test_run_loop_samples_until_shutdown() {
    let ctx = context(&["a"], Duration::from_millis(10));
    let shutdown = ctx.sampler.shutdown_handle();

    let sampler = ctx.sampler.clone();
    let handle = tokio::spawn(async move {
        sampler.run().await;
    });

    ctx.runtime.startup_live_activity("a").await.unwrap();
    ctx.behavior.crash();

    let mut crashed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if ctx.publisher.last("a").unwrap().state() == ActivityState::Crashed {
            crashed = true;
            break;
        }
    }
    assert!(crashed, "sampler should have detected the crash");
    assert_eq!(ctx.alerts.states("a"), vec![ActivityState::Crashed]);

    shutdown.notify_one();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sampler should stop")
        .unwrap();
}
