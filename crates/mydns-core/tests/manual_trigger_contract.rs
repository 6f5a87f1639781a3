//! Contract Test: Manual Trigger
//!
//! Constraints verified:
//! - One manual trigger → exactly one client call → exactly one history entry
//! - A trigger issued while an attempt is in flight returns `Busy` and leaves history alone
//! - Credentials are read at the start of each attempt, not captured once
//! - Status reflects the busy gate while an attempt is in flight

mod common;

use common::*;
use mydns_core::{Credentials, Error, SchedulerState, UpdateStatus};

#[tokio::test]
async fn manual_trigger_records_exactly_one_result() {
    let updater = MockUpdater::new(UpdateStatus::Success);
    let probe = updater.probe();
    let (scheduler, _event_rx) = scheduler_with(updater);

    let result = scheduler.trigger_once().await.expect("gate is free");

    assert_eq!(result.status, UpdateStatus::Success);
    assert_eq!(probe.calls(), 1);
    assert_eq!(scheduler.history().len(), 1);
    assert_eq!(scheduler.history().latest(), Some(result));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test]
async fn failed_attempt_is_recorded_not_raised() {
    let (scheduler, _event_rx) = scheduler_with(MockUpdater::new(UpdateStatus::Failure));

    let result = scheduler.trigger_once().await.expect("failure is a result, not an error");

    assert_eq!(result.status, UpdateStatus::Failure);
    assert_eq!(scheduler.history().snapshot(), vec![result]);
}

#[tokio::test]
async fn trigger_while_busy_is_rejected() {
    let (updater, mut control) = MockUpdater::new(UpdateStatus::Success).blocking();
    let probe = updater.probe();
    let (scheduler, _event_rx) = scheduler_with(updater);

    let first = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.trigger_once().await })
    };
    control.entered().await;

    assert_eq!(scheduler.state(), SchedulerState::Running);
    assert!(!scheduler.status().can_trigger());

    let second = scheduler.trigger_once().await;
    assert!(matches!(second, Err(Error::Busy)), "got {:?}", second);
    assert!(scheduler.history().is_empty(), "rejected trigger must not touch history");
    assert_eq!(probe.calls(), 1);

    control.release_one();
    let first = first.await.unwrap().expect("first trigger completes");
    assert_eq!(first.status, UpdateStatus::Success);
    assert_eq!(scheduler.history().len(), 1);
    assert!(scheduler.status().can_trigger());
}

#[tokio::test]
async fn credentials_are_read_per_attempt() {
    let updater = MockUpdater::new(UpdateStatus::Success);
    let probe = updater.probe();
    let (scheduler, _event_rx) = scheduler_with(updater);

    scheduler.trigger_once().await.unwrap();
    scheduler.set_credentials(Credentials::new("m2", "p2"));
    scheduler.trigger_once().await.unwrap();

    assert_eq!(probe.master_ids(), vec!["m1", "m2"]);
    assert_eq!(scheduler.credentials(), Credentials::new("m2", "p2"));
}

#[tokio::test]
async fn status_subscribers_see_busy_then_idle() {
    let (updater, mut control) = MockUpdater::new(UpdateStatus::Success).blocking();
    let (scheduler, _event_rx) = scheduler_with(updater);
    let mut status_rx = scheduler.subscribe_status();

    let task = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.trigger_once().await })
    };
    control.entered().await;

    status_rx
        .wait_for(|s| s.busy)
        .await
        .expect("scheduler alive");

    control.release_one();
    task.await.unwrap().unwrap();

    let status = *status_rx
        .wait_for(|s| !s.busy)
        .await
        .expect("scheduler alive");
    assert_eq!(status.state(), SchedulerState::Idle);
}

#[tokio::test]
async fn manual_attempt_emits_events() {
    use mydns_core::{SchedulerEvent, Trigger};

    let (scheduler, mut event_rx) = scheduler_with(MockUpdater::new(UpdateStatus::Failure));
    scheduler.trigger_once().await.unwrap();

    assert_eq!(
        drain_events(&mut event_rx),
        vec![
            SchedulerEvent::AttemptStarted {
                trigger: Trigger::Manual
            },
            SchedulerEvent::AttemptFinished {
                trigger: Trigger::Manual,
                status: UpdateStatus::Failure,
            },
        ]
    );
}
