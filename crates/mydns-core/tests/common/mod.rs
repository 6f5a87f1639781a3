//! Test doubles and common utilities for scheduler contract tests
//!
//! The doubles record what the scheduler asks of them without touching the
//! network.

#![allow(dead_code)]

use mydns_core::{
    Credentials, DnsUpdater, HistoryLog, SchedulerConfig, SchedulerEvent, UpdateResult,
    UpdateScheduler, UpdateStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;

/// Shared record of calls made to a MockUpdater
#[derive(Default)]
pub struct Probe {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    call_times: std::sync::Mutex<Vec<Instant>>,
    credentials_seen: std::sync::Mutex<Vec<Credentials>>,
}

impl Probe {
    /// Number of update() calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent update() calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Start time of each call
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    /// Call start offsets from `start`, in whole seconds
    pub fn offsets_secs(&self, start: Instant) -> Vec<u64> {
        self.call_times()
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect()
    }

    /// Master IDs passed to each call
    pub fn master_ids(&self) -> Vec<String> {
        self.credentials_seen
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.master_id.clone())
            .collect()
    }
}

/// Handle for releasing a blocking MockUpdater
pub struct BlockControl {
    release: Arc<Semaphore>,
    entered_rx: mpsc::UnboundedReceiver<()>,
}

impl BlockControl {
    /// Wait until an update() call is parked
    pub async fn entered(&mut self) {
        tokio::time::timeout(Duration::from_secs(5), self.entered_rx.recv())
            .await
            .expect("update() should be entered within 5 seconds")
            .expect("updater dropped");
    }

    /// Let one parked call complete
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }
}

/// A DnsUpdater that records calls and returns a fixed status
pub struct MockUpdater {
    probe: Arc<Probe>,
    status: UpdateStatus,
    delay: Option<Duration>,
    block: Option<(Arc<Semaphore>, mpsc::UnboundedSender<()>)>,
}

impl MockUpdater {
    pub fn new(status: UpdateStatus) -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            status,
            delay: None,
            block: None,
        }
    }

    /// Each call sleeps for `delay` before returning
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Each call parks until released through the returned control
    pub fn blocking(mut self) -> (Self, BlockControl) {
        let release = Arc::new(Semaphore::new(0));
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        self.block = Some((Arc::clone(&release), entered_tx));
        (self, BlockControl { release, entered_rx })
    }

    /// Shared call record (survives boxing the updater)
    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait::async_trait]
impl DnsUpdater for MockUpdater {
    async fn update(&self, credentials: &Credentials) -> UpdateResult {
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        self.probe.call_times.lock().unwrap().push(Instant::now());
        self.probe
            .credentials_seen
            .lock()
            .unwrap()
            .push(credentials.clone());

        let now_in_flight = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe
            .max_in_flight
            .fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some((release, entered_tx)) = &self.block {
            let _ = entered_tx.send(());
            release.acquire().await.unwrap().forget();
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        UpdateResult::now(self.status)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Credentials used by default in tests
pub fn test_credentials() -> Credentials {
    Credentials::new("m1", "p1")
}

/// Build a scheduler around `updater` with a fresh history
pub fn scheduler_with(
    updater: MockUpdater,
) -> (UpdateScheduler, mpsc::Receiver<SchedulerEvent>) {
    UpdateScheduler::new(
        Box::new(updater),
        HistoryLog::new(),
        test_credentials(),
        SchedulerConfig::default(),
    )
    .expect("scheduler construction succeeds")
}

/// Drain all events received so far
pub fn drain_events(rx: &mut mpsc::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Count dropped ticks in `events`
pub fn dropped_ticks(events: &[SchedulerEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SchedulerEvent::TickDropped))
        .count()
}
