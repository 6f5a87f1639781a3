//! Update scheduler
//!
//! The UpdateScheduler owns the busy gate, the interval timer and the credential
//! cell. It is responsible for:
//! - Running one manual attempt on request, or rejecting it with `Busy`
//! - Arming and disarming the interval timer
//! - Dropping ticks that land while an attempt is in flight
//! - Appending every completed attempt to the HistoryLog
//!
//! ## Architecture
//!
//! ```text
//!  trigger_once() ──┐                 ┌──────────────┐
//!                   ├── BusyGate ───► │  DnsUpdater  │ ──► UpdateResult ──► HistoryLog
//!  interval tick ───┘   (try only)    └──────────────┘
//! ```
//!
//! ## State
//!
//! [`SchedulerStatus`] (`busy`, `interval_active`) is the single source of truth.
//! [`SchedulerState`] and the `can_*` affordances are projections of it, and the
//! status is published on a watch channel whenever it changes.
//!
//! ## Cancellation
//!
//! The tick path checks that its interval is still armed, under the same lock
//! `cancel_interval()` takes to disarm it, before starting an attempt. Once
//! `cancel_interval()` returns no new attempt can start. An attempt already in
//! flight runs to completion and releases the gate on its own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{SchedulerConfig, UpdateSpan};
use crate::error::{Error, Result};
use crate::gate::{BusyGate, BusyGuard};
use crate::history::HistoryLog;
use crate::traits::{Credentials, DnsUpdater, UpdateResult, UpdateStatus};

/// What started an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `trigger_once()`
    Manual,
    /// Interval tick
    Interval,
}

/// Events emitted by the UpdateScheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Interval timer armed
    IntervalStarted {
        span_secs: u64,
    },

    /// Interval timer disarmed
    IntervalCancelled,

    /// Attempt acquired the gate and is calling the client
    AttemptStarted {
        trigger: Trigger,
    },

    /// Attempt completed and was appended to history
    AttemptFinished {
        trigger: Trigger,
        status: UpdateStatus,
    },

    /// Tick landed while the gate was held
    TickDropped,
}

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing armed, nothing running
    Idle,
    /// An attempt is in flight
    Running,
    /// Interval timer armed, waiting for the next tick
    ScheduledActive,
}

/// Raw status the state and affordances are projected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStatus {
    /// An attempt holds the busy gate
    pub busy: bool,
    /// The interval timer is armed
    pub interval_active: bool,
}

impl SchedulerStatus {
    /// Project into a single state
    pub fn state(&self) -> SchedulerState {
        if self.busy {
            SchedulerState::Running
        } else if self.interval_active {
            SchedulerState::ScheduledActive
        } else {
            SchedulerState::Idle
        }
    }

    /// Whether a manual trigger would be accepted
    pub fn can_trigger(&self) -> bool {
        !self.busy
    }

    /// Whether `start_interval()` would be accepted
    pub fn can_start_interval(&self) -> bool {
        !self.interval_active
    }

    /// Whether `cancel_interval()` would be accepted
    pub fn can_cancel(&self) -> bool {
        self.interval_active
    }
}

/// Interval-driven update scheduler
///
/// Cloning is cheap; clones control the same scheduler.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateScheduler::new()`]
/// 2. Call [`UpdateScheduler::trigger_once()`] and/or [`UpdateScheduler::start_interval()`]
/// 3. Stop with [`UpdateScheduler::cancel_interval()`] or [`UpdateScheduler::shutdown()`]
///
/// `start_interval()` spawns onto the current tokio runtime and must be called
/// from within one.
#[derive(Clone)]
pub struct UpdateScheduler {
    shared: Arc<Shared>,
}

struct Shared {
    client: Box<dyn DnsUpdater>,
    history: HistoryLog,
    gate: BusyGate,

    /// Re-read at the start of every attempt
    credentials: watch::Sender<Credentials>,

    /// Armed interval, if any
    interval: Mutex<Option<IntervalHandle>>,

    /// Mirrors `interval.is_some()`; written only while `interval` is locked
    interval_active: AtomicBool,

    next_interval_id: AtomicU64,
    status: watch::Sender<SchedulerStatus>,
    event_tx: mpsc::Sender<SchedulerEvent>,
}

struct IntervalHandle {
    id: u64,
    span: UpdateSpan,
    shutdown: oneshot::Sender<()>,
}

/// Gate ownership for one attempt; republishes status on release
struct AttemptGuard {
    busy: Option<BusyGuard>,
    shared: Arc<Shared>,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.busy.take();
        self.shared.refresh_status();
    }
}

impl UpdateScheduler {
    /// Create a new scheduler
    ///
    /// # Parameters
    ///
    /// - `client`: Update client performing the lookup and provider calls
    /// - `history`: Log every completed attempt is appended to
    /// - `credentials`: Initial credentials; replace with [`Self::set_credentials()`]
    /// - `config`: Scheduler settings
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    pub fn new(
        client: Box<dyn DnsUpdater>,
        history: HistoryLog,
        credentials: Credentials,
        config: SchedulerConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (credentials, _) = watch::channel(credentials);
        let (status, _) = watch::channel(SchedulerStatus::default());

        let shared = Arc::new(Shared {
            client,
            history,
            gate: BusyGate::new(),
            credentials,
            interval: Mutex::new(None),
            interval_active: AtomicBool::new(false),
            next_interval_id: AtomicU64::new(0),
            status,
            event_tx,
        });

        Ok((Self { shared }, event_rx))
    }

    /// Replace the credentials used by subsequent attempts
    pub fn set_credentials(&self, credentials: Credentials) {
        self.shared.credentials.send_replace(credentials);
    }

    /// Credentials the next attempt will use
    pub fn credentials(&self) -> Credentials {
        self.shared.credentials.borrow().clone()
    }

    /// History the scheduler appends to
    pub fn history(&self) -> &HistoryLog {
        &self.shared.history
    }

    /// Current status
    pub fn status(&self) -> SchedulerStatus {
        self.shared.current_status()
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        self.status().state()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SchedulerStatus> {
        self.shared.status.subscribe()
    }

    /// Span of the armed interval, if any
    pub fn interval_span(&self) -> Option<UpdateSpan> {
        self.shared.lock_interval().as_ref().map(|handle| handle.span)
    }

    /// Run one attempt now
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateResult)`: The attempt completed (successfully or not) and was recorded
    /// - `Err(Error::Busy)`: Another attempt is in flight; history is untouched
    pub async fn trigger_once(&self) -> Result<UpdateResult> {
        let Some(guard) = Shared::acquire(&self.shared) else {
            debug!("Manual update rejected: an update is already in progress");
            return Err(Error::Busy);
        };

        Ok(self.shared.run_attempt(Trigger::Manual, guard).await)
    }

    /// Arm the interval timer
    ///
    /// The first tick fires immediately, then every `span`.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Timer armed
    /// - `Err(Error::State)`: An interval is already armed
    pub fn start_interval(&self, span: UpdateSpan) -> Result<()> {
        {
            let mut slot = self.shared.lock_interval();
            if slot.is_some() {
                return Err(Error::state("interval updates are already running"));
            }

            let id = self.shared.next_interval_id.fetch_add(1, Ordering::SeqCst);
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            *slot = Some(IntervalHandle {
                id,
                span,
                shutdown: shutdown_tx,
            });
            self.shared.interval_active.store(true, Ordering::SeqCst);

            tokio::spawn(run_interval(Arc::clone(&self.shared), id, span, shutdown_rx));
        }

        self.shared.refresh_status();
        info!("Interval updates started (every {})", span);
        self.shared.emit_event(SchedulerEvent::IntervalStarted {
            span_secs: span.as_secs(),
        });

        Ok(())
    }

    /// Disarm the interval timer
    ///
    /// An attempt already in flight is allowed to finish; no new one starts after
    /// this returns.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Timer disarmed
    /// - `Err(Error::State)`: No interval was armed
    pub fn cancel_interval(&self) -> Result<()> {
        let handle = {
            let mut slot = self.shared.lock_interval();
            let handle = slot
                .take()
                .ok_or_else(|| Error::state("interval updates are not running"))?;
            self.shared.interval_active.store(false, Ordering::SeqCst);
            handle
        };

        // The task may already have exited; disarming above is what counts
        let _ = handle.shutdown.send(());

        self.shared.refresh_status();
        info!("Interval updates cancelled");
        self.shared.emit_event(SchedulerEvent::IntervalCancelled);

        Ok(())
    }

    /// Disarm the interval (if armed) and wait for any in-flight attempt
    pub async fn shutdown(&self) {
        if self.status().interval_active
            && let Err(e) = self.cancel_interval()
        {
            debug!("Interval already stopped during shutdown: {}", e);
        }

        self.shared.gate.wait_idle().await;
        debug!("Scheduler idle");
    }
}

impl Shared {
    fn lock_interval(&self) -> MutexGuard<'_, Option<IntervalHandle>> {
        self.interval.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_status(&self) -> SchedulerStatus {
        SchedulerStatus {
            busy: self.gate.is_busy(),
            interval_active: self.interval_active.load(Ordering::SeqCst),
        }
    }

    /// Recompute and publish the status
    ///
    /// Never takes the interval lock, so it is safe to call while holding it.
    fn refresh_status(&self) {
        self.status.send_if_modified(|status| {
            let next = self.current_status();
            if *status == next {
                false
            } else {
                *status = next;
                true
            }
        });
    }

    fn acquire(shared: &Arc<Self>) -> Option<AttemptGuard> {
        let busy = shared.gate.try_acquire()?;
        let guard = AttemptGuard {
            busy: Some(busy),
            shared: Arc::clone(shared),
        };
        shared.refresh_status();
        Some(guard)
    }

    /// Run one attempt while holding the gate
    async fn run_attempt(&self, trigger: Trigger, guard: AttemptGuard) -> UpdateResult {
        let credentials = self.credentials.borrow().clone();

        self.emit_event(SchedulerEvent::AttemptStarted { trigger });
        info!(
            "Starting {:?} update via {} (master ID: {})",
            trigger,
            self.client.provider_name(),
            credentials.master_id
        );

        let result = self.client.update(&credentials).await;

        // Appended before release so history order matches completion order
        self.history.append(result);
        drop(guard);

        match result.status {
            UpdateStatus::Success => info!("{:?} update succeeded at {}", trigger, result.timestamp),
            UpdateStatus::Failure => warn!("{:?} update failed at {}", trigger, result.timestamp),
        }

        self.emit_event(SchedulerEvent::AttemptFinished {
            trigger,
            status: result.status,
        });

        result
    }

    /// Handle one tick of interval `id`
    ///
    /// Returns `false` once the interval has been disarmed.
    fn on_tick(shared: &Arc<Self>, id: u64) -> bool {
        let slot = shared.lock_interval();
        if !slot.as_ref().is_some_and(|handle| handle.id == id) {
            return false;
        }

        let Some(guard) = Self::acquire(shared) else {
            drop(slot);
            debug!("Tick dropped: an update is already in progress");
            shared.emit_event(SchedulerEvent::TickDropped);
            return true;
        };

        let task_shared = Arc::clone(shared);
        tokio::spawn(async move {
            task_shared.run_attempt(Trigger::Interval, guard).await;
        });

        true
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Interval task: ticks until disarmed
async fn run_interval(
    shared: Arc<Shared>,
    id: u64,
    span: UpdateSpan,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(span.as_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => break,

            _ = ticker.tick() => {
                if !Shared::on_tick(&shared, id) {
                    break;
                }
            }
        }
    }

    debug!("Interval task {} stopped", id);
}
