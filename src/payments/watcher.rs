//! Payment status watcher.
//!
//! # States
//! - Idle: no order is being watched
//! - Polling: a timer checks the order status at a fixed interval
//! - Approved: first `paid` observed, approval emitted, timer stopped
//! - Failed: a status check failed, error emitted, timer stopped
//!
//! # State Transitions
//! ```text
//! Idle → Polling: start(order)
//! Polling → Polling: check returns awaiting
//! Polling → Approved: check returns paid (approval emitted once)
//! Polling → Failed: check returns an error
//! any → Idle: stop()
//! any → Polling: start(order) (previous timer cancelled first)
//! ```
//!
//! Every `start` and `stop` bumps a session token. A check compares the token
//! it was spawned with against the current one once its response arrives and
//! discards the result on mismatch, so late responses never touch state.
//!
//! Applying a result and notifying the listener happen under an emission
//! lock that `start` and `stop` also take, so once either returns no event of
//! the replaced session can still be delivered.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::metrics;
use crate::payments::error::{WatchError, WatchResult};
use crate::payments::types::{Approval, OrderId, OrderSummary, StatusReport, WatchPhase};

/// Anything that can report the payment status of an order.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, order_id: &OrderId) -> WatchResult<StatusReport>;
}

/// Receives watcher notifications.
///
/// Callbacks for a session never run after `start` or `stop` has returned on
/// another thread. A callback may itself call `start` or `stop`; callbacks of
/// the session it replaces are then skipped.
pub trait WatchListener: Send + Sync {
    /// Called on every successful check.
    fn on_status_changed(&self, _report: &StatusReport) {}

    /// Called once per watch session, on the first `paid` observation.
    fn on_approved(&self, _approval: &Approval) {}

    /// Called when a check fails; polling has already stopped.
    fn on_error(&self, _order_id: &OrderId, _error: &WatchError) {}
}

/// Watcher notifications as owned values, for channel-based listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    StatusChanged(StatusReport),
    Approved(Approval),
    Failed { order_id: OrderId, message: String },
}

impl WatchListener for mpsc::UnboundedSender<WatchEvent> {
    fn on_status_changed(&self, report: &StatusReport) {
        let _ = self.send(WatchEvent::StatusChanged(report.clone()));
    }

    fn on_approved(&self, approval: &Approval) {
        let _ = self.send(WatchEvent::Approved(approval.clone()));
    }

    fn on_error(&self, order_id: &OrderId, error: &WatchError) {
        let _ = self.send(WatchEvent::Failed {
            order_id: order_id.clone(),
            message: error.to_string(),
        });
    }
}

/// Result of a single status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckOutcome {
    Pending,
    Approved,
    Failed,
    /// Session changed while the request was in flight; result dropped.
    Stale,
}

impl CheckOutcome {
    fn keeps_polling(self) -> bool {
        matches!(self, CheckOutcome::Pending)
    }

    fn as_label(self) -> &'static str {
        match self {
            CheckOutcome::Pending => "pending",
            CheckOutcome::Approved => "approved",
            CheckOutcome::Failed => "failed",
            CheckOutcome::Stale => "stale",
        }
    }
}

struct WatchState {
    order_id: Option<OrderId>,
    summary: Option<OrderSummary>,
    phase: WatchPhase,
    notified: bool,
    session: u64,
    task: Option<JoinHandle<()>>,
}

impl WatchState {
    /// Cancel the timer and invalidate any in-flight check.
    fn cancel(&mut self) {
        self.session += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct WatcherCore {
    source: Arc<dyn StatusSource>,
    listener: Arc<dyn WatchListener>,
    state: Mutex<WatchState>,
    /// Held while a check applies its result and notifies the listener.
    /// Always taken before `state`.
    emission: Mutex<()>,
    /// Thread currently holding `emission`.
    emitter: Mutex<Option<ThreadId>>,
}

impl WatcherCore {
    fn lock(&self) -> MutexGuard<'_, WatchState> {
        // State stays consistent across a panicking listener since callbacks
        // never run under this lock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emitter(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.emitter.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_emission(&self) -> Emission<'_> {
        let guard = self.emission.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *self.emitter() = Some(thread::current().id());
        Emission { core: self, _guard: guard }
    }

    /// Wait for any in-progress emission before a session change.
    ///
    /// Returns `None` when called from a listener callback, which already
    /// runs under the emission lock.
    fn exclude_emission(&self) -> Option<MutexGuard<'_, ()>> {
        if *self.emitter() == Some(thread::current().id()) {
            return None;
        }
        Some(self.emission.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// Notify the listener if `session` is still current.
    fn emit(&self, session: u64, notify: impl FnOnce(&dyn WatchListener)) -> bool {
        if self.lock().session != session {
            return false;
        }
        notify(self.listener.as_ref());
        true
    }
}

struct Emission<'a> {
    core: &'a WatcherCore,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for Emission<'_> {
    fn drop(&mut self) {
        // Runs before `_guard` is released.
        *self.core.emitter() = None;
    }
}

/// Watches one in-flight order at a time.
pub struct PaymentWatcher {
    core: Arc<WatcherCore>,
    interval: Duration,
}

impl PaymentWatcher {
    /// Create an idle watcher polling `source` every `interval`.
    pub fn new(
        source: Arc<dyn StatusSource>,
        listener: Arc<dyn WatchListener>,
        interval: Duration,
    ) -> Self {
        Self {
            core: Arc::new(WatcherCore {
                source,
                listener,
                state: Mutex::new(WatchState {
                    order_id: None,
                    summary: None,
                    phase: WatchPhase::Idle,
                    notified: false,
                    session: 0,
                    task: None,
                }),
                emission: Mutex::new(()),
                emitter: Mutex::new(None),
            }),
            interval,
        }
    }

    /// Start watching `order_id`. See [`PaymentWatcher::start_with_summary`].
    pub fn start(&self, order_id: OrderId) {
        self.start_with_summary(order_id, None);
    }

    /// Start watching `order_id`, cancelling any previous watch first.
    ///
    /// The first check runs immediately, then once per interval. `summary` is
    /// carried into the approval since the status endpoint does not return it.
    /// Must be called within a Tokio runtime.
    pub fn start_with_summary(&self, order_id: OrderId, summary: Option<OrderSummary>) {
        let _emission = self.core.exclude_emission();
        let mut state = self.core.lock();
        state.cancel();

        state.order_id = Some(order_id.clone());
        state.summary = summary;
        state.phase = WatchPhase::Polling;
        state.notified = false;

        let session = state.session;
        let core = Arc::clone(&self.core);
        let interval = self.interval;

        tracing::info!(
            order_id = %order_id,
            session,
            interval_ms = interval.as_millis() as u64,
            "Starting payment watch"
        );
        metrics::record_session_started();

        state.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !check(&core, session).await.keeps_polling() {
                    break;
                }
            }
        }));
    }

    /// Stop watching. No-op when idle.
    pub fn stop(&self) {
        let _emission = self.core.exclude_emission();
        let mut state = self.core.lock();
        if state.phase == WatchPhase::Idle {
            return;
        }

        state.cancel();
        tracing::info!(
            order_id = ?state.order_id.as_ref().map(OrderId::as_str),
            "Payment watch stopped"
        );

        state.order_id = None;
        state.summary = None;
        state.phase = WatchPhase::Idle;
        state.notified = false;
    }

    pub fn phase(&self) -> WatchPhase {
        self.core.lock().phase
    }

    /// Order of the current or most recently finished session.
    pub fn order_id(&self) -> Option<OrderId> {
        self.core.lock().order_id.clone()
    }

    /// Whether the polling timer is running.
    pub fn is_active(&self) -> bool {
        self.phase() == WatchPhase::Polling
    }

    /// Whether a session was started and not stopped since, including one
    /// that already finished as approved or failed.
    pub fn has_session(&self) -> bool {
        self.phase() != WatchPhase::Idle
    }

    /// Whether the approval notification fired in this session.
    pub fn notified(&self) -> bool {
        self.core.lock().notified
    }

    pub fn session(&self) -> u64 {
        self.core.lock().session
    }
}

impl Drop for PaymentWatcher {
    fn drop(&mut self) {
        let _emission = self.core.exclude_emission();
        self.core.lock().cancel();
    }
}

/// Run one status check for `session`.
async fn check(core: &WatcherCore, session: u64) -> CheckOutcome {
    let order_id = {
        let state = core.lock();
        match (&state.order_id, state.phase) {
            (Some(order_id), WatchPhase::Polling) if state.session == session => order_id.clone(),
            _ => return CheckOutcome::Stale,
        }
    };

    let result = core.source.fetch_status(&order_id).await;

    let emission = core.begin_emission();
    let mut state = core.lock();
    if state.session != session || state.phase != WatchPhase::Polling {
        drop(state);
        drop(emission);
        tracing::debug!(order_id = %order_id, session, "Discarding stale status response");
        metrics::record_check(CheckOutcome::Stale.as_label());
        return CheckOutcome::Stale;
    }

    let outcome = match result {
        Ok(report) => {
            let approval = if report.status.is_terminal() && !state.notified {
                state.notified = true;
                state.phase = WatchPhase::Approved;
                // Detach rather than abort: this check runs inside that task.
                state.task = None;
                Some(Approval {
                    order_id: order_id.clone(),
                    label: report.label.clone(),
                    summary: state.summary.clone(),
                })
            } else {
                None
            };
            drop(state);

            tracing::debug!(order_id = %order_id, label = %report.label, "Payment status checked");
            core.emit(session, |listener| listener.on_status_changed(&report));

            match approval {
                Some(approval) => {
                    tracing::info!(order_id = %order_id, "Payment approved");
                    metrics::record_approval();
                    core.emit(session, |listener| listener.on_approved(&approval));
                    CheckOutcome::Approved
                }
                None => CheckOutcome::Pending,
            }
        }
        Err(e) => {
            state.phase = WatchPhase::Failed;
            state.task = None;
            drop(state);

            tracing::warn!(order_id = %order_id, error = %e, "Payment status check failed, polling stopped");
            core.emit(session, |listener| listener.on_error(&order_id, &e));
            CheckOutcome::Failed
        }
    };
    drop(emission);

    metrics::record_check(outcome.as_label());
    outcome
}
