//! Session inactivity monitoring.
//!
//! # Responsibilities
//! - Stamp the last-activity time on qualifying user interaction
//! - Periodically compare now against the stamp
//! - Drop the session and fire the logout callback past the threshold
//!
//! # Design Decisions
//! - The stamp lives in durable storage, so it survives restarts like the
//!   tokens do
//! - The first check runs one full interval after start
//! - Dropping the handle tears the monitor down just like `teardown()`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::observability::metrics;
use crate::session::context::SessionContext;
use crate::session::storage::LAST_ACTIVITY_KEY;

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// User interactions that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    PointerDown,
    KeyPress,
    Scroll,
    TouchStart,
}

pub struct InactivityMonitor {
    session: Arc<SessionContext>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    check_interval: Duration,
}

impl InactivityMonitor {
    pub fn new(session: Arc<SessionContext>, timeout: Duration, check_interval: Duration) -> Self {
        Self {
            session,
            clock: Arc::new(SystemClock),
            timeout,
            check_interval,
        }
    }

    /// Use a custom clock (for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stamp the current time as the last activity.
    pub fn record_activity(&self) {
        let now = self.clock.now_millis().to_string();
        if let Err(e) = self.session.storage().set(LAST_ACTIVITY_KEY, &now) {
            tracing::warn!(error = %e, "Failed to persist activity timestamp");
        }
    }

    /// Milliseconds since the last recorded activity, if one is recorded.
    pub fn idle_millis(&self) -> Option<u64> {
        let last = self
            .session
            .storage()
            .get(LAST_ACTIVITY_KEY)?
            .parse::<u64>()
            .ok()?;
        Some(self.clock.now_millis().saturating_sub(last))
    }

    /// Run one inactivity check.
    ///
    /// Without a recorded stamp the current time is recorded and the session
    /// is kept. Past the threshold the stamp and the credentials are cleared
    /// and `true` is returned; the caller then runs its logout action.
    pub fn check(&self) -> bool {
        let Some(idle) = self.idle_millis() else {
            self.record_activity();
            return false;
        };

        if u128::from(idle) <= self.timeout.as_millis() {
            return false;
        }

        tracing::info!(
            idle_secs = idle / 1000,
            timeout_secs = self.timeout.as_secs(),
            "Session inactive past threshold, logging out"
        );
        if let Err(e) = self.session.storage().remove(LAST_ACTIVITY_KEY) {
            tracing::warn!(error = %e, "Failed to remove activity timestamp");
        }
        self.session.clear_auth();
        metrics::record_session_timeout();
        true
    }

    /// Record initial activity and start the periodic check.
    ///
    /// `on_logout` runs once per detected timeout. Must be called inside a
    /// tokio runtime.
    pub fn start<F>(self, on_logout: F) -> MonitorHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let monitor = Arc::new(self);
        monitor.record_activity();

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let task_monitor = monitor.clone();
        let period = monitor.check_interval;

        tracing::info!(
            timeout_secs = monitor.timeout.as_secs(),
            interval_secs = period.as_secs(),
            "Inactivity monitor starting"
        );

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if task_monitor.check() {
                            on_logout();
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Inactivity monitor stopped");
                        break;
                    }
                }
            }
        });

        MonitorHandle {
            monitor,
            listening: AtomicBool::new(true),
            shutdown_tx,
            task,
        }
    }
}

/// Running inactivity monitor: feed it activity, tear it down when done.
pub struct MonitorHandle {
    monitor: Arc<InactivityMonitor>,
    listening: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Report a user interaction. Ignored after teardown.
    pub fn notify(&self, event: ActivityEvent) {
        if self.listening.load(Ordering::Acquire) {
            tracing::trace!(?event, "Activity");
            self.monitor.record_activity();
        }
    }

    /// Stop listening for activity and cancel the periodic check.
    pub fn teardown(&self) {
        self.listening.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for the periodic task to finish (after teardown).
    pub async fn join(self) {
        self.listening.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
