//! Write backpressure driven by high and low watermarks.
//!
//! Each session carries a small state machine, `flowing -> blocked ->
//! flowing`, stored in its [`crate::SessionAttributes`]. A session becomes
//! blocked when its scheduled write bytes reach the high watermark and flows
//! again once a write completion observes the backlog at or below the low
//! watermark.
//!
//! Worker replies wait for the session to flow with
//! [`BackpressureGate::wait_for_drain`]. Replies on the I/O path must not
//! wait; they call [`BackpressureGate::suspend_if_saturated`] instead, which
//! stops inbound reads until the backlog drains.

mod state;

use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use self::state::GateState;
use crate::{
    error::{ConfigError, ReturnError},
    session::Session,
};

/// Byte thresholds on a session's write backlog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Watermarks {
    low: u64,
    high: u64,
}

impl Watermarks {
    /// Create watermarks, requiring `low < high`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWatermarks`] when `low >= high`; equal or
    /// inverted thresholds would make the gate oscillate or never release.
    pub fn new(low: u64, high: u64) -> Result<Self, ConfigError> {
        if low >= high {
            return Err(ConfigError::InvalidWatermarks { low, high });
        }
        Ok(Self { low, high })
    }

    /// Backlog at or below which a blocked session flows again.
    #[must_use]
    pub const fn low(&self) -> u64 { self.low }

    /// Backlog at or above which a session is blocked.
    #[must_use]
    pub const fn high(&self) -> u64 { self.high }

    fn saturated(self, bytes: u64) -> bool { bytes >= self.high }

    fn drained(self, bytes: u64) -> bool { bytes <= self.low }
}

/// Per-handler backpressure policy applied to every session it serves.
#[derive(Clone, Copy, Debug)]
pub struct BackpressureGate {
    watermarks: Watermarks,
    block_timeout: Duration,
}

impl BackpressureGate {
    /// Create a gate with the given thresholds and wait budget.
    #[must_use]
    pub fn new(watermarks: Watermarks, block_timeout: Duration) -> Self {
        Self {
            watermarks,
            block_timeout,
        }
    }

    /// Thresholds applied by this gate.
    #[must_use]
    pub fn watermarks(&self) -> Watermarks { self.watermarks }

    /// Wait budget for [`wait_for_drain`](Self::wait_for_drain).
    #[must_use]
    pub fn block_timeout(&self) -> Duration { self.block_timeout }

    fn state<S: Session + ?Sized>(session: &S) -> Arc<GateState> {
        session.attributes().get_or_insert_with(GateState::default)
    }

    /// Install fresh gate state for a newly created session.
    pub fn install<S: Session + ?Sized>(&self, session: &S) {
        session.attributes().insert(GateState::default());
    }

    /// Mark the session's gate closed, failing current and later waiters with
    /// [`ReturnError::SessionClosed`].
    ///
    /// The closed state stays in the session attributes until
    /// [`install`](Self::install) replaces it.
    pub fn release<S: Session + ?Sized>(&self, session: &S) { Self::state(session).close(); }

    /// Whether the session is currently blocked.
    #[must_use]
    pub fn is_blocked<S: Session + ?Sized>(&self, session: &S) -> bool {
        session
            .attributes()
            .get::<GateState>()
            .is_some_and(|state| state.lock().blocked)
    }

    /// Wait until the session's write backlog is below the high watermark.
    ///
    /// Marks the session blocked while saturated and re-checks the backlog on
    /// every wake, so spurious wakes and partial drains are not mistaken for
    /// release. Must not be called from the I/O path.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnError::BackpressureTimeout`] if the backlog is still
    /// saturated when the block timeout elapses, and
    /// [`ReturnError::SessionClosed`] if the session closes meanwhile.
    pub async fn wait_for_drain<S: Session + ?Sized>(&self, session: &S) -> Result<(), ReturnError> {
        let state = Self::state(session);
        let started = Instant::now();
        // `None` when the timeout is too large to represent; wait untimed.
        let deadline = started.checked_add(self.block_timeout);

        loop {
            let notified = state.drained.notified();
            tokio::pin!(notified);
            {
                let mut flags = state.lock();
                if flags.closed {
                    return Err(ReturnError::SessionClosed(session.id()));
                }
                let bytes = session.scheduled_write_bytes();
                if !self.watermarks.saturated(bytes) {
                    return Ok(());
                }
                if !flags.blocked {
                    flags.blocked = true;
                    crate::metrics::inc_backpressure_blocks();
                    debug!(session = %session.id(), bytes, "session blocked on write backlog");
                }
                // Register before unlocking so a release cannot slip between
                // the check and the wait.
                notified.as_mut().enable();
            }

            let woken = match deadline {
                Some(deadline) => timeout_at(deadline, notified).await.is_ok(),
                None => {
                    notified.await;
                    true
                }
            };
            if !woken {
                if !self.watermarks.saturated(session.scheduled_write_bytes()) {
                    return Ok(());
                }
                crate::metrics::inc_backpressure_timeouts();
                return Err(ReturnError::BackpressureTimeout {
                    session: session.id(),
                    waited: started.elapsed(),
                });
            }
            trace!(session = %session.id(), "backpressure waiter woken");
        }
    }

    /// Suspend inbound reads if the backlog is saturated, without waiting.
    ///
    /// Used on the I/O path, where waiting would stop the very write
    /// completions that drain the backlog. The session is marked blocked so
    /// the next drain observed by [`on_write_complete`](Self::on_write_complete)
    /// resumes reads. Returns `true` if reads were suspended.
    pub fn suspend_if_saturated<S: Session + ?Sized>(&self, session: &S) -> bool {
        let state = Self::state(session);
        let mut flags = state.lock();
        let bytes = session.scheduled_write_bytes();
        if flags.closed || !self.watermarks.saturated(bytes) {
            return false;
        }
        if !flags.blocked {
            flags.blocked = true;
            crate::metrics::inc_backpressure_blocks();
        }
        if !session.is_read_suspended() {
            session.suspend_read();
        }
        debug!(session = %session.id(), bytes, "inbound reads suspended on write backlog");
        true
    }

    /// Write-completion callback: release a blocked session once its backlog
    /// has drained to the low watermark.
    ///
    /// Resumes suspended reads and wakes every waiter, since several replies
    /// for one session may be waiting at once. Returns `true` on release.
    pub fn on_write_complete<S: Session + ?Sized>(&self, session: &S) -> bool {
        let Some(state) = session.attributes().get::<GateState>() else {
            return false;
        };
        let mut flags = state.lock();
        if !flags.blocked {
            return false;
        }
        let bytes = session.scheduled_write_bytes();
        if !self.watermarks.drained(bytes) {
            return false;
        }
        flags.blocked = false;
        if session.is_read_suspended() {
            session.resume_read();
        }
        state.drained.notify_waiters();
        debug!(session = %session.id(), bytes, "session released from backpressure");
        true
    }
}
