//! Per-session gate state kept in session attributes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub(super) struct GateFlags {
    pub(super) blocked: bool,
    pub(super) closed: bool,
}

/// Monitor guarding one session's gate flags.
///
/// `flags` is only read or written while holding its lock, and waiters
/// register on `drained` before releasing it.
#[derive(Debug, Default)]
pub(super) struct GateState {
    flags: Mutex<GateFlags>,
    pub(super) drained: Notify,
}

impl GateState {
    pub(super) fn lock(&self) -> MutexGuard<'_, GateFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn close(&self) {
        let mut flags = self.lock();
        flags.closed = true;
        flags.blocked = false;
        self.drained.notify_waiters();
    }
}
