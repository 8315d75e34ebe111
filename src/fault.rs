//! Transport fault handling.
//!
//! Faults raised by the transport are logged, reported to an optional
//! [`CleanUpNotifier`] as an internal [`MessagingError`] wrapping the original
//! fault, and optionally close the session. They never propagate further.

use std::{fmt, sync::Arc};

use tracing::error;

use crate::{
    error::{DispatchError, MessagingError},
    session::{Session, SessionId},
};

/// Sink told about sessions that failed, so broker state tied to them can be
/// released.
pub trait CleanUpNotifier: Send + Sync + 'static {
    /// Release resources held for `session` after `error`.
    fn fire_cleanup(&self, session: SessionId, error: MessagingError);
}

impl<F> CleanUpNotifier for F
where
    F: Fn(SessionId, MessagingError) + Send + Sync + 'static,
{
    fn fire_cleanup(&self, session: SessionId, error: MessagingError) { self(session, error); }
}

/// How a handler reacts to transport faults.
#[derive(Clone, Default)]
pub(crate) struct FaultPolicy {
    notifier: Option<Arc<dyn CleanUpNotifier>>,
    close_session: bool,
}

impl FaultPolicy {
    pub(crate) fn new(notifier: Option<Arc<dyn CleanUpNotifier>>, close_session: bool) -> Self {
        Self {
            notifier,
            close_session,
        }
    }

    pub(crate) fn handle<S: Session + ?Sized>(&self, session: &S, cause: DispatchError) {
        crate::metrics::inc_session_faults();
        error!(
            session = %session.id(),
            remote = %session.remote_address(),
            error = %cause,
            "caught exception for session"
        );

        if let Some(notifier) = &self.notifier {
            let error = MessagingError::internal("unexpected exception", cause);
            notifier.fire_cleanup(session.id(), error);
        }
        if self.close_session {
            session.close();
        }
    }
}

impl fmt::Debug for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultPolicy")
            .field("notifier", &self.notifier.is_some())
            .field("close_session", &self.close_session)
            .finish()
    }
}
