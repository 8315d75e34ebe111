//! Transport session facade consumed by the handler.
//!
//! The handler never creates or destroys sessions. It reads the write backlog,
//! toggles inbound reads, writes replies, and keeps its own per-session state
//! in [`SessionAttributes`].

use std::fmt;

use crate::attributes::SessionAttributes;

/// Identifier assigned to a transport session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl From<u64> for SessionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl SessionId {
    /// Create a new [`SessionId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "SessionId({})", self.0) }
}

/// A live connection as seen by the handler.
///
/// Implementations wrap whatever the transport uses to track a socket. All
/// methods must be cheap and non-blocking: they are called from I/O callbacks.
pub trait Session: Send + Sync + 'static {
    /// Unique identifier of this session.
    fn id(&self) -> SessionId;

    /// Remote peer address, rendered for diagnostics.
    fn remote_address(&self) -> String;

    /// Bytes accepted by [`PacketWriter::write`] that the transport has not
    /// yet confirmed as sent.
    fn scheduled_write_bytes(&self) -> u64;

    /// Stop delivering inbound packets until [`Session::resume_read`].
    fn suspend_read(&self);

    /// Resume inbound delivery after [`Session::suspend_read`].
    fn resume_read(&self);

    /// Whether inbound reads are currently suspended.
    fn is_read_suspended(&self) -> bool;

    /// Close the underlying connection.
    fn close(&self);

    /// Per-session attribute storage.
    fn attributes(&self) -> &SessionAttributes;
}

/// Write capability for sessions carrying packets of type `P`.
///
/// `write` only schedules the packet. The transport reports completion by
/// invoking [`crate::SessionHandler::message_sent`].
pub trait PacketWriter<P>: Session {
    /// Queue `packet` for transmission.
    fn write(&self, packet: P);
}
