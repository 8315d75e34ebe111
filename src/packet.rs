//! Packet abstraction routed by the handler.
//!
//! The handler only needs two facts about a packet: which ordering domain it
//! belongs to and whether its sender expects a reply. Encoding is the
//! transport's concern.

use std::fmt;

/// Logical ordering domain multiplexed over one session.
///
/// Packets sharing a channel are dispatched strictly in arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl From<u64> for ChannelId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ChannelId {
    /// Create a new [`ChannelId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ChannelId({})", self.0) }
}

/// Inbound or outbound unit of data.
pub trait Packet: fmt::Debug + Send + 'static {
    /// Channel whose ordered queue processes this packet.
    fn channel_id(&self) -> ChannelId;

    /// Target awaiting a reply, or `None` when no reply is expected.
    fn response_target_id(&self) -> Option<u64>;
}
