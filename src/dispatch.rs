//! Collaborator traits consumed by the handler.
//!
//! [`PacketDispatcher`] is the broker logic packets are routed to,
//! [`RegistrationListener`] receives the dispatcher's channel registration
//! events, and [`OutboundFilter`]s transform every reply before it reaches
//! the session.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use async_trait::async_trait;

use crate::{error::DispatchError, packet::ChannelId, returner::PacketReturner};

/// Observer of channel handler registration.
pub trait RegistrationListener: Send + Sync {
    /// A handler was registered for `channel`.
    fn handler_registered(&self, channel: ChannelId);

    /// The handler for `channel` was removed.
    fn handler_unregistered(&self, channel: ChannelId);
}

/// Application logic that consumes inbound packets.
///
/// `returner` is present only when the packet expects a reply. The dispatcher
/// may use it any number of times, immediately or from a later task.
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use wiregate::{DispatchError, PacketDispatcher, PacketReturner};
///
/// struct Echo;
///
/// #[async_trait]
/// impl PacketDispatcher<MyPacket> for Echo {
///     async fn dispatch(
///         &self,
///         packet: MyPacket,
///         returner: Option<PacketReturner<MyPacket>>,
///     ) -> Result<(), DispatchError> {
///         if let Some(returner) = returner {
///             returner.send(packet).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PacketDispatcher<P>: Send + Sync + 'static {
    /// Handle one inbound packet.
    async fn dispatch(
        &self,
        packet: P,
        returner: Option<PacketReturner<P>>,
    ) -> Result<(), DispatchError>;

    /// Store the listener notified when channel handlers come and go.
    ///
    /// Called once when a [`crate::SessionHandler`] is built around this
    /// dispatcher.
    fn set_listener(&self, _listener: Weak<dyn RegistrationListener>) {}
}

/// Transform applied to each outbound packet.
pub trait OutboundFilter<P>: Send + Sync + 'static {
    /// Return the packet to write, possibly modified.
    fn apply(&self, packet: P) -> P;
}

impl<P, F> OutboundFilter<P> for F
where
    F: Fn(P) -> P + Send + Sync + 'static,
{
    fn apply(&self, packet: P) -> P { self(packet) }
}

/// Ordered list of [`OutboundFilter`]s.
pub struct FilterChain<P> {
    filters: Vec<Arc<dyn OutboundFilter<P>>>,
}

impl<P: 'static> Default for FilterChain<P> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
        }
    }
}

impl<P: 'static> FilterChain<P> {
    /// Append a filter; filters run in insertion order.
    pub fn push(&mut self, filter: Arc<dyn OutboundFilter<P>>) { self.filters.push(filter); }

    /// Run `packet` through every filter.
    #[must_use]
    pub fn apply(&self, packet: P) -> P {
        self.filters
            .iter()
            .fold(packet, |packet, filter| filter.apply(packet))
    }

    /// Number of installed filters.
    #[must_use]
    pub fn len(&self) -> usize { self.filters.len() }

    /// Whether no filter is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.filters.is_empty() }
}

impl<P: 'static> fmt::Debug for FilterChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}
