//! Reply capability handed to the dispatcher with each packet.

use std::{fmt, sync::Arc};

use tracing::warn;

use crate::{
    backpressure::BackpressureGate,
    context::ExecutionContext,
    dispatch::FilterChain,
    error::ReturnError,
    metrics::{self, Direction},
    packet::Packet,
    session::{PacketWriter, SessionId},
};

/// Sends replies for one inbound packet.
///
/// A returner is built per inbound packet that expects a reply and is bound
/// to its session and to the [`ExecutionContext`] the dispatch runs in. Before
/// each write it applies backpressure: worker contexts wait for the session's
/// backlog to drain, while the I/O context suspends inbound reads instead of
/// waiting. Replies pass through the handler's [`FilterChain`] and are then
/// written to the session.
pub struct PacketReturner<P> {
    session: Arc<dyn PacketWriter<P>>,
    gate: BackpressureGate,
    filters: Arc<FilterChain<P>>,
    context: ExecutionContext,
}

impl<P: Packet> PacketReturner<P> {
    /// Bind a returner to `session`, running in `context`.
    #[must_use]
    pub fn new(
        session: Arc<dyn PacketWriter<P>>,
        gate: BackpressureGate,
        filters: Arc<FilterChain<P>>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            session,
            gate,
            filters,
            context,
        }
    }

    /// Rebind the returner to another context.
    ///
    /// A dispatcher running on the I/O path that hands the returner to a
    /// worker task should rebind it to [`ExecutionContext::Worker`] so later
    /// replies wait for the backlog instead of only suspending reads.
    #[must_use]
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Context replies are sent from.
    #[must_use]
    pub fn context(&self) -> ExecutionContext { self.context }

    /// Identifier of the bound session.
    #[must_use]
    pub fn session_id(&self) -> SessionId { self.session.id() }

    /// Remote address of the bound session.
    #[must_use]
    pub fn remote_address(&self) -> String { self.session.remote_address() }

    /// Write `packet` to the session, applying backpressure first.
    ///
    /// The packet is written even when the backpressure wait fails; the
    /// failure is logged and returned so the caller can react to persistent
    /// overload.
    ///
    /// # Errors
    ///
    /// Returns [`ReturnError::BackpressureTimeout`] when a worker-context wait
    /// timed out and [`ReturnError::SessionClosed`] when the session closed
    /// while waiting.
    pub async fn send(&self, packet: P) -> Result<(), ReturnError> {
        let outcome = if self.context.may_block() {
            self.gate.wait_for_drain(&*self.session).await
        } else {
            self.gate.suspend_if_saturated(&*self.session);
            Ok(())
        };
        if let Err(error) = &outcome {
            warn!(session = %self.session.id(), %error, "writing reply despite backpressure failure");
        }

        let packet = self.filters.apply(packet);
        self.session.write(packet);
        metrics::inc_packets(Direction::Outbound);
        outcome
    }
}

impl<P: 'static> fmt::Debug for PacketReturner<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketReturner")
            .field("session", &self.session.id())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
