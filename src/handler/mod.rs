//! Session handler bridging a transport and a [`PacketDispatcher`].
//!
//! The transport drives a [`SessionHandler`] through its callbacks:
//!
//! - [`session_created`](SessionHandler::session_created) and
//!   [`session_closed`](SessionHandler::session_closed) bracket a session.
//! - [`message_received`](SessionHandler::message_received) routes each decoded
//!   packet, either onto its channel's ordered executor or inline.
//! - [`message_sent`](SessionHandler::message_sent) reports write completions,
//!   which release backpressure.
//! - [`exception_caught`](SessionHandler::exception_caught) reports transport
//!   faults.
//!
//! The handler is also the dispatcher's [`RegistrationListener`]: when a
//! channel's handler is unregistered, its ordered executor is released.

mod builder;

use std::sync::Arc;

pub use builder::SessionHandlerBuilder;
use futures::{FutureExt, future::BoxFuture};
use tracing::{error, trace};

use crate::{
    backpressure::BackpressureGate,
    context::ExecutionContext,
    dispatch::{FilterChain, PacketDispatcher, RegistrationListener},
    error::DispatchError,
    executor::ExecutorRegistry,
    fault::FaultPolicy,
    metrics::{self, Direction},
    packet::{ChannelId, Packet},
    returner::PacketReturner,
    session::{PacketWriter, Session},
};

/// Transport-facing handler for sessions carrying packets of type `P`.
pub struct SessionHandler<P, D> {
    dispatcher: Arc<D>,
    executors: Option<ExecutorRegistry>,
    gate: BackpressureGate,
    filters: Arc<FilterChain<P>>,
    faults: FaultPolicy,
}

impl<P, D> SessionHandler<P, D>
where
    P: Packet,
    D: PacketDispatcher<P>,
{
    /// Start building a handler around `dispatcher`.
    #[must_use]
    pub fn builder(dispatcher: D) -> SessionHandlerBuilder<P, D> { SessionHandlerBuilder::new(dispatcher) }

    /// Dispatcher receiving inbound packets.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<D> { &self.dispatcher }

    /// Backpressure gate applied to replies.
    #[must_use]
    pub fn gate(&self) -> &BackpressureGate { &self.gate }

    /// Channel executors, present when ordered dispatch is enabled.
    #[must_use]
    pub fn executors(&self) -> Option<&ExecutorRegistry> { self.executors.as_ref() }

    /// Initialise per-session state for a new connection.
    pub fn session_created<S: Session + ?Sized>(&self, session: &S) {
        self.gate.install(session);
        trace!(session = %session.id(), remote = %session.remote_address(), "session created");
    }

    /// Mark the session closed, failing replies waiting on its backlog and
    /// any sent later.
    pub fn session_closed<S: Session + ?Sized>(&self, session: &S) {
        self.gate.release(session);
        trace!(session = %session.id(), "session closed");
    }

    /// Route an inbound packet to the dispatcher.
    ///
    /// With ordered dispatch the packet is queued on its channel's executor
    /// and this returns at once; failures are logged at the task boundary and
    /// never reach the caller. Without it the dispatcher runs inline on the
    /// calling I/O path.
    ///
    /// # Errors
    ///
    /// Inline dispatch returns the dispatcher's error so the transport can
    /// report it through [`exception_caught`](Self::exception_caught).
    pub async fn message_received<S>(&self, session: &Arc<S>, packet: P) -> Result<(), DispatchError>
    where
        S: PacketWriter<P>,
    {
        metrics::inc_packets(Direction::Inbound);
        let channel = packet.channel_id();
        trace!(session = %session.id(), %channel, ?packet, "received packet");

        let writer: Arc<dyn PacketWriter<P>> = Arc::<S>::clone(session);
        let Some(executors) = &self.executors else {
            return self
                .dispatch_task(writer, packet, ExecutionContext::Io)
                .await;
        };

        let session_id = session.id();
        let task = self.dispatch_task(writer, packet, ExecutionContext::Worker);
        executors.get_or_create(channel).execute(async move {
            if let Err(error) = task.await {
                metrics::inc_dispatch_failures();
                error!(session = %session_id, %channel, %error, "unexpected error dispatching packet");
            }
        });
        Ok(())
    }

    /// Write-completion callback from the transport.
    ///
    /// Releases the session from backpressure once its backlog has drained to
    /// the low watermark.
    pub fn message_sent<S: Session + ?Sized>(&self, session: &S) { self.gate.on_write_complete(session); }

    /// Report a transport fault on `session`.
    ///
    /// Logs the fault, notifies the cleanup sink if one is configured, and
    /// closes the session when configured to.
    pub fn exception_caught<S: Session + ?Sized>(&self, session: &S, cause: impl Into<DispatchError>) {
        self.faults.handle(session, cause.into());
    }

    /// Wait for every queued dispatch task to finish.
    ///
    /// Call once the transport has stopped delivering packets; a no-op
    /// without ordered dispatch.
    pub async fn shutdown(&self) {
        if let Some(executors) = &self.executors {
            let factory = executors.factory();
            factory.close();
            factory.wait().await;
        }
    }

    fn dispatch_task(
        &self,
        session: Arc<dyn PacketWriter<P>>,
        packet: P,
        context: ExecutionContext,
    ) -> BoxFuture<'static, Result<(), DispatchError>> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let returner = packet.response_target_id().map(|_| {
            PacketReturner::new(session, self.gate, Arc::clone(&self.filters), context)
        });
        async move { dispatcher.dispatch(packet, returner).await }.boxed()
    }
}

impl<P, D> RegistrationListener for SessionHandler<P, D>
where
    P: Packet,
    D: PacketDispatcher<P>,
{
    fn handler_registered(&self, channel: ChannelId) {
        // Executors are created on the first packet for a channel.
        trace!(%channel, "channel handler registered");
    }

    fn handler_unregistered(&self, channel: ChannelId) {
        if let Some(executors) = &self.executors {
            executors.release(channel);
        }
    }
}
