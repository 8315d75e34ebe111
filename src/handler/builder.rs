//! Builder for [`SessionHandler`].

use std::sync::{Arc, Weak};

use tokio::runtime::Handle;

use super::SessionHandler;
use crate::{
    backpressure::BackpressureGate,
    config::HandlerConfig,
    dispatch::{FilterChain, OutboundFilter, PacketDispatcher, RegistrationListener},
    error::ConfigError,
    executor::{ExecutorRegistry, OrderedExecutorFactory},
    fault::{CleanUpNotifier, FaultPolicy},
    packet::Packet,
};

/// Builder for [`SessionHandler`].
///
/// Defaults to [`HandlerConfig::default`], no cleanup sink, no outbound
/// filters, and the ambient Tokio runtime for ordered dispatch.
///
/// # Examples
///
/// ```rust,ignore
/// use wiregate::{HandlerConfig, SessionHandler};
///
/// let handler = SessionHandler::builder(MyDispatcher::default())
///     .config(HandlerConfig::builder().watermarks(16 * 1024, 256 * 1024).build()?)
///     .cleanup_notifier(|session, error| tracing::warn!(%session, %error, "cleanup"))
///     .build()?;
/// ```
pub struct SessionHandlerBuilder<P, D> {
    dispatcher: D,
    config: HandlerConfig,
    cleanup: Option<Arc<dyn CleanUpNotifier>>,
    filters: FilterChain<P>,
    runtime: Option<Handle>,
}

impl<P, D> SessionHandlerBuilder<P, D>
where
    P: Packet,
    D: PacketDispatcher<P>,
{
    pub(super) fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            config: HandlerConfig::default(),
            cleanup: None,
            filters: FilterChain::default(),
            runtime: None,
        }
    }

    /// Replace the handler configuration.
    #[must_use]
    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sink notified when a session faults.
    #[must_use]
    pub fn cleanup_notifier(mut self, notifier: impl CleanUpNotifier) -> Self {
        self.cleanup = Some(Arc::new(notifier));
        self
    }

    /// Append a filter applied to every outbound reply.
    #[must_use]
    pub fn filter(mut self, filter: impl OutboundFilter<P>) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Runtime on which ordered dispatch tasks are spawned.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Validate the configuration and build the handler.
    ///
    /// The handler registers itself as the dispatcher's
    /// [`RegistrationListener`].
    ///
    /// # Errors
    ///
    /// Returns any [`ConfigError`] from [`HandlerConfig::validate`], and
    /// [`ConfigError::NoRuntime`] when ordered dispatch is enabled without an
    /// explicit or ambient Tokio runtime.
    pub fn build(self) -> Result<Arc<SessionHandler<P, D>>, ConfigError> {
        self.config.validate()?;
        let gate = BackpressureGate::new(self.config.watermarks()?, self.config.block_timeout);

        let executors = if self.config.ordered_dispatch {
            let handle = match self.runtime {
                Some(handle) => handle,
                None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
            };
            Some(ExecutorRegistry::new(OrderedExecutorFactory::new(handle)))
        } else {
            None
        };

        let handler = Arc::new(SessionHandler {
            dispatcher: Arc::new(self.dispatcher),
            executors,
            gate,
            filters: Arc::new(self.filters),
            faults: FaultPolicy::new(self.cleanup, self.config.close_session_on_fault),
        });
        let listener: Weak<SessionHandler<P, D>> = Arc::downgrade(&handler);
        let listener: Weak<dyn RegistrationListener> = listener;
        handler.dispatcher.set_listener(listener);
        Ok(handler)
    }
}
