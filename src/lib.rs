#![doc(html_root_url = "https://docs.rs/wiregate/latest")]
//! Public API for the `wiregate` library.
//!
//! This crate provides the session handler that sits between a broker
//! transport and its packet dispatcher: ordered per-channel dispatch,
//! watermark-driven write backpressure, and fault and lifecycle handling.

pub mod attributes;
pub mod backpressure;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod fault;
pub mod handler;
pub mod metrics;
pub mod packet;
pub mod returner;
pub mod session;
#[cfg(test)]
mod test_support;

pub use attributes::SessionAttributes;
pub use backpressure::{BackpressureGate, Watermarks};
pub use config::{HandlerConfig, HandlerConfigBuilder};
pub use context::ExecutionContext;
pub use dispatch::{FilterChain, OutboundFilter, PacketDispatcher, RegistrationListener};
pub use error::{ConfigError, DispatchError, ErrorCode, MessagingError, ReturnError};
pub use executor::{ExecutorRegistry, OrderedExecutor, OrderedExecutorFactory};
pub use fault::CleanUpNotifier;
pub use handler::{SessionHandler, SessionHandlerBuilder};
pub use packet::{ChannelId, Packet};
pub use returner::PacketReturner;
pub use session::{PacketWriter, Session, SessionId};
