//! Ordered task execution.
//!
//! An [`OrderedExecutor`] runs the futures submitted to it one at a time, in
//! submission order, on a shared Tokio runtime. Distinct executors run
//! concurrently. The [`ExecutorRegistry`] maps each [`crate::ChannelId`] to
//! its executor so packets on one channel keep their order while channels
//! proceed in parallel.

mod ordered;
mod registry;

pub use ordered::{OrderedExecutor, OrderedExecutorFactory};
pub use registry::ExecutorRegistry;
