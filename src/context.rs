//! Execution context threaded through the dispatch path.

/// Where a piece of dispatch work is running.
///
/// Replies issued from [`ExecutionContext::Io`] must never wait on the
/// backpressure gate: the transport can only drain the write backlog while
/// its I/O path keeps running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// The transport's I/O path, which also delivers write completions.
    Io,
    /// A worker task, free to wait for the write backlog to drain.
    Worker,
}

impl ExecutionContext {
    /// Whether code running in this context may wait on backpressure.
    #[must_use]
    pub const fn may_block(self) -> bool { matches!(self, Self::Worker) }
}
