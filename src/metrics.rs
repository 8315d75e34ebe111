//! Metric helpers for `wiregate`.
//!
//! This module defines metric names and helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking packets handled by direction.
pub const PACKETS_TOTAL: &str = "wiregate_packets_total";
/// Name of the counter tracking flowing-to-blocked gate transitions.
pub const BACKPRESSURE_BLOCKS: &str = "wiregate_backpressure_blocks_total";
/// Name of the counter tracking backpressure waits that timed out.
pub const BACKPRESSURE_TIMEOUTS: &str = "wiregate_backpressure_timeouts_total";
/// Name of the counter tracking failed or panicked dispatch tasks.
pub const DISPATCH_FAILURES: &str = "wiregate_dispatch_failures_total";
/// Name of the counter tracking transport faults.
pub const SESSION_FAULTS: &str = "wiregate_session_faults_total";
/// Name of the gauge tracking installed ordered queues.
pub const ORDERED_QUEUES_ACTIVE: &str = "wiregate_ordered_queues_active";

/// Direction of packet processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Packets received from a peer.
    Inbound,
    /// Replies written to a peer.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a handled packet for the given direction.
pub fn inc_packets(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(PACKETS_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a session entering the blocked state.
pub fn inc_backpressure_blocks() {
    #[cfg(feature = "metrics")]
    counter!(BACKPRESSURE_BLOCKS).increment(1);
}

/// Record a backpressure wait that exhausted its timeout.
pub fn inc_backpressure_timeouts() {
    #[cfg(feature = "metrics")]
    counter!(BACKPRESSURE_TIMEOUTS).increment(1);
}

/// Record a dispatch task that failed or panicked.
pub fn inc_dispatch_failures() {
    #[cfg(feature = "metrics")]
    counter!(DISPATCH_FAILURES).increment(1);
}

/// Record a transport fault reported for a session.
pub fn inc_session_faults() {
    #[cfg(feature = "metrics")]
    counter!(SESSION_FAULTS).increment(1);
}

/// Record an ordered queue being installed in the registry.
pub fn inc_ordered_queues() {
    #[cfg(feature = "metrics")]
    gauge!(ORDERED_QUEUES_ACTIVE).increment(1.0);
}

/// Record an ordered queue being released from the registry.
pub fn dec_ordered_queues() {
    #[cfg(feature = "metrics")]
    gauge!(ORDERED_QUEUES_ACTIVE).decrement(1.0);
}
