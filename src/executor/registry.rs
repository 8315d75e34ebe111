//! Channel to ordered-executor mapping.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use super::{OrderedExecutor, OrderedExecutorFactory};
use crate::packet::ChannelId;

/// Concurrent registry of ordered executors keyed by [`ChannelId`].
///
/// Executors are created lazily on first use and removed only when a channel
/// is explicitly released. Lookups for unrelated channels never contend on a
/// registry-wide lock; `DashMap` shards its locking per bucket.
#[derive(Debug)]
pub struct ExecutorRegistry {
    executors: DashMap<ChannelId, OrderedExecutor>,
    factory: OrderedExecutorFactory,
    installed: AtomicU64,
}

impl ExecutorRegistry {
    /// Create an empty registry creating executors with `factory`.
    #[must_use]
    pub fn new(factory: OrderedExecutorFactory) -> Self {
        Self {
            executors: DashMap::new(),
            factory,
            installed: AtomicU64::new(0),
        }
    }

    /// Return the executor for `channel`, creating it if absent.
    ///
    /// Callers racing on an unseen channel each build a candidate; the first
    /// to insert wins and the others discard theirs, so every caller observes
    /// the same executor.
    pub fn get_or_create(&self, channel: ChannelId) -> OrderedExecutor {
        if let Some(executor) = self.executors.get(&channel) {
            return executor.clone();
        }

        let candidate = self.factory.ordered_executor();
        match self.executors.entry(channel) {
            Entry::Occupied(winner) => winner.get().clone(),
            Entry::Vacant(slot) => {
                self.installed.fetch_add(1, Ordering::Relaxed);
                crate::metrics::inc_ordered_queues();
                debug!(%channel, "ordered executor created");
                slot.insert(candidate).clone()
            }
        }
    }

    /// Remove the executor for `channel`.
    ///
    /// Tasks already queued on the removed executor still run to completion.
    /// The next packet for `channel` gets a fresh executor.
    pub fn release(&self, channel: ChannelId) -> Option<OrderedExecutor> {
        let (_, executor) = self.executors.remove(&channel)?;
        crate::metrics::dec_ordered_queues();
        debug!(%channel, pending = executor.pending(), "ordered executor released");
        Some(executor)
    }

    /// Return the executor for `channel` without creating one.
    #[must_use]
    pub fn get(&self, channel: ChannelId) -> Option<OrderedExecutor> {
        self.executors.get(&channel).map(|executor| executor.clone())
    }

    /// Number of channels with an installed executor.
    #[must_use]
    pub fn len(&self) -> usize { self.executors.len() }

    /// Whether no executor is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.executors.is_empty() }

    /// Total executors ever installed, including released ones.
    #[must_use]
    pub fn installed(&self) -> u64 { self.installed.load(Ordering::Relaxed) }

    /// Factory backing this registry.
    #[must_use]
    pub fn factory(&self) -> &OrderedExecutorFactory { &self.factory }
}
