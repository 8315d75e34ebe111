//! Dispatcher double recording what the handler delivers.

use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::{Notify, Semaphore},
    time::timeout,
};
use wiregate::{
    ChannelId,
    DispatchError,
    PacketDispatcher,
    PacketReturner,
    RegistrationListener,
    ReturnError,
};

use crate::packet::TestPacket;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> { mutex.lock().unwrap_or_else(PoisonError::into_inner) }

/// [`PacketDispatcher`] that records every packet it is handed.
///
/// Packets carrying a returner are answered with [`TestPacket::reply`] and the
/// send outcome is recorded. Labels can be made to fail or to stall until the
/// test releases them.
#[derive(Default)]
pub struct RecordingDispatcher {
    started: Mutex<Vec<TestPacket>>,
    completed: Mutex<Vec<String>>,
    replies: Mutex<Vec<Result<(), ReturnError>>>,
    failing: Mutex<HashSet<String>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
    listener: Mutex<Option<Weak<dyn RegistrationListener>>>,
    progress: Notify,
}

impl RecordingDispatcher {
    /// Fail dispatch of packets labelled `label`.
    #[must_use]
    pub fn failing_on(self, label: impl Into<String>) -> Self {
        lock(&self.failing).insert(label.into());
        self
    }

    /// Stall dispatch of packets labelled `label` until a permit is added to
    /// the returned semaphore.
    pub fn hold(&self, label: impl Into<String>) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        lock(&self.holds).insert(label.into(), Arc::clone(&gate));
        gate
    }

    /// Labels of packets seen on `channel`, in start order.
    pub fn labels_on(&self, channel: u64) -> Vec<String> {
        lock(&self.started)
            .iter()
            .filter(|packet| packet.channel == ChannelId::new(channel))
            .map(|packet| packet.label.clone())
            .collect()
    }

    /// Labels of packets whose dispatch has finished, in completion order.
    pub fn completed(&self) -> Vec<String> { lock(&self.completed).clone() }

    /// Outcomes of every reply sent so far.
    pub fn reply_outcomes(&self) -> Vec<Result<(), ReturnError>> { lock(&self.replies).clone() }

    /// Wait until at least `count` dispatches have started.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within five seconds.
    pub async fn wait_for(&self, count: usize) { self.wait_until(|| lock(&self.started).len() >= count).await; }

    /// Wait until at least `count` dispatches have finished.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within five seconds.
    pub async fn wait_for_completed(&self, count: usize) {
        self.wait_until(|| lock(&self.completed).len() >= count)
            .await;
    }

    /// Announce a channel registration to the handler, if attached.
    pub fn register(&self, channel: u64) {
        if let Some(listener) = self.listener() {
            listener.handler_registered(ChannelId::new(channel));
        }
    }

    /// Announce a channel deregistration to the handler, if attached.
    pub fn unregister(&self, channel: u64) {
        if let Some(listener) = self.listener() {
            listener.handler_unregistered(ChannelId::new(channel));
        }
    }

    /// Whether a live handler registered itself as listener.
    pub fn has_listener(&self) -> bool { self.listener().is_some() }

    fn listener(&self) -> Option<Arc<dyn RegistrationListener>> {
        lock(&self.listener).as_ref().and_then(Weak::upgrade)
    }

    async fn wait_until(&self, done: impl Fn() -> bool) {
        let waited = timeout(WAIT_LIMIT, async {
            loop {
                let notified = self.progress.notified();
                if done() {
                    return;
                }
                notified.await;
            }
        })
        .await;
        assert!(waited.is_ok(), "dispatcher made no progress within {WAIT_LIMIT:?}");
    }
}

#[async_trait]
impl PacketDispatcher<TestPacket> for RecordingDispatcher {
    async fn dispatch(
        &self,
        packet: TestPacket,
        returner: Option<PacketReturner<TestPacket>>,
    ) -> Result<(), DispatchError> {
        lock(&self.started).push(packet.clone());
        self.progress.notify_waiters();

        let hold = lock(&self.holds).get(&packet.label).cloned();
        if let Some(hold) = hold {
            hold.acquire().await?.forget();
        }

        let refused = lock(&self.failing).contains(&packet.label);
        let outcome = if refused {
            Err(io::Error::other(format!("refused {}", packet.label)).into())
        } else {
            if let Some(returner) = returner {
                let sent = returner.send(packet.reply()).await;
                lock(&self.replies).push(sent);
            }
            Ok(())
        };

        lock(&self.completed).push(packet.label);
        self.progress.notify_waiters();
        outcome
    }

    fn set_listener(&self, listener: Weak<dyn RegistrationListener>) { *lock(&self.listener) = Some(listener); }
}
