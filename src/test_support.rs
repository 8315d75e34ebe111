//! In-crate session and packet doubles for unit tests.

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use crate::{
    attributes::SessionAttributes,
    packet::{ChannelId, Packet},
    session::{PacketWriter, Session, SessionId},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) channel: ChannelId,
    pub(crate) reply_to: Option<u64>,
    pub(crate) body: &'static str,
}

impl Frame {
    pub(crate) fn new(channel: u64, body: &'static str) -> Self {
        Self {
            channel: ChannelId::new(channel),
            reply_to: None,
            body,
        }
    }

    pub(crate) fn expecting_reply(mut self, target: u64) -> Self {
        self.reply_to = Some(target);
        self
    }
}

impl Packet for Frame {
    fn channel_id(&self) -> ChannelId { self.channel }

    fn response_target_id(&self) -> Option<u64> { self.reply_to }
}

#[derive(Default)]
pub(crate) struct StubSession {
    pub(crate) bytes: AtomicU64,
    pub(crate) suspended: AtomicBool,
    pub(crate) suspends: AtomicUsize,
    pub(crate) resumes: AtomicUsize,
    pub(crate) closed: AtomicBool,
    pub(crate) written: Mutex<Vec<Frame>>,
    attributes: SessionAttributes,
}

impl StubSession {
    pub(crate) fn with_backlog(bytes: u64) -> Arc<Self> {
        let session = Self::default();
        session.bytes.store(bytes, Ordering::SeqCst);
        Arc::new(session)
    }

    pub(crate) fn set_backlog(&self, bytes: u64) { self.bytes.store(bytes, Ordering::SeqCst); }

    pub(crate) fn written(&self) -> Vec<Frame> {
        self.written.lock().expect("written lock poisoned").clone()
    }
}

impl Session for StubSession {
    fn id(&self) -> SessionId { SessionId::new(1) }

    fn remote_address(&self) -> String { "127.0.0.1:5445".to_owned() }

    fn scheduled_write_bytes(&self) -> u64 { self.bytes.load(Ordering::SeqCst) }

    fn suspend_read(&self) {
        self.suspends.fetch_add(1, Ordering::SeqCst);
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn resume_read(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.suspended.store(false, Ordering::SeqCst);
    }

    fn is_read_suspended(&self) -> bool { self.suspended.load(Ordering::SeqCst) }

    fn close(&self) { self.closed.store(true, Ordering::SeqCst); }

    fn attributes(&self) -> &SessionAttributes { &self.attributes }
}

impl PacketWriter<Frame> for StubSession {
    fn write(&self, packet: Frame) {
        self.written
            .lock()
            .expect("written lock poisoned")
            .push(packet);
    }
}
