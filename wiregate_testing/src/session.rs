use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use wiregate::{PacketWriter, Session, SessionAttributes, SessionId};

use crate::packet::TestPacket;

/// In-memory [`Session`] whose write backlog is set by the test.
///
/// Writes are recorded rather than transmitted. Reads are never delivered;
/// the suspend and resume calls only flip a flag and bump counters.
pub struct MockSession<P = TestPacket> {
    id: SessionId,
    remote: String,
    scheduled: AtomicU64,
    suspended: AtomicBool,
    suspends: AtomicUsize,
    resumes: AtomicUsize,
    closed: AtomicBool,
    written: Mutex<Vec<P>>,
    attributes: SessionAttributes,
}

impl<P> MockSession<P> {
    /// Session `id` with an empty backlog.
    pub fn new(id: u64) -> Arc<Self> { Self::with_backlog(id, 0) }

    /// Session `id` with `bytes` already scheduled for writing.
    pub fn with_backlog(id: u64, bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(id),
            remote: format!("10.0.0.{id}:61616"),
            scheduled: AtomicU64::new(bytes),
            suspended: AtomicBool::new(false),
            suspends: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            written: Mutex::new(Vec::new()),
            attributes: SessionAttributes::default(),
        })
    }

    /// Set the number of bytes reported as scheduled but unsent.
    pub fn set_scheduled_bytes(&self, bytes: u64) { self.scheduled.store(bytes, Ordering::SeqCst); }

    /// Times inbound reads were suspended.
    pub fn suspend_count(&self) -> usize { self.suspends.load(Ordering::SeqCst) }

    /// Times inbound reads were resumed.
    pub fn resume_count(&self) -> usize { self.resumes.load(Ordering::SeqCst) }

    /// Whether the handler closed this session.
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }
}

impl<P: Clone> MockSession<P> {
    /// Packets written so far, in write order.
    pub fn written(&self) -> Vec<P> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<P: Send + 'static> Session for MockSession<P> {
    fn id(&self) -> SessionId { self.id }

    fn remote_address(&self) -> String { self.remote.clone() }

    fn scheduled_write_bytes(&self) -> u64 { self.scheduled.load(Ordering::SeqCst) }

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

impl<P: Send + 'static> PacketWriter<P> for MockSession<P> {
    fn write(&self, packet: P) {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet);
    }
}
