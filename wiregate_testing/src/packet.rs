use wiregate::{ChannelId, Packet};

/// Minimal packet carrying a label for assertions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestPacket {
    pub channel: ChannelId,
    pub reply_to: Option<u64>,
    pub label: String,
}

impl TestPacket {
    /// Packet on `channel` that expects no reply.
    pub fn new(channel: u64, label: impl Into<String>) -> Self {
        Self {
            channel: ChannelId::new(channel),
            reply_to: None,
            label: label.into(),
        }
    }

    /// Mark the packet as expecting a reply delivered to `target`.
    #[must_use]
    pub fn expecting_reply(mut self, target: u64) -> Self {
        self.reply_to = Some(target);
        self
    }

    /// Reply to this packet, on the same channel, labelled `re:<label>`.
    #[must_use]
    pub fn reply(&self) -> Self { Self::new(self.channel.as_u64(), format!("re:{}", self.label)) }
}

impl Packet for TestPacket {
    fn channel_id(&self) -> ChannelId { self.channel }

    fn response_target_id(&self) -> Option<u64> { self.reply_to }
}
