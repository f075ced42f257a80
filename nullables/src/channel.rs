//! Nullable channel. Records frames without sending them.

use tidal_types::{ChainId, ChannelError, MessageChannel, MessageId};

/// A test channel that records frames instead of delivering them.
///
/// Tests pull the recorded frames and deliver them by hand, as many times as
/// they like, to simulate at-least-once transport.
#[derive(Default)]
pub struct NullChannel {
    sent: Vec<(ChainId, Vec<u8>)>,
    failing: bool,
}

impl NullChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail with [`ChannelError::Closed`].
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// All frames "sent" so far (for assertions).
    pub fn sent(&self) -> &[(ChainId, Vec<u8>)] {
        &self.sent
    }

    /// The most recent frame, if any.
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.sent.last().map(|(_, frame)| frame.as_slice())
    }

    /// Drain recorded frames.
    pub fn take_sent(&mut self) -> Vec<(ChainId, Vec<u8>)> {
        std::mem::take(&mut self.sent)
    }

    /// Clear all state.
    pub fn reset(&mut self) {
        self.sent.clear();
        self.failing = false;
    }
}

impl MessageChannel for NullChannel {
    fn send(&mut self, dest: ChainId, frame: Vec<u8>) -> Result<MessageId, ChannelError> {
        if self.failing {
            return Err(ChannelError::Closed);
        }
        let id = MessageId::digest(&frame);
        self.sent.push((dest, frame));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_frames_and_returns_digest() {
        let mut channel = NullChannel::new();
        let id = channel.send(ChainId::new(2), vec![1, 2, 3]).unwrap();
        assert_eq!(id, MessageId::digest(&[1, 2, 3]));
        assert_eq!(channel.sent().len(), 1);
        assert_eq!(channel.last_frame(), Some(&[1u8, 2, 3][..]));
        assert_eq!(channel.take_sent().len(), 1);
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn failing_channel_records_nothing() {
        let mut channel = NullChannel::new();
        channel.set_failing(true);
        assert_eq!(channel.send(ChainId::new(2), vec![9]), Err(ChannelError::Closed));
        assert!(channel.sent().is_empty());
    }
}
