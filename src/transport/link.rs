//! Shared handle to whichever channel is currently open.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::protocol::OutboundFrame;

use super::Outgoing;

// ============================================================================
// ChannelLink
// ============================================================================

/// Writer slot for the live channel.
///
/// The session attaches the writer when a channel opens and detaches it when
/// the channel closes; the dispatcher and keepalive send through the link
/// without knowing which channel, if any, is live. Sending while detached is
/// a no-op.
#[derive(Clone, Default)]
pub struct ChannelLink {
    slot: Arc<Mutex<Option<mpsc::UnboundedSender<Outgoing>>>>,
}

impl fmt::Debug for ChannelLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelLink")
            .field("open", &self.is_open())
            .finish()
    }
}

impl ChannelLink {
    /// Creates a detached link.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `writer` the live channel.
    pub fn attach(&self, writer: mpsc::UnboundedSender<Outgoing>) {
        *self.slot.lock() = Some(writer);
    }

    /// Clears the live channel, returning its writer.
    pub(crate) fn detach(&self) -> Option<mpsc::UnboundedSender<Outgoing>> {
        self.slot.lock().take()
    }

    /// Returns `true` if a channel is attached and still accepting frames.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|writer| !writer.is_closed())
    }

    /// Sends `frame` on the live channel.
    ///
    /// Returns `true` if the frame was queued.
    pub fn send(&self, frame: &OutboundFrame) -> bool {
        match self.try_send(frame) {
            Ok(()) => true,
            Err(Error::ConnectionClosed) => {
                trace!("No open channel, frame dropped");
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to send outbound frame");
                false
            }
        }
    }

    /// Sends `frame` on the live channel.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame cannot be encoded
    /// - [`Error::ConnectionClosed`] if no channel is open
    pub fn try_send(&self, frame: &OutboundFrame) -> Result<()> {
        let text = frame.to_text()?;

        let guard = self.slot.lock();
        let writer = guard.as_ref().ok_or(Error::ConnectionClosed)?;
        writer
            .send(Outgoing::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::Channel;

    #[test]
    fn test_detached_send_is_noop() {
        let link = ChannelLink::new();
        assert!(!link.is_open());
        assert!(!link.send(&OutboundFrame::Ping));
    }

    #[tokio::test]
    async fn test_attached_send() {
        let link = ChannelLink::new();
        let (channel, mut peer) = Channel::pair();
        let (writer, _events) = channel.split();

        link.attach(writer);
        assert!(link.is_open());
        assert!(link.send(&OutboundFrame::Ping));
        assert_eq!(peer.next_text().await.as_deref(), Some(r#"{"type":"ping"}"#));

        assert!(link.detach().is_some());
        assert!(!link.is_open());
    }

    #[test]
    fn test_closed_peer_reads_as_not_open() {
        let link = ChannelLink::new();
        let (channel, peer) = Channel::pair();
        let (writer, _events) = channel.split();
        link.attach(writer);

        drop(peer);
        assert!(!link.is_open());
        assert!(!link.send(&OutboundFrame::Ping));
        assert!(matches!(
            link.try_send(&OutboundFrame::Ping),
            Err(Error::ConnectionClosed)
        ));
    }
}
