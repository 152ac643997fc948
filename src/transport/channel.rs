//! Transport-neutral duplex channel.
//!
//! A [`Channel`] is the session's view of one live connection: a queue of
//! [`Outgoing`] items and a stream of [`ChannelEvent`]s. The other side, a
//! [`ChannelPeer`], is driven by whatever owns the socket: the WebSocket
//! event loop in production, a test harness otherwise.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;

// ============================================================================
// Constants
// ============================================================================

/// Close code for a policy violation; the controller uses it to reject
/// authentication.
pub const CLOSE_AUTH_REJECTED: u16 = 1008;

/// Close code reported when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close code reported when a close frame carried no status.
pub const CLOSE_NO_STATUS: u16 = 1005;

// ============================================================================
// CloseInfo
// ============================================================================

/// Why a channel closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Creates a close description.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close without a close frame (1006).
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    /// Returns `true` if the controller rejected our credentials.
    #[inline]
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        self.code == CLOSE_AUTH_REJECTED
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.reason)
        }
    }
}

// ============================================================================
// Events and Outgoing Items
// ============================================================================

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A text frame arrived.
    Message(String),
    /// A transport error; a [`ChannelEvent::Closed`] always follows.
    Error(String),
    /// The connection is gone.
    Closed(CloseInfo),
}

/// Something to put on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// A text frame.
    Text(String),
    /// Close the connection normally.
    Close,
}

// ============================================================================
// Channel
// ============================================================================

/// The session side of one live connection.
#[derive(Debug)]
pub struct Channel {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// The socket side of one live connection.
#[derive(Debug)]
pub struct ChannelPeer {
    /// Items the session wants written.
    pub outgoing: mpsc::UnboundedReceiver<Outgoing>,
    /// Events to report to the session.
    pub events: mpsc::UnboundedSender<ChannelEvent>,
}

impl Channel {
    /// Creates a connected channel/peer pair.
    #[must_use]
    pub fn pair() -> (Self, ChannelPeer) {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        (
            Self {
                outgoing: outgoing_tx,
                events: events_rx,
            },
            ChannelPeer {
                outgoing: outgoing_rx,
                events: events_tx,
            },
        )
    }

    /// Splits into the writer handle and the event stream.
    #[must_use]
    pub fn split(self) -> (mpsc::UnboundedSender<Outgoing>, mpsc::UnboundedReceiver<ChannelEvent>) {
        (self.outgoing, self.events)
    }
}

impl ChannelPeer {
    /// Reports an inbound text frame.
    ///
    /// Returns `false` once the session side is gone.
    #[inline]
    pub fn deliver(&self, text: impl Into<String>) -> bool {
        self.events.send(ChannelEvent::Message(text.into())).is_ok()
    }

    /// Reports that the connection closed.
    #[inline]
    pub fn close(&self, info: CloseInfo) -> bool {
        self.events.send(ChannelEvent::Closed(info)).is_ok()
    }

    /// Waits for the next text frame the session wrote.
    ///
    /// Returns `None` on [`Outgoing::Close`] or when the session side is gone.
    pub async fn next_text(&mut self) -> Option<String> {
        match self.outgoing.recv().await? {
            Outgoing::Text(text) => Some(text),
            Outgoing::Close => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_info_display() {
        assert_eq!(CloseInfo::new(1000, "").to_string(), "1000");
        assert_eq!(
            CloseInfo::new(CLOSE_AUTH_REJECTED, "bad token").to_string(),
            "1008: bad token"
        );
    }

    #[test]
    fn test_auth_rejection() {
        assert!(CloseInfo::new(1008, "").is_auth_rejection());
        assert!(!CloseInfo::abnormal("reset").is_auth_rejection());
    }

    #[tokio::test]
    async fn test_pair_wiring() {
        let (channel, mut peer) = Channel::pair();
        let (writer, mut events) = channel.split();

        writer.send(Outgoing::Text("hello".into())).expect("send");
        assert_eq!(peer.next_text().await.as_deref(), Some("hello"));

        assert!(peer.deliver("world"));
        assert_eq!(events.recv().await, Some(ChannelEvent::Message("world".into())));

        writer.send(Outgoing::Close).expect("close");
        assert_eq!(peer.next_text().await, None);
    }

    #[tokio::test]
    async fn test_peer_notices_dropped_session() {
        let (channel, peer) = Channel::pair();
        drop(channel);
        assert!(!peer.deliver("late"));
    }
}
