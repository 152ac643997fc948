//! WebSocket connector and event loop.
//!
//! [`WebSocketConnector`] dials the controller and, once the handshake
//! succeeds, spawns a tokio task that bridges the socket to a
//! [`Channel`].
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - Incoming text frames → [`ChannelEvent::Message`]
//! - Close frames, stream end, socket errors → [`ChannelEvent::Closed`]
//! - Outgoing text from the session → socket writes
//! - [`Outgoing::Close`] or a dropped session → graceful close

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::channel::{CLOSE_NO_STATUS, ChannelPeer, CloseInfo};
use super::{Channel, ChannelEvent, Outgoing};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the TCP connect plus WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Connector
// ============================================================================

/// Opens channels to the controller.
///
/// The session calls this once per connect attempt. Returning `Ok` means the
/// handshake completed and the channel is open.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connects to `url` (token already included).
    ///
    /// # Errors
    ///
    /// Any error is treated as a handshake failure.
    async fn connect(&self, url: &Url) -> Result<Channel>;
}

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    handshake_timeout: Duration,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketConnector {
    /// Creates a connector with the default handshake timeout.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub const fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    /// Event loop bridging the socket and the session.
    async fn run_event_loop(ws_stream: WsStream, mut peer: ChannelPeer) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let close = loop {
            tokio::select! {
                // Incoming frames from the controller
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            if !peer.deliver(text.as_str()) {
                                debug!("Session gone, closing socket");
                                let _ = ws_write.close().await;
                                return;
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            break close_info(frame);
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            let _ = peer.events.send(ChannelEvent::Error(e.to_string()));
                            break CloseInfo::abnormal(e.to_string());
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break CloseInfo::abnormal("stream ended");
                        }

                        // Ignore Binary, Ping, Pong, Frame
                        _ => {}
                    }
                }

                // Frames from the session
                outgoing = peer.outgoing.recv() => {
                    match outgoing {
                        Some(Outgoing::Text(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(error = %e, "Failed to send frame");
                                let _ = peer.events.send(ChannelEvent::Error(e.to_string()));
                                break CloseInfo::abnormal(e.to_string());
                            }
                        }

                        Some(Outgoing::Close) | None => {
                            debug!("Local close requested");
                            let _ = ws_write.close().await;
                            return;
                        }
                    }
                }
            }
        };

        peer.close(close);
        debug!("Event loop terminated");
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<Channel> {
        let (ws_stream, response) =
            match timeout(self.handshake_timeout, tokio_tungstenite::connect_async(url.as_str())).await {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => return Err(Error::handshake(e.to_string())),
                Err(_) => {
                    return Err(Error::connection_timeout(
                        self.handshake_timeout.as_millis() as u64,
                    ));
                }
            };

        info!(
            host = url.host_str().unwrap_or_default(),
            status = %response.status(),
            "WebSocket connection established"
        );

        let (channel, peer) = Channel::pair();
        tokio::spawn(Self::run_event_loop(ws_stream, peer));

        Ok(channel)
    }
}

/// Converts a received close frame into a [`CloseInfo`].
fn close_info(frame: Option<CloseFrame>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::new(u16::from(frame.code), frame.reason.as_str()),
        None => CloseInfo::new(CLOSE_NO_STATUS, ""),
    }
}

// ============================================================================
// Tests
// ============================================================================
