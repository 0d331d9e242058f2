//! In-process [`Connector`] for driving sessions without a network.
//!
//! Used by the loop tests in this workspace; it behaves like a server that
//! either echoes, refuses the handshake, or is scripted through a
//! [`MemoryPeer`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use ws_core::{Destination, Origin, Result, WsError};

use crate::frame::Frame;
use crate::transport::{Connector, FrameSink, FrameStream};

type PeerEnds = (
    mpsc::UnboundedSender<Frame>,
    mpsc::UnboundedReceiver<Result<Frame>>,
);

enum Mode {
    Echo { delay: Duration },
    Refuse { reason: String },
    Peer(Mutex<Option<PeerEnds>>),
}

pub struct MemoryConnector {
    mode: Mode,
    origins: Arc<Mutex<Vec<String>>>,
}

impl MemoryConnector {
    /// A server that sends every text or binary frame straight back.
    pub fn echo() -> Self {
        Self::echo_after(Duration::ZERO)
    }

    /// Like [`echo`](Self::echo), but each reply is held back for `delay`.
    pub fn echo_after(delay: Duration) -> Self {
        Self::with_mode(Mode::Echo { delay })
    }

    /// A server whose handshake always fails with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self::with_mode(Mode::Refuse {
            reason: reason.into(),
        })
    }

    /// A server controlled by the returned [`MemoryPeer`]. Accepts one
    /// connection.
    pub fn scripted() -> (Self, MemoryPeer) {
        let (sent_tx, sent_rx) = mpsc::unbounded();
        let (deliver_tx, deliver_rx) = mpsc::unbounded();
        let connector = Self::with_mode(Mode::Peer(Mutex::new(Some((sent_tx, deliver_rx)))));
        let peer = MemoryPeer {
            sent: sent_rx,
            deliver: deliver_tx,
        };
        (connector, peer)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            origins: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Origin headers seen by every handshake so far.
    pub fn origins(&self) -> Vec<String> {
        self.origins
            .lock()
            .map(|origins| origins.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        _destination: &Destination,
        origin: &Origin,
    ) -> Result<(FrameSink, FrameStream)> {
        if let Ok(mut origins) = self.origins.lock() {
            origins.push(origin.as_str().to_string());
        }

        let (sent_tx, deliver_rx) = match &self.mode {
            Mode::Refuse { reason } => return Err(WsError::connection(reason.clone())),
            Mode::Echo { delay } => spawn_echo(*delay),
            Mode::Peer(ends) => ends
                .lock()
                .ok()
                .and_then(|mut ends| ends.take())
                .ok_or_else(|| WsError::connection("memory peer already connected"))?,
        };

        let sink = sent_tx.sink_map_err(|e| WsError::connection(e.to_string()));
        Ok((Box::pin(sink), Box::pin(deliver_rx)))
    }
}

fn spawn_echo(delay: Duration) -> PeerEnds {
    let (sent_tx, mut sent_rx) = mpsc::unbounded::<Frame>();
    let (deliver_tx, deliver_rx) = mpsc::unbounded();

    tokio::spawn(async move {
        while let Some(frame) = sent_rx.next().await {
            if frame.is_close() {
                let _ = deliver_tx.unbounded_send(Ok(Frame::Close(None)));
                break;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if deliver_tx.unbounded_send(Ok(frame)).is_err() {
                break;
            }
        }
    });

    (sent_tx, deliver_rx)
}

/// Server side of a [`MemoryConnector::scripted`] connection.
pub struct MemoryPeer {
    sent: mpsc::UnboundedReceiver<Frame>,
    deliver: mpsc::UnboundedSender<Result<Frame>>,
}

impl MemoryPeer {
    /// Next frame the client sent, `None` once the client hung up.
    pub async fn next_sent(&mut self) -> Option<Frame> {
        self.sent.next().await
    }

    /// Frames the client has sent and that are already buffered.
    pub fn drain_sent(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.sent.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub fn push(&self, frame: Frame) {
        let _ = self.deliver.unbounded_send(Ok(frame));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Frame::text(text));
    }

    /// Breaks the connection with a transport error.
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.deliver.unbounded_send(Err(WsError::connection(reason)));
    }
}
