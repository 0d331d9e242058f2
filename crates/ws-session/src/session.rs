//! One websocket connection and its lifecycle.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use ws_core::{Destination, Origin, Result, WsError};

use crate::frame::Frame;
use crate::transport::{Connector, FrameSink};

/// How long [`Session::close`] waits for the close handshake before
/// dropping the connection.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Connection state as observed by the session's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress.
    Pending,
    Connected,
    /// Closed by either side after a successful handshake.
    Closed,
    /// The handshake failed or the transport broke.
    Errored { reason: String },
}

/// Lifecycle notifications, queued in the order they happened.
#[derive(Debug)]
pub enum SessionEvent {
    /// The handshake completed. Queued at most once.
    Connected,
    /// An inbound frame that no reply slot claimed.
    Message(Frame),
    /// Unrecoverable transport failure. Always the last event.
    Error(WsError),
    /// The server closed the connection or the stream ended. Always the last
    /// event.
    Closed(Option<String>),
}

enum Outbound {
    Frame {
        frame: Frame,
        reply: Option<oneshot::Sender<Frame>>,
    },
    Close,
}

/// Owns exactly one websocket connection.
///
/// The connection runs on a background task. Sends are queued and never wait
/// for the network; inbound frames and lifecycle changes arrive through the
/// queue returned by [`take_events`](Self::take_events). Dropping the
/// session tears the connection down.
pub struct Session {
    destination: Destination,
    origin: Origin,
    outbound: mpsc::UnboundedSender<Outbound>,
    state: watch::Receiver<SessionState>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    driver: Option<JoinHandle<()>>,
}

impl Session {
    /// Starts connecting in the background and returns immediately in
    /// [`SessionState::Pending`].
    pub fn dial(connector: Arc<dyn Connector>, destination: Destination, origin: Origin) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Pending);

        let driver = Driver {
            outbound: outbound_rx,
            events: events_tx,
            state: state_tx,
            pending_replies: VecDeque::new(),
        };
        let handle = tokio::spawn(driver.run(connector, destination.clone(), origin.clone()));

        Self {
            destination,
            origin,
            outbound: outbound_tx,
            state: state_rx,
            events: Some(events_rx),
            driver: Some(handle),
        }
    }

    /// Connects and waits for the handshake to complete.
    pub async fn open(
        connector: Arc<dyn Connector>,
        destination: Destination,
        origin: Origin,
    ) -> Result<Self> {
        let session = Self::dial(connector, destination, origin);
        session.wait_connected().await?;
        Ok(session)
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Resolves once the handshake has completed.
    ///
    /// Fails with [`WsError::Connection`] when the handshake failed. There
    /// is no timeout: a handshake that never finishes keeps this pending.
    pub async fn wait_connected(&self) -> Result<()> {
        let mut state = self.state.clone();
        let observed = match state
            .wait_for(|state| !matches!(state, SessionState::Pending))
            .await
        {
            Ok(observed) => observed.clone(),
            Err(_) => return Err(WsError::connection("connection task ended")),
        };

        match observed {
            SessionState::Connected | SessionState::Closed => Ok(()),
            SessionState::Errored { reason } => Err(WsError::connection(reason)),
            SessionState::Pending => Err(WsError::internal("session still pending")),
        }
    }

    /// Hands out the event queue. Only the first call returns `Some`.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    /// Queues one text frame.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.enqueue(Frame::Text(text.into()), None)
    }

    /// Queues one binary frame.
    pub fn send_binary(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.enqueue(Frame::Binary(bytes.into()), None)
    }

    /// Queues one text frame and returns a slot that receives the next
    /// inbound frame not claimed by an earlier slot.
    ///
    /// Correlation is first-come first-served; nothing ties the frame to
    /// this particular message. The slot is dropped unfilled if the
    /// connection ends first.
    pub fn send_with_reply(&self, text: impl Into<String>) -> Result<oneshot::Receiver<Frame>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(Frame::Text(text.into()), Some(reply_tx))?;
        Ok(reply_rx)
    }

    fn enqueue(&self, frame: Frame, reply: Option<oneshot::Sender<Frame>>) -> Result<()> {
        self.outbound
            .send(Outbound::Frame { frame, reply })
            .map_err(|_| WsError::connection("session is closed"))
    }

    /// Sends a close frame and waits for the connection task to finish.
    pub async fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        if tokio::time::timeout(CLOSE_GRACE, &mut driver).await.is_err() {
            warn!(url = %self.destination, "close handshake timed out, dropping connection");
            driver.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Background half of a session: owns the socket.
struct Driver {
    outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Sender<SessionState>,
    pending_replies: VecDeque<oneshot::Sender<Frame>>,
}

impl Driver {
    async fn run(mut self, connector: Arc<dyn Connector>, destination: Destination, origin: Origin) {
        let (mut sink, mut stream) = match connector.connect(&destination, &origin).await {
            Ok(halves) => halves,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        debug!(url = %destination, "session connected");
        // Event before state: whoever wakes on the state finds the event queued.
        let _ = self.events.send(SessionEvent::Connected);
        self.state.send_replace(SessionState::Connected);

        loop {
            tokio::select! {
                command = self.outbound.recv() => match command {
                    Some(Outbound::Frame { frame, reply }) => {
                        trace!(?frame, "sending frame");
                        if let Some(reply) = reply {
                            self.pending_replies.push_back(reply);
                        }
                        if let Err(err) = sink.send(frame).await {
                            self.fail(err);
                            return;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!(url = %destination, "closing session");
                        let _ = sink.send(Frame::Close(None)).await;
                        shutdown(&mut sink).await;
                        self.finish(None);
                        return;
                    }
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Frame::Close(reason))) => {
                        debug!(url = %destination, ?reason, "server closed the connection");
                        shutdown(&mut sink).await;
                        self.finish(reason);
                        return;
                    }
                    Some(Ok(frame)) => {
                        trace!(?frame, "received frame");
                        self.deliver(frame);
                    }
                    Some(Err(err)) => {
                        self.fail(err);
                        return;
                    }
                    None => {
                        debug!(url = %destination, "connection stream ended");
                        self.finish(None);
                        return;
                    }
                },
            }
        }
    }

    fn deliver(&mut self, mut frame: Frame) {
        while let Some(reply) = self.pending_replies.pop_front() {
            match reply.send(frame) {
                Ok(()) => return,
                // Nobody is waiting on that slot any more; try the next one.
                Err(unclaimed) => frame = unclaimed,
            }
        }
        let _ = self.events.send(SessionEvent::Message(frame));
    }

    fn fail(&mut self, err: WsError) {
        warn!(error = %err, "session failed");
        let reason = match &err {
            WsError::Connection { reason } => reason.clone(),
            other => other.to_string(),
        };
        let _ = self.events.send(SessionEvent::Error(err));
        self.state.send_replace(SessionState::Errored { reason });
    }

    fn finish(&mut self, reason: Option<String>) {
        self.pending_replies.clear();
        let _ = self.events.send(SessionEvent::Closed(reason));
        self.state.send_replace(SessionState::Closed);
    }
}

async fn shutdown(sink: &mut FrameSink) {
    if let Err(err) = sink.close().await {
        trace!(error = %err, "ignoring error while closing sink");
    }
}
