//! Non-interactive loop: forwards every line of an input stream.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use ws_core::{DEFAULT_REPLY_DRAIN, Result, WsError};
use ws_session::{Frame, Session, SessionEvent};

use crate::LoopExit;
use crate::console::Console;

/// Streams lines from `input` to the session once it is connected.
///
/// Output per line: `Got stdin: <line>` before sending, then
/// `Got response: <frame>` when a reply is matched to it. Inbound frames no
/// send claimed print as `Received message: <frame>`.
pub struct StreamingLoop<I> {
    session: Session,
    console: Arc<dyn Console>,
    input: I,
    reply_drain: Duration,
}

impl<I> StreamingLoop<I>
where
    I: AsyncBufRead + Unpin,
{
    pub fn new(session: Session, console: Arc<dyn Console>, input: I) -> Self {
        Self {
            session,
            console,
            input,
            reply_drain: DEFAULT_REPLY_DRAIN,
        }
    }

    /// How long to keep waiting for replies after the input ends.
    pub fn with_reply_drain(mut self, reply_drain: Duration) -> Self {
        self.reply_drain = reply_drain;
        self
    }

    pub async fn run(self) -> Result<LoopExit> {
        let Self {
            mut session,
            console,
            input,
            reply_drain,
        } = self;

        console.plain("Reading from stdin:");
        let mut events = session
            .take_events()
            .ok_or_else(|| WsError::internal("session events already taken"))?;

        // Nothing is sent before the handshake completes.
        session.wait_connected().await?;

        let result = pump(&session, console.as_ref(), input, &mut events, reply_drain).await;
        session.close().await;
        debug!(?result, "streaming loop finished");
        result
    }
}

async fn pump<I>(
    session: &Session,
    console: &dyn Console,
    input: I,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    reply_drain: Duration,
) -> Result<LoopExit>
where
    I: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut replies: FuturesUnordered<oneshot::Receiver<Frame>> = FuturesUnordered::new();

    loop {
        tokio::select! {
            biased;
            event = events.recv() => {
                if let Some(exit) = on_event(console, event)? {
                    return Ok(exit);
                }
            }
            Some(reply) = replies.next(), if !replies.is_empty() => on_reply(console, reply),
            line = lines.next_line() => match line? {
                Some(line) => {
                    console.plain(&format!("Got stdin: {line}"));
                    replies.push(session.send_with_reply(line)?);
                }
                None => break,
            },
        }
    }

    debug!(outstanding = replies.len(), "input exhausted, draining replies");
    let drain = tokio::time::sleep(reply_drain);
    tokio::pin!(drain);

    while !replies.is_empty() {
        tokio::select! {
            biased;
            event = events.recv() => {
                if let Some(exit) = on_event(console, event)? {
                    return Ok(exit);
                }
            }
            Some(reply) = replies.next() => on_reply(console, reply),
            () = &mut drain => {
                debug!(outstanding = replies.len(), "reply drain window elapsed");
                break;
            }
        }
    }

    Ok(LoopExit::EndOfInput)
}

fn on_event(console: &dyn Console, event: Option<SessionEvent>) -> Result<Option<LoopExit>> {
    match event {
        Some(SessionEvent::Connected) => {
            console.status("Connected");
            Ok(None)
        }
        Some(SessionEvent::Message(frame)) => {
            console.received(&format!("Received message: {frame}"));
            Ok(None)
        }
        Some(SessionEvent::Error(err)) => Err(err),
        Some(SessionEvent::Closed(reason)) => {
            match reason {
                Some(reason) => console.status(&format!("Connection closed: {reason}")),
                None => console.status("Connection closed"),
            }
            Ok(Some(LoopExit::ServerClosed))
        }
        None => Ok(Some(LoopExit::ServerClosed)),
    }
}

fn on_reply(console: &dyn Console, reply: std::result::Result<Frame, oneshot::error::RecvError>) {
    match reply {
        Ok(frame) => console.received(&format!("Got response: {frame}")),
        Err(_) => debug!("reply slot dropped before a frame arrived"),
    }
}
