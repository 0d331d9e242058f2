//! Prompt-driven loop: every submitted line becomes one text frame.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};
use ws_core::{Result, WsError};
use ws_session::{Session, SessionEvent};

use crate::LoopExit;
use crate::console::Console;
use crate::line_reader::{LineFeed, ReadOutcome};

/// Prompt shown while waiting for a line.
pub const PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingLine,
    Sending,
    Closed,
}

/// Reads lines from a [`LineFeed`] and sends them, printing inbound frames
/// as they arrive.
///
/// Sending never waits for a response; the prompt comes back immediately.
pub struct InteractiveLoop {
    session: Session,
    console: Arc<dyn Console>,
    state: LoopState,
}

impl InteractiveLoop {
    pub fn new(session: Session, console: Arc<dyn Console>) -> Self {
        Self {
            session,
            console,
            state: LoopState::AwaitingLine,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs until end of input, an interrupt, a server close or a transport
    /// error. The session is closed on every path.
    pub async fn run(mut self, mut feed: LineFeed) -> Result<LoopExit> {
        let mut events = self
            .session
            .take_events()
            .ok_or_else(|| WsError::internal("session events already taken"))?;

        let result = self.drive(&mut feed, &mut events).await;

        self.state = LoopState::Closed;
        self.session.close().await;
        debug!(?result, "interactive loop closed");
        result
    }

    async fn drive(
        &mut self,
        feed: &mut LineFeed,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Result<LoopExit> {
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => {
                        if let Some(exit) = self.on_event(event)? {
                            return Ok(exit);
                        }
                    }
                    None => return Ok(LoopExit::ServerClosed),
                },
                outcome = feed.next() => match outcome {
                    Some(Ok(ReadOutcome::Line(line))) => self.submit(line)?,
                    Some(Ok(ReadOutcome::Eof)) | None => return Ok(LoopExit::EndOfInput),
                    Some(Ok(ReadOutcome::Interrupted)) => return Ok(LoopExit::Interrupted),
                    Some(Err(err)) => return Err(err),
                },
            }
        }
    }

    fn submit(&mut self, line: String) -> Result<()> {
        self.state = LoopState::Sending;
        trace!(len = line.len(), "sending line");
        self.session.send(line)?;
        self.state = LoopState::AwaitingLine;
        Ok(())
    }

    fn on_event(&self, event: SessionEvent) -> Result<Option<LoopExit>> {
        match event {
            SessionEvent::Connected => {
                self.console
                    .status(&format!("Connected to {}", self.session.destination()));
                Ok(None)
            }
            SessionEvent::Message(frame) => {
                self.console.received(&format!("< {frame}"));
                Ok(None)
            }
            SessionEvent::Error(err) => Err(err),
            SessionEvent::Closed(reason) => {
                let message = match reason {
                    Some(reason) => format!("Connection closed: {reason}"),
                    None => "Connection closed".to_string(),
                };
                self.console.status(&message);
                Ok(Some(LoopExit::ServerClosed))
            }
        }
    }
}
