//! The seam between a [`Session`](crate::Session) and the network.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use ws_core::{Destination, Origin, Result, WsError};

use crate::frame::Frame;

/// Write half of an established connection.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = WsError> + Send>>;

/// Read half of an established connection, yielding frames in arrival order.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

/// Establishes websocket connections.
///
/// Implementations own the handshake, framing, masking, ping/pong and TLS;
/// the session only sees frames.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Performs the handshake, sending `origin` as the `Origin` header.
    ///
    /// Fails with [`WsError::Connection`] for DNS, network and handshake
    /// failures.
    async fn connect(&self, destination: &Destination, origin: &Origin)
    -> Result<(FrameSink, FrameStream)>;
}
