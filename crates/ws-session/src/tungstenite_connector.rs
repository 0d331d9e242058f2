//! [`Connector`] backed by `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as TungsteniteError, Message};
use tracing::debug;
use ws_core::{Destination, Origin, Result, WsError};

use crate::frame::Frame;
use crate::transport::{Connector, FrameSink, FrameStream};

/// Connects over TCP, or TLS for `wss://`, using tokio-tungstenite.
#[derive(Debug, Default, Clone)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        // Already installed when another connector was built first.
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(
        &self,
        destination: &Destination,
        origin: &Origin,
    ) -> Result<(FrameSink, FrameStream)> {
        let mut request = destination
            .as_str()
            .into_client_request()
            .map_err(transport_error)?;
        let origin_value = HeaderValue::from_str(origin.as_str())
            .map_err(|e| WsError::connection(format!("invalid origin header: {e}")))?;
        request.headers_mut().insert(ORIGIN, origin_value);

        debug!(url = %destination, origin = %origin, "starting websocket handshake");
        let (socket, response) = connect_async(request).await.map_err(transport_error)?;
        debug!(status = %response.status(), "websocket handshake completed");

        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(transport_error)
            .with(|frame: Frame| future::ready(Ok::<_, WsError>(into_message(frame))));

        let stream = stream.filter_map(|item| {
            future::ready(match item {
                Ok(message) => from_message(message).map(Ok),
                Err(err) => Some(Err(transport_error(err))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

fn transport_error(err: TungsteniteError) -> WsError {
    WsError::connection(err.to_string())
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::text(text),
        Frame::Binary(bytes) => Message::binary(bytes),
        Frame::Close(reason) => Message::Close(reason.map(|reason| CloseFrame {
            code: CloseCode::Normal,
            reason: reason.into(),
        })),
    }
}

fn from_message(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.to_string())),
        Message::Binary(bytes) => Some(Frame::Binary(bytes.to_vec())),
        Message::Close(close) => Some(Frame::Close(
            close
                .map(|frame| frame.reason.to_string())
                .filter(|reason| !reason.is_empty()),
        )),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
