use std::fmt;

/// One message unit exchanged with the server.
///
/// Control frames other than close (ping, pong) are answered by the
/// transport and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Close frame, with the peer's reason when it sent one.
    Close(Option<String>),
}

impl Frame {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Text(text) => f.write_str(text),
            Frame::Binary(bytes) => f.write_str(&format_hex(bytes)),
            Frame::Close(Some(reason)) => write!(f, "close: {reason}"),
            Frame::Close(None) => f.write_str("close"),
        }
    }
}

/// Renders bytes as space-separated lowercase hex pairs.
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
