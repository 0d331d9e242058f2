//! A single websocket connection exposed as a queue of events plus
//! non-blocking sends.

pub mod frame;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod session;
pub mod transport;
pub mod tungstenite_connector;

pub use frame::{Frame, format_hex};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryConnector, MemoryPeer};
pub use session::{Session, SessionEvent, SessionState};
pub use transport::{Connector, FrameSink, FrameStream};
pub use tungstenite_connector::TungsteniteConnector;
