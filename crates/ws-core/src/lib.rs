//! Core types shared by the ws crates: destinations, configuration and errors.

pub mod config;
pub mod destination;
pub mod error;
pub mod paths;

pub use config::{ClientConfig, DEFAULT_REPLY_DRAIN, InputMode};
pub use destination::{Destination, Origin, Scheme};
pub use error::{Result, WsError};
pub use paths::WsPaths;
