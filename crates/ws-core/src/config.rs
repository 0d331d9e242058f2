//! Runtime configuration assembled once at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::destination::{Destination, Origin};
use crate::error::Result;
use crate::paths::WsPaths;

/// How long the streaming loop waits for outstanding replies once its input
/// is exhausted.
pub const DEFAULT_REPLY_DRAIN: Duration = Duration::from_secs(3);

/// Which loop drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Editable prompt with history.
    #[default]
    Interactive,
    /// Non-interactive lines from standard input.
    Stdin,
}

/// Everything the selected loop needs, built from the command line.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub destination: Destination,
    pub origin: Origin,
    pub mode: InputMode,
    /// `None` disables history persistence.
    pub history_file: Option<PathBuf>,
    pub reply_drain: Duration,
}

impl ClientConfig {
    /// Parses the URL, resolves the origin and locates the history file.
    pub fn from_args(url: &str, origin: Option<String>, mode: InputMode) -> Result<Self> {
        let destination = Destination::parse(url)?;
        let origin = Origin::resolve(&destination, origin)?;

        Ok(Self {
            destination,
            origin,
            mode,
            history_file: WsPaths::history_file(),
            reply_drain: DEFAULT_REPLY_DRAIN,
        })
    }

    pub fn with_history_file(mut self, history_file: Option<PathBuf>) -> Self {
        self.history_file = history_file;
        self
    }

    pub fn with_reply_drain(mut self, reply_drain: Duration) -> Self {
        self.reply_drain = reply_drain;
        self
    }
}
