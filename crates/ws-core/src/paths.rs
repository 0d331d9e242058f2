//! Location of files the client persists between invocations.
//!
//! ```text
//! ~/
//! └── .ws_history        # interactive prompt history, one entry per line
//! ```

use std::path::{Path, PathBuf};

/// File name of the history record, relative to the home directory.
pub const HISTORY_FILE_NAME: &str = ".ws_history";

/// Path management for ws.
pub struct WsPaths;

impl WsPaths {
    /// Returns the history file under the user's home directory.
    ///
    /// `None` when the home directory cannot be determined; history is then
    /// disabled rather than treated as an error.
    pub fn history_file() -> Option<PathBuf> {
        dirs::home_dir().map(|home| Self::history_file_in(&home))
    }

    /// Returns the history file inside an arbitrary home directory.
    pub fn history_file_in(home: &Path) -> PathBuf {
        home.join(HISTORY_FILE_NAME)
    }
}
