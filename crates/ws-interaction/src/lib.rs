//! The two ways of driving a session from a terminal: an editable prompt and
//! a line stream.

pub mod console;
pub mod interactive;
pub mod line_reader;
pub mod streaming;
pub mod terminal;

pub use console::{Console, EditorConsole, StdConsole, Tone};
#[cfg(any(test, feature = "test-util"))]
pub use console::BufferConsole;
pub use interactive::{InteractiveLoop, LoopState, PROMPT};
pub use line_reader::{EditorReader, LineFeed, LineReader, ReadOutcome};
#[cfg(any(test, feature = "test-util"))]
pub use line_reader::ScriptedReader;
pub use streaming::StreamingLoop;
pub use terminal::TerminalGuard;

/// Why a loop ended without an error. Every variant maps to exit status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The input was exhausted.
    EndOfInput,
    /// The user pressed Ctrl-C at the prompt.
    Interrupted,
    /// The server closed the connection.
    ServerClosed,
}
