//! Serialized terminal output shared by the foreground loop and inbound
//! frame delivery.

use std::io::Write;
use std::sync::Mutex;

use colored::Colorize;
use rustyline::ExternalPrinter;
use tracing::warn;

/// What kind of line is being printed; decides color and stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Ordinary output, e.g. local echoes in streaming mode.
    Plain,
    /// Connection status.
    Status,
    /// A frame received from the server.
    Received,
    /// Errors, written to stderr where the console has one.
    Error,
}

impl Tone {
    fn paint(self, text: &str) -> String {
        match self {
            Tone::Plain => text.to_string(),
            Tone::Status => text.bright_black().to_string(),
            Tone::Received => text.green().to_string(),
            Tone::Error => text.red().to_string(),
        }
    }
}

/// A sink for whole lines.
///
/// Implementations must not interleave two concurrent calls.
pub trait Console: Send + Sync {
    fn print(&self, tone: Tone, text: &str);

    fn plain(&self, text: &str) {
        self.print(Tone::Plain, text);
    }

    fn status(&self, text: &str) {
        self.print(Tone::Status, text);
    }

    fn received(&self, text: &str) {
        self.print(Tone::Received, text);
    }

    fn error(&self, text: &str) {
        self.print(Tone::Error, text);
    }
}

/// Writes to stdout, and stderr for [`Tone::Error`].
pub struct StdConsole {
    colored: bool,
    lock: Mutex<()>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            colored: true,
            lock: Mutex::new(()),
        }
    }

    /// Console without ANSI colors, for piped output.
    pub fn without_color() -> Self {
        Self {
            colored: false,
            lock: Mutex::new(()),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn print(&self, tone: Tone, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let line = if self.colored {
            tone.paint(text)
        } else {
            text.to_string()
        };
        let result = if tone == Tone::Error {
            writeln!(std::io::stderr().lock(), "{line}")
        } else {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{line}").and_then(|()| out.flush())
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to write to terminal");
        }
    }
}

/// Prints above an active rustyline prompt, which is redrawn afterwards.
pub struct EditorConsole {
    printer: Mutex<Box<dyn ExternalPrinter + Send>>,
}

impl EditorConsole {
    pub fn new(printer: Box<dyn ExternalPrinter + Send>) -> Self {
        Self {
            printer: Mutex::new(printer),
        }
    }
}

impl Console for EditorConsole {
    fn print(&self, tone: Tone, text: &str) {
        let mut printer = self
            .printer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = printer.print(format!("{}\n", tone.paint(text))) {
            warn!(error = %err, "failed to print above prompt");
        }
    }
}

/// Keeps every line in memory, uncolored.
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<(Tone, String)>>,
}

#[cfg(any(test, feature = "test-util"))]
impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, text)| text).collect()
    }

    pub fn entries(&self) -> Vec<(Tone, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Console for BufferConsole {
    fn print(&self, tone: Tone, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((tone, text.to_string()));
        }
    }
}
