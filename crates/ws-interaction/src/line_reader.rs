//! Line sources for the interactive loop.
//!
//! Reading a line blocks, so readers live on their own thread and hand lines
//! to the async side through a [`LineFeed`].

use std::borrow::Cow::{self, Owned};
use std::path::PathBuf;
use std::sync::Arc;
#[cfg(any(test, feature = "test-util"))]
use std::sync::mpsc as std_mpsc;

use colored::Colorize;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use ws_core::{Result, WsError};

use crate::console::{Console, EditorConsole};

/// Result of one attempt to read a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// End of input (Ctrl-D).
    Eof,
    /// The user interrupted the read (Ctrl-C).
    Interrupted,
}

/// A blocking source of lines.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Console that prints without corrupting this reader's prompt, if the
    /// reader has one.
    fn console(&mut self) -> Option<Arc<dyn Console>> {
        None
    }
}

/// rustyline helper: inline hints from history, dimmed.
struct PromptHelper {
    hinter: HistoryHinter,
}

impl PromptHelper {
    fn new() -> Self {
        Self {
            hinter: HistoryHinter {},
        }
    }
}

impl Helper for PromptHelper {}

impl Completer for PromptHelper {
    type Candidate = String;
}

impl Hinter for PromptHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for PromptHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }
}

impl Validator for PromptHelper {}

/// Editable prompt with persistent history.
pub struct EditorReader {
    editor: Editor<PromptHelper, FileHistory>,
    history_file: Option<PathBuf>,
}

impl EditorReader {
    /// Creates the editor and preloads history from `history_file`.
    ///
    /// A missing or unreadable history file only disables recall of earlier
    /// sessions.
    pub fn new(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor = Editor::<PromptHelper, FileHistory>::new()
            .map_err(|e| WsError::input(format!("failed to initialize line editor: {e}")))?;
        editor.set_helper(Some(PromptHelper::new()));

        if let Some(path) = &history_file {
            if let Err(err) = editor.load_history(path) {
                debug!(path = %path.display(), error = %err, "no history loaded");
            }
        }

        Ok(Self {
            editor,
            history_file,
        })
    }

    fn remember(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Err(err) = self.editor.add_history_entry(line) {
            warn!(error = %err, "failed to record history entry");
            return;
        }
        if let Some(path) = &self.history_file {
            if let Err(err) = self.editor.append_history(path) {
                warn!(path = %path.display(), error = %err, "failed to append history");
            }
        }
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.remember(&line);
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(WsError::input(err.to_string())),
        }
    }

    fn console(&mut self) -> Option<Arc<dyn Console>> {
        match self.editor.create_external_printer() {
            Ok(printer) => Some(Arc::new(EditorConsole::new(Box::new(printer)))),
            Err(err) => {
                debug!(error = %err, "external printer unavailable");
                None
            }
        }
    }
}

/// Replays queued outcomes; reports [`ReadOutcome::Eof`] once the queue is
/// empty and its sender is gone.
#[cfg(any(test, feature = "test-util"))]
pub struct ScriptedReader {
    outcomes: std_mpsc::Receiver<Result<ReadOutcome>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedReader {
    /// Reader that yields `outcomes` in order, then end of input.
    pub fn new(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        let (tx, reader) = Self::channel();
        for outcome in outcomes {
            let _ = tx.send(Ok(outcome));
        }
        reader
    }

    /// Reader fed live through the returned sender; each read blocks until
    /// the next outcome is sent.
    pub fn channel() -> (std_mpsc::Sender<Result<ReadOutcome>>, Self) {
        let (tx, rx) = std_mpsc::channel();
        (tx, Self { outcomes: rx })
    }
}

#[cfg(any(test, feature = "test-util"))]
impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        self.outcomes.recv().unwrap_or(Ok(ReadOutcome::Eof))
    }
}

/// Lines read on a dedicated thread, received asynchronously.
pub struct LineFeed {
    lines: mpsc::Receiver<Result<ReadOutcome>>,
    console: Option<Arc<dyn Console>>,
}

impl LineFeed {
    /// Builds the reader on a new thread and starts reading with `prompt`.
    ///
    /// The thread stops after the first outcome that is not a line.
    pub async fn spawn<R, F>(prompt: impl Into<String>, make_reader: F) -> Result<Self>
    where
        F: FnOnce() -> Result<R> + Send + 'static,
        R: LineReader + 'static,
    {
        let prompt = prompt.into();
        let (lines_tx, lines_rx) = mpsc::channel(1);
        let (ready_tx, ready_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("ws-line-reader".to_string())
            .spawn(move || {
                let mut reader = match make_reader() {
                    Ok(reader) => reader,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(reader.console()));

                loop {
                    let outcome = reader.read_line(&prompt);
                    let finished = !matches!(outcome, Ok(ReadOutcome::Line(_)));
                    if lines_tx.blocking_send(outcome).is_err() || finished {
                        break;
                    }
                }
            })
            .map_err(|e| WsError::internal(format!("failed to start line reader: {e}")))?;

        let console = ready_rx
            .await
            .map_err(|_| WsError::internal("line reader exited during startup"))??;

        Ok(Self {
            lines: lines_rx,
            console,
        })
    }

    /// The reader's own console, if it has one.
    pub fn console(&self) -> Option<Arc<dyn Console>> {
        self.console.clone()
    }

    /// Next outcome; `None` once the reader thread has stopped.
    pub async fn next(&mut self) -> Option<Result<ReadOutcome>> {
        self.lines.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reader_ends_with_eof() {
        let mut reader = ScriptedReader::new([ReadOutcome::Line("one".to_string())]);
        assert_eq!(
            reader.read_line("> ").unwrap(),
            ReadOutcome::Line("one".to_string())
        );
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Eof);
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Eof);
    }

    fn history_lines(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_editor_preloads_and_appends_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ws_history");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut reader = EditorReader::new(Some(path.clone())).unwrap();
        assert!(reader.editor.history().iter().any(|entry| entry == "earlier"));

        reader.remember("hello");
        reader.remember("world");

        let lines = history_lines(&path);
        assert!(lines.iter().any(|line| line == "earlier"));
        let hello = lines.iter().position(|line| line == "hello").unwrap();
        let world = lines.iter().position(|line| line == "world").unwrap();
        assert!(hello < world);
    }

    #[test]
    fn test_editor_creates_missing_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");

        let mut reader = EditorReader::new(Some(path.clone())).unwrap();
        reader.remember("   ");
        assert!(!path.exists());

        reader.remember("first");
        assert!(history_lines(&path).iter().any(|line| line == "first"));
    }

    #[test]
    fn test_editor_without_history_file_keeps_memory_only() {
        let mut reader = EditorReader::new(None).unwrap();
        reader.remember("x");

        assert!(reader.history_file.is_none());
        assert!(reader.editor.history().iter().any(|entry| entry == "x"));
    }

    #[tokio::test]
    async fn test_line_feed_stops_after_interrupt() {
        let mut feed = LineFeed::spawn("> ", || {
            Ok(ScriptedReader::new([
                ReadOutcome::Line("first".to_string()),
                ReadOutcome::Interrupted,
                ReadOutcome::Line("never read".to_string()),
            ]))
        })
        .await
        .unwrap();

        assert!(feed.console().is_none());
        assert_eq!(
            feed.next().await.unwrap().unwrap(),
            ReadOutcome::Line("first".to_string())
        );
        assert_eq!(feed.next().await.unwrap().unwrap(), ReadOutcome::Interrupted);
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_line_feed_reports_reader_startup_failure() {
        let result = LineFeed::spawn("> ", || -> Result<ScriptedReader> {
            Err(WsError::input("no terminal"))
        })
        .await;
        assert_eq!(result.err().unwrap(), WsError::input("no terminal"));
    }
}
