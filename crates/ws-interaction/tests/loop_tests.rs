use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use ws_core::{Destination, Origin, WsError};
use ws_interaction::{
    BufferConsole, Console, InteractiveLoop, LineFeed, LoopExit, PROMPT, ReadOutcome,
    ScriptedReader, StreamingLoop, Tone,
};
use ws_session::{Connector, Frame, MemoryConnector, MemoryPeer, Session};

fn dial(connector: impl Connector + 'static) -> Session {
    let destination = Destination::parse("ws://memory.test/chat").unwrap();
    let origin = Origin::derive(&destination).unwrap();
    Session::dial(Arc::new(connector), destination, origin)
}

fn text_frames(peer: &mut MemoryPeer) -> Vec<String> {
    peer.drain_sent()
        .into_iter()
        .filter_map(|frame| match frame {
            Frame::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

fn position(lines: &[String], wanted: &str) -> usize {
    let matches: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.as_str() == wanted)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(matches.len(), 1, "expected exactly one {wanted:?} in {lines:?}");
    matches[0]
}

async fn wait_for_line(console: &BufferConsole, wanted: &str) {
    for _ in 0..200 {
        if console.lines().iter().any(|line| line == wanted) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{wanted:?} never printed, got {:?}", console.lines());
}

// ============================================================================
// Streaming loop
// ============================================================================

#[tokio::test]
async fn test_streaming_echoes_each_line_once_in_order() {
    let console = Arc::new(BufferConsole::new());
    let session = dial(MemoryConnector::echo_after(Duration::from_millis(5)));
    let input = Cursor::new("a\nb\nc\n");

    let exit = StreamingLoop::new(session, console.clone(), input)
        .run()
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::EndOfInput);

    let lines = console.lines();
    assert_eq!(lines[0], "Reading from stdin:");
    assert_eq!(lines[1], "Connected");
    for word in ["a", "b", "c"] {
        let sent = position(&lines, &format!("Got stdin: {word}"));
        let received = position(&lines, &format!("Got response: {word}"));
        assert!(sent < received, "local echo after reply for {word}: {lines:?}");
    }
    assert!(!lines.iter().any(|line| line.starts_with("Received message")));
}

#[tokio::test]
async fn test_streaming_prints_unclaimed_frames_and_stops_on_server_close() {
    let console = Arc::new(BufferConsole::new());
    let (connector, peer) = MemoryConnector::scripted();
    let session = dial(connector);
    // Input that never ends on its own.
    let (_writer, reader) = tokio::io::duplex(64);

    peer.push_text("welcome");
    peer.push(Frame::Close(Some("maintenance".to_string())));

    let exit = StreamingLoop::new(session, console.clone(), BufReader::new(reader))
        .run()
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::ServerClosed);
    assert_eq!(
        console.lines(),
        vec![
            "Reading from stdin:",
            "Connected",
            "Received message: welcome",
            "Connection closed: maintenance",
        ]
    );
}

#[tokio::test]
async fn test_streaming_waits_for_handshake_before_reading() {
    let console = Arc::new(BufferConsole::new());
    let session = dial(MemoryConnector::refusing("no route to host"));
    let input = Cursor::new("never sent\n");

    let err = StreamingLoop::new(session, console.clone(), input)
        .run()
        .await
        .unwrap_err();
    assert_eq!(err, WsError::connection("no route to host"));
    assert_eq!(console.lines(), vec!["Reading from stdin:"]);
}

#[tokio::test]
async fn test_streaming_transport_error_is_fatal() {
    let console = Arc::new(BufferConsole::new());
    let (connector, mut peer) = MemoryConnector::scripted();
    let session = dial(connector);
    let (mut writer, reader) = tokio::io::duplex(64);

    let task = tokio::spawn(async move {
        StreamingLoop::new(session, console, BufReader::new(reader))
            .run()
            .await
    });

    writer.write_all(b"ping\n").await.unwrap();
    assert_eq!(peer.next_sent().await, Some(Frame::text("ping")));
    peer.fail("broken pipe");

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err, WsError::connection("broken pipe"));
}

#[tokio::test(start_paused = true)]
async fn test_streaming_stops_draining_after_window() {
    let console = Arc::new(BufferConsole::new());
    let (connector, mut peer) = MemoryConnector::scripted();
    let session = dial(connector);

    let exit = StreamingLoop::new(session, console.clone(), Cursor::new("unanswered\n"))
        .with_reply_drain(Duration::from_millis(100))
        .run()
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::EndOfInput);
    assert_eq!(text_frames(&mut peer), vec!["unanswered"]);
    assert!(!console.lines().iter().any(|line| line.starts_with("Got response")));
}

#[tokio::test]
async fn test_streaming_closes_session_at_end_of_input() {
    let console = Arc::new(BufferConsole::new());
    let (connector, mut peer) = MemoryConnector::scripted();
    let session = dial(connector);

    StreamingLoop::new(session, console, Cursor::new(""))
        .run()
        .await
        .unwrap();

    assert_eq!(peer.drain_sent(), vec![Frame::Close(None)]);
}

// ============================================================================
// Interactive loop
// ============================================================================

async fn feed(outcomes: Vec<ReadOutcome>) -> LineFeed {
    LineFeed::spawn(PROMPT, move || Ok(ScriptedReader::new(outcomes)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_interrupt_exits_cleanly_without_sending() {
    let console = Arc::new(BufferConsole::new());
    let (connector, mut peer) = MemoryConnector::scripted();
    let session = dial(connector);
    session.wait_connected().await.unwrap();

    let exit = InteractiveLoop::new(session, console)
        .run(feed(vec![ReadOutcome::Interrupted]).await)
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Interrupted);
    assert!(text_frames(&mut peer).is_empty());
}

#[tokio::test]
async fn test_lines_are_sent_in_order_until_eof() {
    let console = Arc::new(BufferConsole::new());
    let (connector, mut peer) = MemoryConnector::scripted();
    let session = dial(connector);
    session.wait_connected().await.unwrap();

    let outcomes = vec![
        ReadOutcome::Line("first".to_string()),
        ReadOutcome::Line(String::new()),
        ReadOutcome::Line("{\"op\":\"subscribe\"}".to_string()),
        ReadOutcome::Eof,
    ];
    let exit = InteractiveLoop::new(session, console)
        .run(feed(outcomes).await)
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::EndOfInput);
    assert_eq!(
        text_frames(&mut peer),
        vec!["first", "", "{\"op\":\"subscribe\"}"]
    );
}

#[tokio::test]
async fn test_inbound_frames_print_while_prompt_waits() {
    let console = Arc::new(BufferConsole::new());
    let (connector, peer) = MemoryConnector::scripted();
    let session = dial(connector);
    session.wait_connected().await.unwrap();

    let (lines_tx, reader) = ScriptedReader::channel();
    let feed = LineFeed::spawn(PROMPT, move || Ok(reader)).await.unwrap();
    let task = tokio::spawn({
        let console: Arc<dyn Console> = console.clone();
        async move { InteractiveLoop::new(session, console).run(feed).await }
    });

    peer.push_text("tick");
    peer.push(Frame::Binary(vec![0x01, 0xff]));
    wait_for_line(&console, "< tick").await;
    wait_for_line(&console, "< 01 ff").await;

    lines_tx.send(Ok(ReadOutcome::Eof)).unwrap();
    assert_eq!(task.await.unwrap().unwrap(), LoopExit::EndOfInput);

    let entries = console.entries();
    assert_eq!(
        entries[0],
        (Tone::Status, "Connected to ws://memory.test/chat".to_string())
    );
    assert!(entries.contains(&(Tone::Received, "< tick".to_string())));
}

#[tokio::test]
async fn test_server_close_ends_interactive_loop() {
    let console = Arc::new(BufferConsole::new());
    let (connector, peer) = MemoryConnector::scripted();
    let session = dial(connector);
    session.wait_connected().await.unwrap();

    let (_lines_tx, reader) = ScriptedReader::channel();
    let feed = LineFeed::spawn(PROMPT, move || Ok(reader)).await.unwrap();

    peer.push(Frame::Close(Some("bye".to_string())));

    let exit = InteractiveLoop::new(session, console.clone())
        .run(feed)
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::ServerClosed);
    assert_eq!(console.lines().last().unwrap(), "Connection closed: bye");
}

#[tokio::test]
async fn test_transport_error_surfaces_from_interactive_loop() {
    let console = Arc::new(BufferConsole::new());
    let (connector, peer) = MemoryConnector::scripted();
    let session = dial(connector);
    session.wait_connected().await.unwrap();

    let (_lines_tx, reader) = ScriptedReader::channel();
    let feed = LineFeed::spawn(PROMPT, move || Ok(reader)).await.unwrap();

    peer.fail("unexpected EOF");

    let err = InteractiveLoop::new(session, console)
        .run(feed)
        .await
        .unwrap_err();
    assert!(err.is_connection());
}
