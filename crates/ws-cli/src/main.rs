use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ws_core::{ClientConfig, InputMode};
use ws_interaction::{
    Console, EditorReader, InteractiveLoop, LineFeed, LoopExit, PROMPT, StdConsole, StreamingLoop,
    TerminalGuard,
};
use ws_session::{Connector, Session, TungsteniteConnector};

mod cli;

use cli::Action;

#[tokio::main]
async fn main() {
    let code = match cli::parse_args(std::env::args_os()) {
        Ok(Action::PrintVersion) => {
            println!("{}", cli::version_line());
            0
        }
        Ok(Action::PrintHelp) => {
            println!("{}", cli::help_text());
            0
        }
        Ok(Action::Connect(args)) => {
            init_tracing();
            match args.into_config() {
                Ok(config) => run(config).await,
                Err(err) => {
                    eprintln!("{err}");
                    err.exit_code()
                }
            }
        }
        Err(err) => {
            eprintln!("{err}");
            println!("{}", cli::help_text());
            err.exit_code()
        }
    };

    // The line reader thread may still be blocked on the terminal.
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(config: ClientConfig) -> i32 {
    let mode = config.mode;
    let outcome = match mode {
        InputMode::Interactive => run_interactive(config).await,
        InputMode::Stdin => run_streaming(config).await,
    };

    match outcome {
        Ok(exit) => {
            debug!(?exit, "exiting");
            0
        }
        Err(err) => {
            match mode {
                InputMode::Stdin => eprintln!("** ERROR **\n{err:#}"),
                InputMode::Interactive => eprintln!("{err:#}"),
            }
            1
        }
    }
}

fn connector() -> Arc<dyn Connector> {
    Arc::new(TungsteniteConnector::new())
}

async fn run_interactive(config: ClientConfig) -> Result<LoopExit> {
    let session = Session::open(connector(), config.destination, config.origin).await?;

    // Dropped before `main` exits, even while the editor still holds the
    // terminal in raw mode.
    let _terminal = TerminalGuard::stdin();
    let history_file = config.history_file;
    let feed = LineFeed::spawn(PROMPT, move || EditorReader::new(history_file))
        .await
        .context("failed to start the line editor")?;
    let console: Arc<dyn Console> = feed
        .console()
        .unwrap_or_else(|| Arc::new(StdConsole::new()) as Arc<dyn Console>);

    Ok(InteractiveLoop::new(session, console).run(feed).await?)
}

async fn run_streaming(config: ClientConfig) -> Result<LoopExit> {
    let console: Arc<dyn Console> = Arc::new(StdConsole::without_color());
    let session = Session::dial(connector(), config.destination, config.origin);
    let input = BufReader::new(tokio::io::stdin());

    Ok(StreamingLoop::new(session, console, input)
        .with_reply_drain(config.reply_drain)
        .run()
        .await?)
}
