use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use ws_core::{ClientConfig, InputMode, Result, WsError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "ws", about = "websocket tool", disable_version_flag = true)]
struct Cli {
    /// Websocket URL to connect to (ws:// or wss://)
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// websocket origin
    #[arg(short, long)]
    origin: Option<String>,

    /// read input from stdin not interactive
    #[arg(short = 'i', long)]
    stdin: bool,

    /// print version
    #[arg(short = 'v', long)]
    version: bool,
}

/// What the process should do, decided from the command line alone.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    PrintVersion,
    PrintHelp,
    Connect(ConnectArgs),
}

#[derive(Debug, PartialEq, Eq)]
pub struct ConnectArgs {
    pub url: String,
    pub origin: Option<String>,
    pub mode: InputMode,
}

impl ConnectArgs {
    /// Parses the URL and resolves the origin; fails before any connection
    /// attempt.
    pub fn into_config(self) -> Result<ClientConfig> {
        ClientConfig::from_args(&self.url, self.origin, self.mode)
    }
}

/// Parses `args` (program name first).
///
/// A version flag anywhere wins, even next to arguments clap rejects.
/// Otherwise fails with [`WsError::Usage`] for unknown flags and for
/// anything other than exactly one URL.
pub fn parse_args<I, T>(args: I) -> Result<Action>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(_) if requests_version(&args) => return Ok(Action::PrintVersion),
        Err(err) if err.kind() == ErrorKind::DisplayHelp => return Ok(Action::PrintHelp),
        Err(err) => return Err(WsError::usage(err.to_string().trim_end())),
    };

    if cli.version {
        return Ok(Action::PrintVersion);
    }

    let mut urls = cli.urls;
    if urls.len() != 1 {
        return Err(WsError::usage(format!(
            "expected exactly one URL, got {}",
            urls.len()
        )));
    }

    Ok(Action::Connect(ConnectArgs {
        url: urls.remove(0),
        origin: cli.origin,
        mode: if cli.stdin {
            InputMode::Stdin
        } else {
            InputMode::Interactive
        },
    }))
}

/// Looks for `--version` or a `-v` short flag, including grouped forms such
/// as `-iv`. Scanning stops at `--`; an `-o` group ends at its value.
fn requests_version(args: &[OsString]) -> bool {
    for arg in args.iter().skip(1).filter_map(|arg| arg.to_str()) {
        if arg == "--" {
            break;
        }
        if arg == "--version" {
            return true;
        }
        let Some(shorts) = arg.strip_prefix('-').filter(|s| !s.starts_with('-')) else {
            continue;
        };
        for flag in shorts.chars() {
            match flag {
                'v' => return true,
                'o' => break,
                _ => {}
            }
        }
    }
    false
}

pub fn version_line() -> String {
    format!("ws v{VERSION}")
}

pub fn help_text() -> String {
    Cli::command().render_help().to_string()
}
