//! Websocket destination URLs and the Origin header derived from them.

use std::fmt;

use url::{Position, Url};

use crate::error::{Result, WsError};

/// The two websocket schemes the client accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    fn from_url(url: &Url) -> Option<Self> {
        match url.scheme() {
            "ws" => Some(Self::Ws),
            "wss" => Some(Self::Wss),
            _ => None,
        }
    }

    /// The HTTP scheme used when deriving an Origin.
    pub fn http_equivalent(self) -> &'static str {
        match self {
            Self::Ws => "http",
            Self::Wss => "https",
        }
    }

    /// Whether the connection is TLS-wrapped.
    pub fn is_secure(self) -> bool {
        matches!(self, Self::Wss)
    }
}

/// A parsed `ws://` or `wss://` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    url: Url,
    scheme: Scheme,
    /// Whether the input spelled out a path. `url` adds `/` when it did not.
    explicit_path: bool,
}

impl Destination {
    /// Parses the destination argument.
    ///
    /// Anything that is not an absolute URL with a `ws` or `wss` scheme is
    /// rejected here, before any connection attempt.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| WsError::parse(input, e.to_string()))?;
        let scheme = Scheme::from_url(&url).ok_or_else(|| {
            WsError::parse(
                input,
                format!("unsupported scheme '{}', expected ws or wss", url.scheme()),
            )
        })?;
        if url.host_str().is_none() {
            return Err(WsError::parse(input, "missing host"));
        }

        Ok(Self {
            url,
            scheme,
            explicit_path: has_explicit_path(input),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn has_explicit_path(input: &str) -> bool {
    let rest = input.trim().split_once("://").map_or("", |(_, rest)| rest);
    rest.find(['/', '?', '#'])
        .is_some_and(|at| rest[at..].starts_with('/'))
}

/// Value of the `Origin` header sent with the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin(String);

impl Origin {
    /// Derives the origin from the destination by swapping `ws`→`http` and
    /// `wss`→`https`, keeping host, port, path and query as given.
    pub fn derive(destination: &Destination) -> Result<Self> {
        let mut url = destination.url.clone();
        url.set_scheme(destination.scheme.http_equivalent())
            .map_err(|()| {
                WsError::parse(destination.as_str(), "cannot derive an origin from this URL")
            })?;

        if !destination.explicit_path && url.path() == "/" {
            return Ok(Self(format!(
                "{}{}",
                &url[..Position::BeforePath],
                &url[Position::AfterPath..]
            )));
        }
        Ok(Self(url.into()))
    }

    /// Uses `explicit` when given, otherwise derives from the destination.
    pub fn resolve(destination: &Destination, explicit: Option<String>) -> Result<Self> {
        match explicit {
            Some(value) if !value.is_empty() => Ok(Self(value)),
            _ => Self::derive(destination),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
