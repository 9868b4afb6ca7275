//! The host boundary.
//!
//! The engine owns no I/O. Everything that touches the outside world (streams,
//! timers, environment, the scheduler, event transport, networking) is a
//! capability the embedding host supplies through the traits below.

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{events::Event, log::LogLevel};

pub mod stdio;

pub use stdio::StdioHost;

/// Reason used when an interrupt is requested without one.
pub const DEFAULT_INTERRUPT_REASON: &str = "interrupted by the script";

/// Capabilities the engine consumes from its host.
///
/// All methods take `&self`: hosts are shared behind an `Rc` by the sandbox,
/// the console and the event sink, and use interior mutability where needed.
pub trait Host {
    /// Sends text to standard output.
    fn write_stdout(&self, text: &str);

    /// Sends text to standard error.
    fn write_stderr(&self, text: &str);

    /// Prints one console line at `level`. Errors go to stderr, the rest to
    /// stdout. Hosts with a leveled logger override this.
    fn log(&self, level: LogLevel, line: &str) {
        let line = format!("{line}\n");
        match level {
            LogLevel::Error => self.write_stderr(&line),
            _ => self.write_stdout(&line),
        }
    }

    /// The minimum severity the host wants printed.
    fn log_level(&self) -> LogLevel;

    /// Pauses the script for at least `duration`.
    fn delay(&self, duration: Duration);

    /// Requests that the running script be aborted.
    fn interrupt(&self, reason: &str);

    /// The reason of an interrupt the host has pending, if any. The engine
    /// checks this before every step, so a host may stop a run on its own.
    fn interrupt_requested(&self) -> Option<String> {
        None
    }

    /// Yields once so pending host work (I/O completion, timers) can progress.
    /// This is the only suspension point of the engine.
    fn yield_now(&self);

    fn env_var(&self, name: &str) -> Option<String>;

    /// Accepts a batch of structured events.
    fn report(&self, events: &[Event]);
}

// ============================================================================
// NETWORKING BOUNDARY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            _ => Err(FetchError::UnsupportedMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported request method: {0:?}")]
    UnsupportedMethod(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("wrong JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub const DEFAULT_USER_AGENT: &str = concat!("sandcheck/", env!("CARGO_PKG_VERSION"));

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())],
            body: None,
        }
    }

    /// Sets a header, replacing any existing one with the same
    /// case-insensitive name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: status_text(status).to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `true` for a 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value, FetchError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Reason phrase for the common status codes; empty when unknown.
pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// A blocking HTTP client supplied by the host.
pub trait Fetch {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;

    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.send(HttpRequest::new(Method::Get, url))
    }

    fn post(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<HttpResponse, FetchError>
    where
        Self: Sized,
    {
        self.send(HttpRequest::new(Method::Post, url).body(body))
    }

    fn put(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<HttpResponse, FetchError>
    where
        Self: Sized,
    {
        self.send(HttpRequest::new(Method::Put, url).body(body))
    }

    fn patch(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<HttpResponse, FetchError>
    where
        Self: Sized,
    {
        self.send(HttpRequest::new(Method::Patch, url).body(body))
    }

    fn delete(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.send(HttpRequest::new(Method::Delete, url))
    }

    fn head(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.send(HttpRequest::new(Method::Head, url))
    }
}
