//! Level-prefixed terminal logging.
//!
//! The [`Logger`] is the user-facing output channel of the reference host: one
//! colored badge per line, errors routed to stderr, multi-line messages
//! indented under the badge.

use std::{
    cell::RefCell,
    fmt,
    io::{self, Write},
    rc::Rc,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

/// Diagnostic severity. Ordered: `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Numeric rank used by the output gate.
    pub const fn rank(self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warn => 2,
            LogLevel::Error => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized logging level: {0:?}")]
pub struct LevelParseError(pub String);

impl FromStr for LogLevel {
    type Err = LevelParseError;

    /// Accepts the level names plus the aliases hosts commonly pass through;
    /// an empty string selects `info`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "info" => Ok(LogLevel::Info),
            "debug" | "verbose" | "trace" => Ok(LogLevel::Debug),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "err" | "error" | "fatal" => Ok(LogLevel::Error),
            _ => Err(LevelParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = LevelParseError;

    fn try_from(value: String) -> Result<Self, LevelParseError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

// ============================================================================
// WRITERS
// ============================================================================

/// An in-memory, colorless writer whose contents stay readable after it is
/// handed to a [`Logger`].
#[derive(Clone, Default)]
pub struct MemoryWriter(Rc<RefCell<Vec<u8>>>);

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteColor for MemoryWriter {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}

type Sink = RefCell<Box<dyn WriteColor>>;

// ============================================================================
// LOGGER
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum LineKind {
    Debug,
    Info,
    Success,
    Warn,
    Error,
    Fatal,
}

impl LineKind {
    fn badge(self) -> &'static str {
        match self {
            LineKind::Debug => " debug ",
            LineKind::Info => "  info ",
            LineKind::Success => "    ok ",
            LineKind::Warn => "  warn ",
            LineKind::Error => " error ",
            LineKind::Fatal => "  Fatal error  ",
        }
    }

    /// Prefix and message colors.
    fn palette(self) -> [ColorSpec; 2] {
        let badge = |bg: Color, fg: Color, bold: bool| {
            let mut spec = ColorSpec::new();
            spec.set_bg(Some(bg)).set_fg(Some(fg)).set_bold(bold);
            spec
        };
        match self {
            LineKind::Debug => [badge(Color::Cyan, Color::White, false), ColorSpec::new()],
            LineKind::Info => [badge(Color::Blue, Color::White, false), ColorSpec::new()],
            LineKind::Success => [badge(Color::Green, Color::White, true), ColorSpec::new()],
            LineKind::Warn => [badge(Color::Yellow, Color::White, false), ColorSpec::new()],
            LineKind::Error => [badge(Color::Red, Color::White, true), ColorSpec::new()],
            LineKind::Fatal => {
                let mut message = ColorSpec::new();
                message.set_bg(Some(Color::Black)).set_fg(Some(Color::Red));
                [badge(Color::Red, Color::Black, true), message]
            }
        }
    }
}

/// Leveled logger writing to a pair of color-capable streams.
pub struct Logger {
    level: LogLevel,
    without_prefix: bool,
    stdout: Sink,
    stderr: Sink,
}

impl Logger {
    /// Logger over the process stdout/stderr.
    pub fn new(level: LogLevel, color: ColorChoice) -> Self {
        Self::with_writers(
            level,
            StandardStream::stdout(color),
            StandardStream::stderr(color),
        )
    }

    pub fn with_writers<O, E>(level: LogLevel, stdout: O, stderr: E) -> Self
    where
        O: WriteColor + 'static,
        E: WriteColor + 'static,
    {
        Self {
            level,
            without_prefix: false,
            stdout: RefCell::new(Box::new(stdout)),
            stderr: RefCell::new(Box::new(stderr)),
        }
    }

    /// Drops the level badge from every line.
    pub fn without_prefix(mut self) -> Self {
        self.without_prefix = true;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn debug(&self, msg: &str) {
        if self.enabled(LogLevel::Debug) {
            self.emit(&self.stdout, LineKind::Debug, " ", msg);
        }
    }

    pub fn info(&self, msg: &str) {
        if self.enabled(LogLevel::Info) {
            self.emit(&self.stdout, LineKind::Info, " ", msg);
        }
    }

    /// A success line, gated at info level.
    pub fn success(&self, msg: &str) {
        if self.enabled(LogLevel::Info) {
            self.emit(&self.stdout, LineKind::Success, " ", msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.enabled(LogLevel::Warn) {
            self.emit(&self.stdout, LineKind::Warn, " ", msg);
        }
    }

    pub fn error(&self, msg: &str) {
        if self.enabled(LogLevel::Error) {
            self.emit(&self.stderr, LineKind::Error, " ", msg);
        }
    }

    /// A boxed error line, gated at error level.
    pub fn fatal(&self, msg: &str) {
        if self.enabled(LogLevel::Error) {
            self.emit(&self.stderr, LineKind::Fatal, "", &format!("  {msg}  "));
        }
    }

    /// Writes an unformatted line to stdout (`io.stdOut`).
    pub fn raw_out(&self, text: &str) {
        self.emit_raw(&self.stdout, text);
    }

    /// Writes an unformatted line to stderr (`io.stdErr`).
    pub fn raw_err(&self, text: &str) {
        self.emit_raw(&self.stderr, text);
    }

    fn emit_raw(&self, sink: &Sink, text: &str) {
        let mut w = sink.borrow_mut();
        if let Err(err) = w.write_all(text.as_bytes()).and_then(|()| w.flush()) {
            tracing::warn!(error = %err, "log write failed");
        }
    }

    fn emit(&self, sink: &Sink, kind: LineKind, sep: &str, msg: &str) {
        let mut w = sink.borrow_mut();
        if let Err(err) = self.render(&mut **w, kind, sep, msg) {
            tracing::warn!(error = %err, "log write failed");
        }
    }

    fn render(
        &self,
        w: &mut dyn WriteColor,
        kind: LineKind,
        sep: &str,
        msg: &str,
    ) -> io::Result<()> {
        let [prefix_color, message_color] = kind.palette();
        let prefix = kind.badge();

        let mut lines: Vec<&str> = msg.split('\n').filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            lines.push("");
        }

        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                writeln!(w)?;
            }
            if !self.without_prefix {
                w.set_color(&prefix_color)?;
                if i == 0 {
                    write!(w, "{prefix}")?;
                } else {
                    write!(w, "{}", " ".repeat(prefix.len()))?;
                }
                w.reset()?;
                write!(w, "{sep}")?;
            }
            w.set_color(&message_color)?;
            write!(w, "{line}")?;
            w.reset()?;
        }
        writeln!(w)?;
        w.flush()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("without_prefix", &self.without_prefix)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PREFIX PRINTER
// ============================================================================

/// Prefixes raw script output, e.g. with the script file name.
#[derive(Debug, Clone, Default)]
pub struct PrefixPrinter {
    prefix: String,
}

impl PrefixPrinter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Prefixes the text and every line after an embedded newline, except
    /// the last newline, so a trailing line break stays unprefixed.
    pub fn apply(&self, text: &str) -> String {
        let newlines = text.matches('\n').count();
        let body = if newlines > 1 {
            text.replacen('\n', &format!("\n{}", self.prefix), newlines - 1)
        } else {
            text.to_string()
        };
        format!("{}{body}", self.prefix)
    }
}
