//! Error taxonomy for script execution.
//!
//! Assertion failures are deliberately absent here: they are reported through
//! the event sink and never surface as an `Err`. Everything that does surface
//! as a `ScriptError` is fatal to the current run.

use miette::Diagnostic;
use thiserror::Error;

/// Boxed cause attached to an uncaught script error.
pub type ErrorCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-safe classification of a [`ScriptError`], used by reports and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A primitive was called with the wrong number of arguments.
    Argument,
    /// The script requested an interrupt (fail-fast assertion or explicit call).
    Interrupt,
    /// Any other error escaping a hook, group or test body.
    Uncaught,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Argument => "ArgumentError",
            ErrorType::Interrupt => "InterruptSignal",
            ErrorType::Uncaught => "UncaughtScriptError",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fatal script errors. Any of these aborts the whole run.
#[derive(Error, Diagnostic, Debug)]
pub enum ScriptError {
    #[error("{message}")]
    #[diagnostic(
        code(sandcheck::argument),
        help("check the number of arguments passed to the call")
    )]
    Argument { message: String },

    #[error("interrupted: {reason}")]
    #[diagnostic(code(sandcheck::interrupted))]
    Interrupted { reason: String },

    #[error("uncaught error: {message}")]
    #[diagnostic(
        code(sandcheck::uncaught),
        help("errors thrown outside of assertions abort the run; use `assert` to record a failure and continue")
    )]
    Uncaught {
        message: String,
        #[source]
        source: Option<ErrorCause>,
    },
}

impl ScriptError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Builds an uncaught error, the equivalent of `throw new Error(message)`.
    pub fn uncaught(message: impl Into<String>) -> Self {
        Self::Uncaught {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a foreign error as an uncaught script error.
    pub fn from_cause<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Uncaught {
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Argument { .. } => ErrorType::Argument,
            Self::Interrupted { .. } => ErrorType::Interrupt,
            Self::Uncaught { .. } => ErrorType::Uncaught,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Result alias used by every script-facing operation.
pub type ScriptResult<T> = Result<T, ScriptError>;
