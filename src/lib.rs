//! Sandcheck: test declaration, assertions and a synchronous `await` for
//! single-threaded script sandboxes.
//!
//! The embedding host implements [`host::Host`]; scripts declare hooks, tests
//! and groups on a [`Sandbox`], and the host calls [`Sandbox::run`] once after
//! the script's top-level code has run.

pub use crate::error::{ErrorType, ScriptError, ScriptResult};
pub use crate::sandbox::{RunReport, Sandbox, Scope};
pub use crate::suite::RunSummary;
pub use crate::value::Value;

pub mod assert;
pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod format;
pub mod host;
pub mod log;
pub mod sandbox;
pub mod suite;
pub mod value;
