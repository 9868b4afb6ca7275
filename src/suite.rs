//! Test declaration and execution.

pub mod engine;
pub mod registry;

pub use engine::{Engine, RunSummary};
pub use registry::{BodyFn, HookEntry, HookFn, HookId, HookPhase, NamedQueue, Registry};
