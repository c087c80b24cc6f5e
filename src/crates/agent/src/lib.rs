//! ReAct agent runtime
//!
//! Runs a reasoning-and-acting loop against a configurable chat model with
//! a fixed tool surface: reference lookup, graph queries against the
//! current snapshot, sandboxed REST probes, and the per-session Code
//! Library. The loop is strictly serial within a session; sessions run as
//! independent tasks and communicate with the streaming layer through a
//! per-session event channel.

pub mod answer;
pub mod error;
pub mod events;
pub mod library;
pub mod prompts;
pub mod registry;
pub mod runner;
pub mod session;
pub mod tools;

pub use answer::FinalPayload;
pub use error::{AgentError, ToolErrorKind};
pub use events::AgentEvent;
pub use library::{Approval, CodeLibrary, ReadResult, RefreshDiff, WriteScript};
pub use registry::{SessionTool, ToolFailure, ToolOutcome, ToolRegistry};
pub use runner::{AgentRunner, RunnerConfig};
pub use session::{SessionContext, SessionLimits};
