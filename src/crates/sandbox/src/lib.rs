//! Sandboxed probe program execution
//!
//! Agent-generated probe programs are short Python scripts that issue HTTP
//! GETs through the shared client wrapper and print one JSON document.
//! Before anything is spawned, the program text goes through a static
//! validator; execution then happens in a child process with a minimal
//! whitelisted environment and a hard timeout.

pub mod error;
pub mod executor;
pub mod validator;

pub use error::{Result, SandboxError};
pub use executor::{ExecutorConfig, ProbeExecutor, ProbeOutput};
pub use validator::{validate_program, ValidationContext};
