//! Retry policies and timeout budgets for async operations

pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryPolicy};
pub use timeout::{with_budget, Budgets};
