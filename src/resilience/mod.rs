//! Resilience
//!
//! Opt-in retry policy. The client never retries on its own; callers wrap
//! operations in a [`RetryExecutor`] when they want retries.

pub mod retry;

pub use retry::*;
