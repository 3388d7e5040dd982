//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! bounded-retry read:
//!     → retries.rs runs the operation (attempt 1..=max_attempts)
//!     → on a retriable failure: backoff.rs computes the wait
//!     → delay.rs sleeps (tokio, or a recording fake in tests)
//!     → after the last attempt the last error is handed back
//! ```
//!
//! # Design Decisions
//! - Retries are an explicit loop, never recursion
//! - Only failures the caller classifies as retriable are retried
//! - Waits go through an injectable `Delay` so schedules are testable

pub mod backoff;
pub mod delay;
pub mod retries;

pub use backoff::calculate_backoff;
pub use delay::{Delay, TokioDelay};
pub use retries::{retry_with_backoff, RetryExhausted, RetryPolicy};
