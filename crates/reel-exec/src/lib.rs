//! Sequential shell command execution for the demo recording pipeline.
//!
//! Two layers:
//! - [`executor`] runs a single command to completion and captures its
//!   stdout (one best-effort attempt, no retry logic).
//! - [`retry`] wraps any [`CommandRunner`] with bounded fixed-interval
//!   polling for dependencies that may still be starting up.
//!
//! Execution is strictly call-and-wait: the caller blocks on each command
//! before issuing the next one. Step ordering is load-bearing for the demo
//! narrative, so nothing here dispatches work concurrently.

pub mod executor;
pub mod retry;

pub use executor::{CommandRunner, ExecError, ShellExecutor, MAX_OUTPUT_BYTES};
pub use retry::{run_with_retry, RetryPolicy};
