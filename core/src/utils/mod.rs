//! Utility functions and helpers
//!
//! This module provides various utility functions and helpers used throughout the codebase.

pub mod string;
pub mod timer;

pub use string::StringUtils;
pub use timer::Timer;

use std::time::Duration;
use log::warn;

/// Retry a fallible operation with exponential backoff.
///
/// The operation runs at most `max_retries + 1` times. Errors for which
/// `should_retry` returns false are returned immediately.
pub async fn retry_with_backoff<F, T, E, P>(
    mut operation: F,
    should_retry: P,
    max_retries: usize,
    initial_backoff: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut retries = 0;
    let mut backoff = initial_backoff;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if retries >= max_retries || !should_retry(&err) {
                    return Err(err);
                }

                retries += 1;
                warn!("attempt {} failed, retrying in {:?}: {}", retries, backoff, err);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}
