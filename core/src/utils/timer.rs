//! Timing utilities
//!
//! A named stopwatch that logs its elapsed time, escalating the log level
//! once a warning threshold is crossed.

use std::time::{Duration, Instant};
use log::{debug, warn};

/// Timer for measuring execution time
#[derive(Debug, Clone)]
pub struct Timer {
    name: String,
    start: Instant,
    warning_threshold: Option<Duration>,
    log_on_drop: bool,
}

impl Timer {
    /// Create a new timer with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Timer {
            name: name.into(),
            start: Instant::now(),
            warning_threshold: None,
            log_on_drop: true,
        }
    }

    /// Log as a warning once this much time has passed
    pub fn with_warning_threshold(mut self, threshold: Duration) -> Self {
        self.warning_threshold = Some(threshold);
        self
    }

    /// Disable automatic logging on drop
    pub fn without_auto_log(mut self) -> Self {
        self.log_on_drop = false;
        self
    }

    /// Elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the warning threshold has been crossed
    pub fn is_slow(&self) -> bool {
        self.warning_threshold
            .map(|threshold| self.elapsed() > threshold)
            .unwrap_or(false)
    }

    /// Log the elapsed time, as a warning when slow
    pub fn log(&self, message: impl Into<String>) {
        let msg = format!("{} {}: {:?}", self.name, message.into(), self.elapsed());
        if self.is_slow() {
            warn!("{} [SLOW]", msg);
        } else {
            debug!("{}", msg);
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if self.log_on_drop {
            self.log("completed");
        }
    }
}
