//! Error types shared across the timer, store, and control layers

use thiserror::Error;

/// Errors raised by the countdown timer itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("Invalid duration: {0}. Must be a positive number of seconds")]
    InvalidDuration(i64),
}

/// Errors raised by persistent key-value stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents are not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors returned when controlling the timer through the driver task
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("Countdown driver is not running")]
    DriverUnavailable,
}
