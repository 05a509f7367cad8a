//! Countdown Timer - A pause/resume countdown controlled over HTTP
//!
//! This library provides a tick-driven countdown state machine, the tokio
//! task that owns it, optional persistence of the remaining time, and an
//! HTTP control surface.

pub mod config;
pub mod error;
pub mod state;
pub mod timer;
pub mod persistence;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{ControlError, StoreError, TimerError};
pub use state::{AppState, TimerEvent, TimerSnapshot, TimerStatus};
pub use timer::CountdownTimer;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
