//! State management module
//!
//! This module contains the shared application state and the timer state
//! types published by the countdown driver.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use timer_state::{TimerEvent, TimerSnapshot, TimerStatus};
