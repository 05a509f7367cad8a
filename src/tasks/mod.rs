//! Background tasks module
//!
//! This module contains the countdown driver that runs alongside the HTTP server.

pub mod countdown_driver;

// Re-export main types
pub use countdown_driver::{CountdownDriver, TimerCommand};
