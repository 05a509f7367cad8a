//! Countdown timer core
//!
//! The timer is a plain state machine driven by a `TickSource`. It owns no
//! threads and never reads the clock.

pub mod countdown;
pub mod tick_source;

// Re-export main types
pub use countdown::CountdownTimer;
pub use tick_source::{ManualTickSource, TickHandle, TickSource, TokioTickSource};
