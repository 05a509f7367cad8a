//! Timer state structures shared between the timer core and its observers

use serde::{Deserialize, Serialize};

/// Lifecycle state of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
}

impl TimerStatus {
    /// Lowercase name, as used in API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Expired => "expired",
        }
    }

    /// Idle and expired timers have nothing scheduled
    pub fn is_quiescent(&self) -> bool {
        matches!(self, TimerStatus::Idle | TimerStatus::Expired)
    }
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a countdown, published after every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerStatus,
    pub duration: u64,
    pub remaining: u64,
    /// Number of cycles that ran all the way to expiry
    pub completed_cycles: u64,
}

/// Events emitted by the callbacks registered on each start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TimerEvent {
    Tick { remaining: u64 },
    Ended,
}
