//! Countdown timer state machine

use std::time::Duration;
use tracing::{debug, info, trace};

use super::tick_source::{TickHandle, TickSource};
use crate::{
    error::TimerError,
    state::{TimerSnapshot, TimerStatus},
};

type TickCallback = Box<dyn FnMut(u64) + Send>;
type EndCallback = Box<dyn FnOnce() + Send>;

/// Countdown driven by a periodic tick source.
///
/// The timer never reads the clock; it counts ticks. Each `start` begins a
/// new cycle whose `on_end` fires exactly once, when `remaining` reaches zero.
pub struct CountdownTimer<S: TickSource> {
    source: S,
    interval: Duration,
    duration: u64,
    remaining: u64,
    state: TimerStatus,
    completed_cycles: u64,
    /// Handle of the schedule currently driving this timer, if any
    pending: Option<TickHandle>,
    on_tick: Option<TickCallback>,
    on_end: Option<EndCallback>,
}

impl<S: TickSource> CountdownTimer<S> {
    /// Create an idle timer that ticks once per `interval` while running
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            duration: 0,
            remaining: 0,
            state: TimerStatus::Idle,
            completed_cycles: 0,
            pending: None,
            on_tick: None,
            on_end: None,
        }
    }

    /// Start a new cycle of `duration` ticks.
    ///
    /// Starting while running or paused replaces the previous cycle: its
    /// pending tick is cancelled and its callbacks are dropped unfired.
    pub fn start<T, E>(&mut self, duration: u64, on_tick: T, on_end: E) -> Result<(), TimerError>
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        if duration == 0 {
            return Err(TimerError::InvalidDuration(0));
        }

        if !self.state.is_quiescent() {
            info!(
                "Restarting countdown that was {} with {}s remaining",
                self.state, self.remaining
            );
        }
        self.cancel_pending();

        self.duration = duration;
        self.remaining = duration;
        self.on_tick = Some(Box::new(on_tick));
        self.on_end = Some(Box::new(on_end));
        self.state = TimerStatus::Running;
        self.pending = Some(self.source.schedule(self.interval));

        info!("Countdown started for {}s", duration);
        Ok(())
    }

    /// Handle a fired schedule. Only the currently pending handle ticks the
    /// timer; anything else was cancelled before it was delivered.
    pub fn fire(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.tick();
        } else {
            trace!("Ignoring stale tick handle {}", handle.id());
        }
    }

    /// Advance the countdown by one tick. Ignored unless running.
    pub fn tick(&mut self) {
        if self.state != TimerStatus::Running {
            trace!("Ignoring tick while {}", self.state);
            return;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if let Some(on_tick) = self.on_tick.as_mut() {
            on_tick(self.remaining);
        }

        if self.remaining == 0 {
            self.cancel_pending();
            self.state = TimerStatus::Expired;
            self.completed_cycles += 1;
            self.on_tick = None;
            info!("Countdown expired");
            if let Some(on_end) = self.on_end.take() {
                on_end();
            }
        }
    }

    /// Pause a running countdown, keeping the remaining time
    pub fn pause(&mut self) {
        if self.state != TimerStatus::Running {
            debug!("Pause ignored while {}", self.state);
            return;
        }
        self.cancel_pending();
        self.state = TimerStatus::Paused;
        info!("Countdown paused with {}s remaining", self.remaining);
    }

    /// Resume a paused countdown. The next tick lands one full interval
    /// from now.
    pub fn resume(&mut self) {
        if self.state != TimerStatus::Paused || self.remaining == 0 {
            debug!("Resume ignored while {} with {}s remaining", self.state, self.remaining);
            return;
        }
        self.state = TimerStatus::Running;
        self.pending = Some(self.source.schedule(self.interval));
        info!("Countdown resumed with {}s remaining", self.remaining);
    }

    /// Stop the countdown and return to idle. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.cancel_pending();
        self.on_tick = None;
        self.on_end = None;
        if self.state != TimerStatus::Idle {
            info!("Countdown stopped while {}", self.state);
        }
        self.state = TimerStatus::Idle;
        self.remaining = 0;
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.source.cancel(handle);
        }
    }

    pub fn state(&self) -> TimerStatus {
        self.state
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle of the schedule currently driving the timer
    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            duration: self.duration,
            remaining: self.remaining,
            completed_cycles: self.completed_cycles,
        }
    }
}

impl<S: TickSource> std::fmt::Debug for CountdownTimer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("interval", &self.interval)
            .field("duration", &self.duration)
            .field("remaining", &self.remaining)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish()
    }
}
