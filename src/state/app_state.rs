//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::info;

use super::{TimerEvent, TimerSnapshot};
use crate::{
    error::ControlError,
    persistence::KeyValueStore,
    tasks::{CountdownDriver, TimerCommand},
};

/// Shared state handed to every HTTP handler.
///
/// The countdown itself lives in the driver task; this struct only holds
/// the channels used to talk to it.
#[derive(Debug)]
pub struct AppState {
    /// Channel for control commands to the driver task
    commands_tx: mpsc::Sender<TimerCommand>,
    /// Latest snapshot published by the driver
    snapshot_rx: watch::Receiver<TimerSnapshot>,
    /// Tick and end events from the active countdown
    events_tx: broadcast::Sender<TimerEvent>,
    /// Tick interval the driver was configured with
    pub tick_interval: Duration,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Create the application state together with the driver task that
    /// must be spawned to serve it
    pub fn new(
        port: u16,
        host: String,
        tick_interval: Duration,
        store: Option<Box<dyn KeyValueStore>>,
    ) -> (Self, CountdownDriver) {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot::default());
        let (events_tx, _) = broadcast::channel(100);

        let driver = CountdownDriver::new(
            tick_interval,
            commands_rx,
            store,
            snapshot_tx,
            events_tx.clone(),
        );

        let state = Self {
            commands_tx,
            snapshot_rx,
            events_tx,
            tick_interval,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        };

        (state, driver)
    }

    /// Send a command built around a reply channel and wait for the answer
    async fn request<T>(
        &self,
        action: &str,
        build: impl FnOnce(oneshot::Sender<T>) -> TimerCommand,
    ) -> Result<T, ControlError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| ControlError::DriverUnavailable)?;
        let reply = reply_rx.await.map_err(|_| ControlError::DriverUnavailable)?;

        self.record_action(action);
        Ok(reply)
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Start (or restart) the countdown
    pub async fn start(&self, duration: u64) -> Result<TimerSnapshot, ControlError> {
        info!("Starting countdown for {}s", duration);
        let snapshot = self
            .request("start", |reply| TimerCommand::Start { duration, reply })
            .await??;
        Ok(snapshot)
    }

    /// Pause the countdown; no-op unless running
    pub async fn pause(&self) -> Result<TimerSnapshot, ControlError> {
        self.request("pause", |reply| TimerCommand::Pause { reply }).await
    }

    /// Resume the countdown; no-op unless paused
    pub async fn resume(&self) -> Result<TimerSnapshot, ControlError> {
        self.request("resume", |reply| TimerCommand::Resume { reply }).await
    }

    /// Stop the countdown and reset it to idle
    pub async fn stop(&self) -> Result<TimerSnapshot, ControlError> {
        self.request("stop", |reply| TimerCommand::Stop { reply }).await
    }

    /// Restart the countdown from the persisted remaining time, if any
    pub async fn restore(&self) -> Result<Option<TimerSnapshot>, ControlError> {
        self.request("restore", |reply| TimerCommand::Restore { reply }).await
    }

    /// Get the most recently published timer snapshot
    pub fn get_snapshot(&self) -> TimerSnapshot {
        *self.snapshot_rx.borrow()
    }

    /// Watch timer snapshots as the driver publishes them
    pub fn watch_snapshots(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to tick and end events
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.events_tx.subscribe()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
