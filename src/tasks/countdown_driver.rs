//! Countdown driver background task
//!
//! The driver is the single owner of the `CountdownTimer`. Control requests
//! arrive as commands; tick handles arrive from the tokio tick source. After
//! every step the driver publishes a snapshot and persists progress.

use std::time::Duration;
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    sync::{broadcast, mpsc, oneshot, watch},
    task,
};
use tracing::{debug, info, warn};

use crate::{
    error::{StoreError, TimerError},
    persistence::{load_remaining, save_remaining, KeyValueStore},
    state::{TimerEvent, TimerSnapshot},
    timer::{CountdownTimer, TickHandle, TokioTickSource},
};

/// Control requests sent to the driver task
#[derive(Debug)]
pub enum TimerCommand {
    Start {
        duration: u64,
        reply: oneshot::Sender<Result<TimerSnapshot, TimerError>>,
    },
    Pause {
        reply: oneshot::Sender<TimerSnapshot>,
    },
    Resume {
        reply: oneshot::Sender<TimerSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<TimerSnapshot>,
    },
    /// Start from the remaining seconds found in the store, if any
    Restore {
        reply: oneshot::Sender<Option<TimerSnapshot>>,
    },
}

/// Task state owning the timer and its collaborators
pub struct CountdownDriver {
    timer: CountdownTimer<TokioTickSource>,
    fired_rx: mpsc::UnboundedReceiver<TickHandle>,
    commands_rx: mpsc::Receiver<TimerCommand>,
    store: Option<Box<dyn KeyValueStore>>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
    events_tx: broadcast::Sender<TimerEvent>,
    last_persisted: Option<u64>,
}

impl CountdownDriver {
    pub fn new(
        interval: Duration,
        commands_rx: mpsc::Receiver<TimerCommand>,
        store: Option<Box<dyn KeyValueStore>>,
        snapshot_tx: watch::Sender<TimerSnapshot>,
        events_tx: broadcast::Sender<TimerEvent>,
    ) -> Self {
        let (source, fired_rx) = TokioTickSource::new();
        let last_persisted = store.as_deref().and_then(|store| load_remaining(store));

        Self {
            timer: CountdownTimer::new(source, interval),
            fired_rx,
            commands_rx,
            store,
            snapshot_tx,
            events_tx,
            last_persisted,
        }
    }

    /// Run until every command sender has been dropped. The persisted
    /// remaining time is left as is so a later restore can pick it up.
    pub async fn run(mut self) {
        info!("Starting countdown driver task (interval {:?})", self.timer.interval());

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("Command channel closed, stopping countdown driver");
                        break;
                    }
                },
                Some(handle) = self.fired_rx.recv() => {
                    self.timer.fire(handle);
                    self.publish();
                }
            }
        }
    }

    fn handle_command(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Start { duration, reply } => {
                let result = self.start_cycle(duration).map(|_| self.publish());
                let _ = reply.send(result);
            }
            TimerCommand::Pause { reply } => {
                self.timer.pause();
                let _ = reply.send(self.publish());
            }
            TimerCommand::Resume { reply } => {
                self.timer.resume();
                let _ = reply.send(self.publish());
            }
            TimerCommand::Stop { reply } => {
                self.timer.stop();
                let _ = reply.send(self.publish());
            }
            TimerCommand::Restore { reply } => {
                let restored = self.restore().map(|_| self.publish());
                let _ = reply.send(restored);
            }
        }
    }

    fn start_cycle(&mut self, duration: u64) -> Result<(), TimerError> {
        let tick_tx = self.events_tx.clone();
        let end_tx = self.events_tx.clone();

        // Sends fail only when nobody is subscribed
        self.timer.start(
            duration,
            move |remaining| {
                debug!("Countdown tick: {}s remaining", remaining);
                let _ = tick_tx.send(TimerEvent::Tick { remaining });
            },
            move || {
                info!("Countdown finished");
                let _ = end_tx.send(TimerEvent::Ended);
            },
        )
    }

    fn restore(&mut self) -> Option<()> {
        if !self.timer.state().is_quiescent() {
            info!("Countdown already {}, skipping restore", self.timer.state());
            return None;
        }

        let remaining = self
            .store
            .as_deref()
            .and_then(|store| load_remaining(store))
            .filter(|remaining| *remaining > 0)?;

        info!("Restoring countdown with {}s remaining", remaining);
        self.start_cycle(remaining).ok()
    }

    /// Publish the current snapshot and persist remaining seconds if changed
    fn publish(&mut self) -> TimerSnapshot {
        let snapshot = self.timer.snapshot();

        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        if let Some(store) = self.store.as_deref_mut() {
            if self.last_persisted != Some(snapshot.remaining) {
                match persist_remaining(store, snapshot.remaining) {
                    Ok(()) => self.last_persisted = Some(snapshot.remaining),
                    Err(e) => warn!("Failed to persist remaining time: {}", e),
                }
            }
        }

        snapshot
    }
}

/// Save the remaining seconds without stalling the other tasks on this
/// worker. `block_in_place` panics on a current-thread runtime, so that
/// flavor writes inline.
fn persist_remaining(store: &mut dyn KeyValueStore, remaining: u64) -> Result<(), StoreError> {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => {
            task::block_in_place(|| save_remaining(store, remaining))
        }
        _ => save_remaining(store, remaining),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{FileStore, MemoryStore, REMAINING_KEY};
    use crate::state::TimerStatus;

    struct Harness {
        commands_tx: mpsc::Sender<TimerCommand>,
        snapshot_rx: watch::Receiver<TimerSnapshot>,
        events_rx: broadcast::Receiver<TimerEvent>,
    }

    fn spawn_driver(store: Option<Box<dyn KeyValueStore>>) -> Harness {
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot::default());
        let (events_tx, events_rx) = broadcast::channel(64);
        let driver = CountdownDriver::new(
            Duration::from_secs(1),
            commands_rx,
            store,
            snapshot_tx,
            events_tx,
        );
        tokio::spawn(driver.run());
        Harness { commands_tx, snapshot_rx, events_rx }
    }

    async fn start(harness: &Harness, duration: u64) -> Result<TimerSnapshot, TimerError> {
        let (reply, rx) = oneshot::channel();
        harness
            .commands_tx
            .send(TimerCommand::Start { duration, reply })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    async fn pause(harness: &Harness) -> TimerSnapshot {
        let (reply, rx) = oneshot::channel();
        harness.commands_tx.send(TimerCommand::Pause { reply }).await.unwrap();
        rx.await.unwrap()
    }

    async fn resume(harness: &Harness) -> TimerSnapshot {
        let (reply, rx) = oneshot::channel();
        harness.commands_tx.send(TimerCommand::Resume { reply }).await.unwrap();
        rx.await.unwrap()
    }

    async fn restore(harness: &Harness) -> Option<TimerSnapshot> {
        let (reply, rx) = oneshot::channel();
        harness.commands_tx.send(TimerCommand::Restore { reply }).await.unwrap();
        rx.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_expiry() {
        let mut harness = spawn_driver(None);
        let snapshot = start(&harness, 3).await.unwrap();
        assert_eq!(snapshot.state, TimerStatus::Running);
        assert_eq!(snapshot.remaining, 3);

        let mut events = Vec::new();
        loop {
            let event = harness.events_rx.recv().await.unwrap();
            events.push(event);
            if event == TimerEvent::Ended {
                break;
            }
        }

        assert_eq!(
            events,
            vec![
                TimerEvent::Tick { remaining: 2 },
                TimerEvent::Tick { remaining: 1 },
                TimerEvent::Tick { remaining: 0 },
                TimerEvent::Ended,
            ]
        );

        let snapshot = *harness
            .snapshot_rx
            .wait_for(|s| s.state == TimerStatus::Expired)
            .await
            .unwrap();
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.completed_cycles, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_duration_is_rejected() {
        let harness = spawn_driver(None);
        assert_eq!(start(&harness, 0).await, Err(TimerError::InvalidDuration(0)));
        assert_eq!(harness.snapshot_rx.borrow().state, TimerStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_remaining_over_time() {
        let mut harness = spawn_driver(None);
        start(&harness, 5).await.unwrap();

        assert_eq!(harness.events_rx.recv().await.unwrap(), TimerEvent::Tick { remaining: 4 });
        let paused = pause(&harness).await;
        assert_eq!(paused.state, TimerStatus::Paused);
        assert_eq!(paused.remaining, 4);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(harness.events_rx.try_recv().is_err());
        assert_eq!(harness.snapshot_rx.borrow().remaining, 4);

        let resumed = resume(&harness).await;
        assert_eq!(resumed.state, TimerStatus::Running);
        assert_eq!(harness.events_rx.recv().await.unwrap(), TimerEvent::Tick { remaining: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_is_persisted() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::open(&path).unwrap();
        let mut harness = spawn_driver(Some(Box::new(store)));

        start(&harness, 4).await.unwrap();
        assert_eq!(harness.events_rx.recv().await.unwrap(), TimerEvent::Tick { remaining: 3 });
        let paused = pause(&harness).await;
        assert_eq!(paused.remaining, 3);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(REMAINING_KEY).as_deref(), Some("3"));

        // restore is skipped while a countdown is paused
        assert_eq!(restore(&harness).await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_remaining_is_persisted_on_multi_thread_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStore::open(&path).unwrap();
        let harness = spawn_driver(Some(Box::new(store)));

        start(&harness, 30).await.unwrap();
        let paused = pause(&harness).await;
        assert_eq!(paused.state, TimerStatus::Paused);

        let reopened = FileStore::open(&path).unwrap();
        let expected = paused.remaining.to_string();
        assert_eq!(reopened.get(REMAINING_KEY).as_deref(), Some(expected.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_starts_from_stored_value() {
        let mut store = MemoryStore::new();
        store.set(REMAINING_KEY, "2").unwrap();
        let mut harness = spawn_driver(Some(Box::new(store)));

        let restored = restore(&harness).await.unwrap();
        assert_eq!(restored.state, TimerStatus::Running);
        assert_eq!(restored.duration, 2);

        assert_eq!(harness.events_rx.recv().await.unwrap(), TimerEvent::Tick { remaining: 1 });
        assert_eq!(harness.events_rx.recv().await.unwrap(), TimerEvent::Tick { remaining: 0 });
        assert_eq!(harness.events_rx.recv().await.unwrap(), TimerEvent::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_without_stored_value() {
        let mut store = MemoryStore::new();
        store.set(REMAINING_KEY, "0").unwrap();
        let harness = spawn_driver(Some(Box::new(store)));
        assert_eq!(restore(&harness).await, None);

        let harness = spawn_driver(None);
        assert_eq!(restore(&harness).await, None);
    }
}
