//! Periodic tick sources that drive a countdown

use std::{collections::HashMap, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, trace};

/// Opaque token identifying one outstanding schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A source of periodic wake-ups.
///
/// Each call to `schedule` returns a fresh handle; the source reports that
/// handle once per elapsed interval until it is cancelled.
pub trait TickSource {
    fn schedule(&mut self, interval: Duration) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
}

/// Tick source backed by tokio intervals.
///
/// Fired handles are delivered on the receiver returned by `new`. A handle
/// can still arrive after `cancel` if it was sent just before the abort, so
/// consumers must compare it against the handle they currently hold.
#[derive(Debug)]
pub struct TokioTickSource {
    next_id: u64,
    tasks: HashMap<TickHandle, JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<TickHandle>,
}

impl TokioTickSource {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TickHandle>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let source = Self {
            next_id: 0,
            tasks: HashMap::new(),
            fired_tx,
        };
        (source, fired_rx)
    }

    /// Number of schedules that have not been cancelled
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }
}

impl TickSource for TokioTickSource {
    fn schedule(&mut self, period: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            // First tick lands one full period from now, not immediately
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!("Tick source fired handle {}", handle.id());
                if fired_tx.send(handle).is_err() {
                    break;
                }
            }
        });

        debug!("Scheduled tick handle {} every {:?}", handle.id(), period);
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            debug!("Cancelled tick handle {}", handle.id());
        }
    }
}

impl Drop for TokioTickSource {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Tick source that never fires on its own; tests fire handles explicitly.
#[derive(Debug, Default)]
pub struct ManualTickSource {
    next_id: u64,
    active: Vec<TickHandle>,
    pub scheduled: Vec<(TickHandle, Duration)>,
    pub cancelled: Vec<TickHandle>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles that are scheduled and not yet cancelled
    pub fn active(&self) -> &[TickHandle] {
        &self.active
    }

    /// The most recently scheduled handle, cancelled or not
    pub fn last_scheduled(&self) -> Option<TickHandle> {
        self.scheduled.last().map(|(handle, _)| *handle)
    }
}

impl TickSource for ManualTickSource {
    fn schedule(&mut self, interval: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.active.push(handle);
        self.scheduled.push((handle, interval));
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.active.retain(|h| *h != handle);
        self.cancelled.push(handle);
    }
}
